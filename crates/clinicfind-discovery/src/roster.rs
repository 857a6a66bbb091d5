//! The two-tier doctor view: summary placeholders until a roster resolves.

use clinicfind_core::{ClinicRecord, DoctorDetail, DoctorId};

use crate::detail_cache::DetailSnapshot;

/// What is known about one doctor of a clinic right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DoctorInfo<'a> {
    /// Only the identity from the clinic record; specialization and
    /// teleconsultation are not known yet.
    Summary { id: &'a DoctorId },
    Detail(&'a DoctorDetail),
}

impl DoctorInfo<'_> {
    #[must_use]
    pub fn id(&self) -> &DoctorId {
        match self {
            DoctorInfo::Summary { id } => id,
            DoctorInfo::Detail(detail) => &detail.id,
        }
    }

    /// Known specialization. Always `None` for a summary.
    #[must_use]
    pub fn specialization(&self) -> Option<&str> {
        match self {
            DoctorInfo::Summary { .. } => None,
            DoctorInfo::Detail(detail) => detail.specialization.as_deref(),
        }
    }

    /// Known teleconsultation availability. Always `false` for a summary.
    #[must_use]
    pub fn offers_teleconsultation(&self) -> bool {
        match self {
            DoctorInfo::Summary { .. } => false,
            DoctorInfo::Detail(detail) => detail.available_for_teleconsultation,
        }
    }

    #[must_use]
    pub fn is_detail(&self) -> bool {
        matches!(self, DoctorInfo::Detail(_))
    }
}

/// The clinic's doctors as currently known.
///
/// A resolved roster in `snapshot` supersedes the clinic's doctor refs
/// entirely; otherwise every ref yields a [`DoctorInfo::Summary`].
#[must_use]
pub fn roster_for<'a>(
    clinic: &'a ClinicRecord,
    snapshot: &'a DetailSnapshot,
) -> Vec<DoctorInfo<'a>> {
    match snapshot.get(&clinic.id) {
        Some(details) => details.iter().map(DoctorInfo::Detail).collect(),
        None => clinic
            .doctor_refs
            .iter()
            .map(|id| DoctorInfo::Summary { id })
            .collect(),
    }
}
