use clinicfind_core::FacetOptions;

use crate::detail_cache::DetailSnapshot;
use crate::distance::RankedClinic;
use crate::roster::{roster_for, DoctorInfo};

/// Derives the selectable filter options from the candidate set and the
/// rosters resolved so far.
///
/// Always a full recomputation, so an option appears iff some currently
/// known clinic or doctor carries it.
#[must_use]
pub fn aggregate_facets(candidates: &[RankedClinic], snapshot: &DetailSnapshot) -> FacetOptions {
    let mut facets = FacetOptions::default();

    for RankedClinic { clinic, .. } in candidates {
        facets.has_doctors |= clinic.has_doctors();
        facets.has_weekend_hours |= clinic.opening_hours.has_weekend_hours();
        facets.facilities.extend(clinic.facilities.iter().cloned());

        for doctor in roster_for(clinic, snapshot) {
            match doctor {
                DoctorInfo::Summary { .. } => {}
                DoctorInfo::Detail(detail) => {
                    if let Some(specialization) = &detail.specialization {
                        facets.specializations.insert(specialization.clone());
                    }
                    facets.has_telemedicine |= detail.available_for_teleconsultation;
                }
            }
        }
    }

    tracing::debug!(
        candidates = candidates.len(),
        enriched = snapshot.len(),
        specializations = facets.specializations.len(),
        facilities = facets.facilities.len(),
        "facets recomputed"
    );
    facets
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Weekday;
    use clinicfind_core::{ClinicId, ClinicRecord, ClockTime, DayHours, DoctorDetail, DoctorId};

    use super::*;
    use crate::distance::unbounded;

    fn clinic(id: &str, doctors: &[&str], facilities: &[&str]) -> ClinicRecord {
        let mut clinic = ClinicRecord::new(id, id);
        clinic.doctor_refs = doctors.iter().map(|d| DoctorId::from(*d)).collect();
        clinic.facilities = facilities.iter().map(|f| (*f).to_string()).collect();
        clinic
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn empty_candidates_yield_empty_facets() {
        let facets = aggregate_facets(&[], &DetailSnapshot::default());
        assert_eq!(facets, FacetOptions::default());
    }

    #[test]
    fn placeholders_contribute_no_specializations() {
        let candidates = unbounded(vec![
            clinic("c1", &["d1", "d2"], &["Pharmacy"]),
            clinic("c2", &[], &["Lab", "Pharmacy"]),
        ]);
        let facets = aggregate_facets(&candidates, &DetailSnapshot::default());

        assert!(facets.specializations.is_empty());
        assert!(!facets.has_telemedicine);
        assert!(facets.has_doctors);
        assert_eq!(facets.facilities, set(&["Lab", "Pharmacy"]));
    }

    #[test]
    fn enriched_rosters_extend_specializations_and_telemedicine() {
        let candidates = unbounded(vec![
            clinic("c1", &["d1"], &[]),
            clinic("c2", &["d2"], &[]),
        ]);
        let snapshot: DetailSnapshot = [(
            ClinicId::from("c1"),
            vec![
                DoctorDetail::new("d1", Some("Cardiology"), false),
                DoctorDetail::new("d3", None, true),
            ],
        )]
        .into_iter()
        .collect();

        let facets = aggregate_facets(&candidates, &snapshot);
        assert_eq!(facets.specializations, set(&["Cardiology"]));
        assert!(facets.has_telemedicine);
    }

    #[test]
    fn specializations_track_exactly_the_known_blend() {
        let candidates = unbounded(vec![
            clinic("c1", &["d1"], &[]),
            clinic("c2", &["d2"], &[]),
        ]);
        let before = aggregate_facets(&candidates, &DetailSnapshot::default());
        assert!(before.specializations.is_empty());

        let snapshot: DetailSnapshot = [
            (
                ClinicId::from("c1"),
                vec![DoctorDetail::new("d1", Some("Cardiology"), false)],
            ),
            (
                ClinicId::from("c2"),
                vec![DoctorDetail::new("d2", Some("Pediatrics"), false)],
            ),
            // Not a candidate: must not leak into the facets.
            (
                ClinicId::from("elsewhere"),
                vec![DoctorDetail::new("d9", Some("Oncology"), true)],
            ),
        ]
        .into_iter()
        .collect();

        let after = aggregate_facets(&candidates, &snapshot);
        assert_eq!(after.specializations, set(&["Cardiology", "Pediatrics"]));
        assert!(!after.has_telemedicine);
    }

    #[test]
    fn weekend_hours_require_an_opening_time() {
        let nine = ClockTime::from_hm(9, 0);
        let mut saturday_open = clinic("sat", &[], &[]);
        saturday_open.opening_hours = saturday_open
            .opening_hours
            .with_day(Weekday::Sat, DayHours::new(nine, None));
        let mut close_only = clinic("close", &[], &[]);
        close_only.opening_hours = close_only
            .opening_hours
            .with_day(Weekday::Sun, DayHours::new(None, nine));

        let without = aggregate_facets(
            &unbounded(vec![close_only.clone()]),
            &DetailSnapshot::default(),
        );
        assert!(!without.has_weekend_hours);

        let with = aggregate_facets(
            &unbounded(vec![close_only, saturday_open]),
            &DetailSnapshot::default(),
        );
        assert!(with.has_weekend_hours);
    }
}
