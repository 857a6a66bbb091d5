use serde::{Deserialize, Serialize};

/// Identity of a doctor as referenced from a clinic record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(String);

impl DoctorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DoctorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DoctorId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Enriched doctor data fetched from a clinic's roster endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorDetail {
    pub id: DoctorId,
    pub name: Option<String>,
    /// `None` when the roster omits it or sends an empty string.
    pub specialization: Option<String>,
    pub available_for_teleconsultation: bool,
    pub qualification: Option<String>,
    pub experience_years: Option<u32>,
    pub consultation_fee: Option<f64>,
}

impl DoctorDetail {
    /// A detail record with only identity, specialization and teleconsultation set.
    pub fn new(
        id: impl Into<String>,
        specialization: Option<&str>,
        available_for_teleconsultation: bool,
    ) -> Self {
        Self {
            id: DoctorId::new(id),
            name: None,
            specialization: specialization.map(str::to_string),
            available_for_teleconsultation,
            qualification: None,
            experience_years: None,
            consultation_fee: None,
        }
    }
}
