//! Wire types for the clinic API and IP geolocation responses.
//!
//! These mirror the JSON as sent and are deliberately lenient: most fields are
//! optional and `null`-tolerant. Conversion into domain types happens in
//! [`crate::normalize`].

use std::collections::HashMap;

use serde::Deserialize;

/// List responses arrive either bare or wrapped in a named envelope.
///
/// Items stay as raw JSON so one malformed record can be skipped without
/// failing the whole list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload {
    Bare(Vec<serde_json::Value>),
    Clinics { clinics: Vec<serde_json::Value> },
    Doctors { doctors: Vec<serde_json::Value> },
    Data { data: Vec<serde_json::Value> },
}

impl ListPayload {
    #[must_use]
    pub fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            ListPayload::Bare(items)
            | ListPayload::Clinics { clinics: items }
            | ListPayload::Doctors { doctors: items }
            | ListPayload::Data { data: items } => items,
        }
    }
}

// ---------------------------------------------------------------------------
// Clinic search
// ---------------------------------------------------------------------------

/// One clinic object from the search endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicPayload {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Number or numeric string.
    #[serde(default)]
    pub latitude: Option<serde_json::Value>,
    #[serde(default)]
    pub longitude: Option<serde_json::Value>,
    /// GeoJSON point, `coordinates: [lng, lat]`.
    #[serde(default)]
    pub location: Option<GeoPointPayload>,
    #[serde(default)]
    pub opening_hours: Option<HashMap<String, Option<DayHoursPayload>>>,
    #[serde(default)]
    pub facilities: Option<Vec<String>>,
    #[serde(default)]
    pub doctors: Option<Vec<DoctorRefPayload>>,
}

#[derive(Debug, Deserialize)]
pub struct GeoPointPayload {
    #[serde(default)]
    pub coordinates: Vec<serde_json::Value>,
}

/// `open`/`close` should be `"HH:MM"` strings; anything else reads as closed.
#[derive(Debug, Default, Deserialize)]
pub struct DayHoursPayload {
    #[serde(default)]
    pub open: Option<serde_json::Value>,
    #[serde(default)]
    pub close: Option<serde_json::Value>,
}

/// A doctor reference inside a clinic: a bare id or an object carrying one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DoctorRefPayload {
    Id(String),
    Object {
        #[serde(alias = "_id")]
        id: String,
    },
}

impl DoctorRefPayload {
    #[must_use]
    pub fn into_id(self) -> String {
        match self {
            DoctorRefPayload::Id(id) | DoctorRefPayload::Object { id } => id,
        }
    }
}

// ---------------------------------------------------------------------------
// Doctor roster
// ---------------------------------------------------------------------------

/// One doctor object from a clinic's roster endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPayload {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    /// Boolean or `"true"`/`"false"`.
    #[serde(default)]
    pub available_for_teleconsultation: Option<serde_json::Value>,
    #[serde(default)]
    pub qualification: Option<String>,
    /// Number or numeric string.
    #[serde(default)]
    pub experience_years: Option<serde_json::Value>,
    #[serde(default)]
    pub consultation_fee: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// IP geolocation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IpGeoPayload {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Set by the provider when the lookup itself failed.
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}
