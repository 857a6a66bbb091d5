//! Normalization from wire payloads to `clinicfind-core` domain types.
//!
//! Bad data inside a record degrades that field only: a malformed coordinate,
//! fee or experience value becomes `None`, a malformed time becomes a closed
//! bound. None of these is an error.

use std::collections::BTreeSet;

use clinicfind_core::clinics::parse_weekday_key;
use clinicfind_core::{
    ClinicId, ClinicRecord, ClockTime, Coordinate, DayHours, DoctorDetail, DoctorId, WeeklyHours,
};

use crate::types::{ClinicPayload, DayHoursPayload, DoctorPayload};

/// Normalizes a raw [`ClinicPayload`] into a [`ClinicRecord`].
#[must_use]
pub fn normalize_clinic(payload: ClinicPayload) -> ClinicRecord {
    let coordinate = normalize_coordinate(&payload);
    let id = payload.id.trim().to_string();

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.clone());

    let opening_hours = payload
        .opening_hours
        .map(|days| {
            let mut hours = WeeklyHours::default();
            for (key, day) in days {
                let Some(weekday) = parse_weekday_key(&key) else {
                    tracing::debug!(clinic_id = %id, key = %key, "ignoring unknown weekday key");
                    continue;
                };
                hours.set(weekday, normalize_day(&id, &key, day.unwrap_or_default()));
            }
            hours
        })
        .unwrap_or_default();

    let facilities: BTreeSet<String> = payload
        .facilities
        .unwrap_or_default()
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    let doctor_refs = payload
        .doctors
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.into_id().trim().to_string())
        .filter(|id| !id.is_empty())
        .map(DoctorId::new)
        .collect();

    ClinicRecord {
        id: ClinicId::new(id),
        name,
        address: non_empty(payload.address),
        city: non_empty(payload.city),
        coordinate,
        opening_hours,
        facilities,
        doctor_refs,
    }
}

/// Normalizes a raw [`DoctorPayload`] into a [`DoctorDetail`].
#[must_use]
pub fn normalize_doctor(payload: DoctorPayload) -> DoctorDetail {
    let id = payload.id.trim().to_string();

    let consultation_fee = payload.consultation_fee.as_ref().and_then(|raw| {
        let fee = value_as_f64(raw).filter(|fee| fee.is_finite() && *fee >= 0.0);
        if fee.is_none() {
            tracing::debug!(doctor_id = %id, raw = %raw, "ignoring malformed consultation fee");
        }
        fee
    });
    let experience_years = payload.experience_years.as_ref().and_then(|raw| {
        let years = value_as_u32(raw);
        if years.is_none() {
            tracing::debug!(doctor_id = %id, raw = %raw, "ignoring malformed experience");
        }
        years
    });

    DoctorDetail {
        id: DoctorId::new(id),
        name: non_empty(payload.name),
        specialization: non_empty(payload.specialization),
        available_for_teleconsultation: payload
            .available_for_teleconsultation
            .as_ref()
            .and_then(value_as_bool)
            .unwrap_or(false),
        qualification: non_empty(payload.qualification),
        experience_years,
        consultation_fee,
    }
}

/// Flat `latitude`/`longitude` fields win over a GeoJSON `location`.
fn normalize_coordinate(payload: &ClinicPayload) -> Option<Coordinate> {
    let flat = match (&payload.latitude, &payload.longitude) {
        (Some(lat), Some(lng)) => Some((value_as_f64(lat), value_as_f64(lng))),
        _ => None,
    };
    let geojson = payload.location.as_ref().and_then(|loc| match loc.coordinates.as_slice() {
        [lng, lat, ..] => Some((value_as_f64(lat), value_as_f64(lng))),
        _ => None,
    });

    match flat.or(geojson) {
        Some((Some(lat), Some(lng))) => {
            let coordinate = Coordinate::new(lat, lng);
            if coordinate.is_none() {
                tracing::debug!(
                    clinic_id = %payload.id,
                    lat,
                    lng,
                    "dropping out-of-range coordinate"
                );
            }
            coordinate
        }
        Some(_) => {
            tracing::debug!(clinic_id = %payload.id, "dropping non-numeric coordinate");
            None
        }
        None => None,
    }
}

fn normalize_day(clinic_id: &str, key: &str, day: DayHoursPayload) -> DayHours {
    DayHours::new(
        normalize_time(clinic_id, key, day.open.as_ref()),
        normalize_time(clinic_id, key, day.close.as_ref()),
    )
}

fn normalize_time(
    clinic_id: &str,
    key: &str,
    raw: Option<&serde_json::Value>,
) -> Option<ClockTime> {
    let parsed = match raw? {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) if s.trim().is_empty() => return None,
        serde_json::Value::String(s) => ClockTime::parse(s),
        _ => None,
    };
    if parsed.is_none() {
        tracing::debug!(clinic_id, day = key, raw = ?raw, "treating malformed time as closed");
    }
    parsed
}

fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_as_u32(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn value_as_bool(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => s.trim().parse::<bool>().ok(),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
