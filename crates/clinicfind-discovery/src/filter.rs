//! Composition of the active filter selections into one predicate.

use chrono::{Datelike, NaiveDateTime};

use clinicfind_core::{ClinicRecord, ClockTime, FilterState};

use crate::detail_cache::DetailSnapshot;
use crate::distance::RankedClinic;
use crate::roster::{roster_for, DoctorInfo};

/// Keeps the candidates for which every active predicate holds, preserving
/// their order.
///
/// `now` is the caller's local wall-clock time; no timezone conversion is
/// applied. Telemedicine and specialization predicates only see resolved
/// rosters, so an unenriched clinic fails them until its roster arrives.
#[must_use]
pub fn apply_filters(
    candidates: &[RankedClinic],
    filter: &FilterState,
    snapshot: &DetailSnapshot,
    now: NaiveDateTime,
) -> Vec<RankedClinic> {
    if filter.is_empty() {
        return candidates.to_vec();
    }
    let visible: Vec<RankedClinic> = candidates
        .iter()
        .filter(|ranked| matches_filters(&ranked.clinic, filter, snapshot, now))
        .cloned()
        .collect();

    tracing::debug!(
        candidates = candidates.len(),
        visible = visible.len(),
        "filters applied"
    );
    visible
}

/// `true` when the clinic satisfies every active predicate in `filter`.
///
/// Predicates run cheapest first and short-circuit.
#[must_use]
pub fn matches_filters(
    clinic: &ClinicRecord,
    filter: &FilterState,
    snapshot: &DetailSnapshot,
    now: NaiveDateTime,
) -> bool {
    if filter.doctor_available && !clinic.has_doctors() {
        return false;
    }

    if filter.needs_doctor_details() {
        let roster = roster_for(clinic, snapshot);
        let details = roster.iter().filter_map(|doctor| match doctor {
            DoctorInfo::Detail(detail) => Some(*detail),
            DoctorInfo::Summary { .. } => None,
        });

        if filter.telemedicine
            && !details
                .clone()
                .any(|detail| detail.available_for_teleconsultation)
        {
            return false;
        }
        if !filter.specializations.is_empty()
            && !details.clone().any(|detail| {
                detail
                    .specialization
                    .as_ref()
                    .is_some_and(|s| filter.specializations.contains(s))
            })
        {
            return false;
        }
    }

    if filter.open_now && !is_open_at(clinic, now) {
        return false;
    }

    if filter.open_weekends && !clinic.opening_hours.open_both_weekend_days() {
        return false;
    }

    filter.facilities.is_subset(&clinic.facilities)
}

/// Whether the clinic's window for `now`'s weekday contains `now`, inclusive.
#[must_use]
pub fn is_open_at(clinic: &ClinicRecord, now: NaiveDateTime) -> bool {
    clinic
        .opening_hours
        .day(now.weekday())
        .is_open_at(ClockTime::from_naive(now.time()))
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
