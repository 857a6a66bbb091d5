//! Filter selections and the facet options they are chosen from.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The user's active filter selections.
///
/// Owned by the presentation layer; the engine reads it as an immutable
/// input on every recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub specializations: BTreeSet<String>,
    pub facilities: BTreeSet<String>,
    pub doctor_available: bool,
    pub telemedicine: bool,
    pub open_now: bool,
    pub open_weekends: bool,
}

impl FilterState {
    /// `true` when no predicate is active and every clinic passes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specializations.is_empty()
            && self.facilities.is_empty()
            && !self.doctor_available
            && !self.telemedicine
            && !self.open_now
            && !self.open_weekends
    }

    /// Filters that can only be satisfied by enriched doctor data.
    #[must_use]
    pub fn needs_doctor_details(&self) -> bool {
        self.telemedicine || !self.specializations.is_empty()
    }
}

/// Filter options derived from the currently loaded data. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetOptions {
    pub specializations: BTreeSet<String>,
    pub facilities: BTreeSet<String>,
    pub has_telemedicine: bool,
    pub has_doctors: bool,
    pub has_weekend_hours: bool,
}
