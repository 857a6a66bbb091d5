//! One discovery query: resolve, search, bound by distance.

use std::future::Future;

use chrono::NaiveDateTime;

use clinicfind_client::{ClientError, ClinicApiClient, ClinicQuery};
use clinicfind_core::{ClinicRecord, FacetOptions, FilterState};

use crate::detail_cache::DetailSnapshot;
use crate::distance::{bound_by_radius, unbounded, RankedClinic};
use crate::error::{DiscoveryError, LocationUnavailable};
use crate::facets::aggregate_facets;
use crate::filter::apply_filters;
use crate::location::{LocationResolver, LocationSource, RegionHint, ResolvedLocation};

/// Where clinic search results come from.
pub trait ClinicSource: Send + Sync {
    fn search(
        &self,
        query: &ClinicQuery,
    ) -> impl Future<Output = Result<Vec<ClinicRecord>, ClientError>> + Send;
}

impl ClinicSource for ClinicApiClient {
    async fn search(&self, query: &ClinicQuery) -> Result<Vec<ClinicRecord>, ClientError> {
        self.search_clinics(query).await
    }
}

/// The base candidate set of one query, plus how its origin was obtained.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub location: Result<ResolvedLocation, LocationUnavailable>,
    /// Nearest first when `location` is `Ok`; search order otherwise.
    pub candidates: Vec<RankedClinic>,
}

impl Discovery {
    #[must_use]
    pub fn is_distance_bounded(&self) -> bool {
        self.location.is_ok()
    }

    #[must_use]
    pub fn facets(&self, snapshot: &DetailSnapshot) -> FacetOptions {
        aggregate_facets(&self.candidates, snapshot)
    }

    #[must_use]
    pub fn visible(
        &self,
        filter: &FilterState,
        snapshot: &DetailSnapshot,
        now: NaiveDateTime,
    ) -> Vec<RankedClinic> {
        apply_filters(&self.candidates, filter, snapshot, now)
    }
}

/// Resolves a location, searches clinics, and bounds them by `radius_km`.
///
/// The search is refined by `refine` when given, otherwise by the hint the
/// location fix carried. When no location can be resolved the search still
/// runs and every clinic is returned without a distance.
///
/// # Errors
///
/// Returns [`DiscoveryError::Search`] if the clinic search itself fails.
pub async fn discover<D, I, S>(
    resolver: &LocationResolver<D, I>,
    clinics: &S,
    radius_km: f64,
    refine: Option<RegionHint>,
) -> Result<Discovery, DiscoveryError>
where
    D: LocationSource,
    I: LocationSource,
    S: ClinicSource,
{
    let location = resolver.resolve().await;

    let hint = refine.or_else(|| {
        location
            .as_ref()
            .ok()
            .and_then(|resolved| resolved.fix.hint.clone())
    });
    let query = hint
        .map(|RegionHint { city, region }| ClinicQuery { city, region })
        .unwrap_or_default();

    let found = clinics.search(&query).await?;
    tracing::info!(
        found = found.len(),
        city = query.city.as_deref(),
        region = query.region.as_deref(),
        "clinic search returned"
    );

    let candidates = match &location {
        Ok(resolved) => bound_by_radius(resolved.fix.coordinate, found, radius_km),
        Err(_) => unbounded(found),
    };

    Ok(Discovery {
        location,
        candidates,
    })
}
