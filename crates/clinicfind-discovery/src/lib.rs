//! Proximity discovery and faceted filtering over clinic search results.
//!
//! Data flows leaves-first: [`LocationResolver`] produces an origin,
//! [`distance::bound_by_radius`] turns a search response into the candidate
//! set, [`DetailCache`] enriches doctor rosters on demand, and
//! [`facets::aggregate_facets`] / [`filter::apply_filters`] derive the
//! view-model from whatever is currently known.

pub mod detail_cache;
pub mod distance;
pub mod error;
pub mod facets;
pub mod filter;
pub mod location;
pub mod pipeline;
pub mod roster;

pub use detail_cache::{CacheStats, DetailCache, DetailSnapshot, EntryState, RosterSource};
pub use distance::{bound_by_radius, haversine_km, unbounded, RankedClinic, EARTH_RADIUS_KM};
pub use error::{DiscoveryError, EnrichmentFailed, LocateError, LocationUnavailable};
pub use facets::aggregate_facets;
pub use filter::apply_filters;
pub use location::{
    DevicePosition, LocationFix, LocationResolver, LocationSource, RegionHint, ResolvedLocation,
};
pub use pipeline::{discover, ClinicSource, Discovery};
pub use roster::{roster_for, DoctorInfo};
