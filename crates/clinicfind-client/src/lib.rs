//! HTTP collaborators for clinic discovery.
//!
//! [`ClinicApiClient`] talks to the clinic search and doctor roster REST API;
//! [`IpGeoClient`] performs IP-based geolocation. Both normalize wire JSON into
//! `clinicfind-core` domain types and never fail a whole response because of
//! one malformed record.

pub mod client;
pub mod error;
pub mod geoip;
pub mod normalize;
pub mod types;

mod retry;

pub use client::{ClinicApiClient, ClinicQuery};
pub use error::ClientError;
pub use geoip::{IpGeoClient, IpLocation};
pub use normalize::{normalize_clinic, normalize_doctor};
