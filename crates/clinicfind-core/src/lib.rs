//! Domain types and configuration shared by every clinicfind crate.

pub mod app_config;
pub mod clinics;
pub mod config;
pub mod doctors;
pub mod filters;

pub use app_config::{AppConfig, Environment};
pub use clinics::{ClinicId, ClinicRecord, ClockTime, Coordinate, DayHours, WeeklyHours};
pub use config::{load_app_config, load_app_config_from_env};
pub use doctors::{DoctorDetail, DoctorId};
pub use filters::{FacetOptions, FilterState};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
