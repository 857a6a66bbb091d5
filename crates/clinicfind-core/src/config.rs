use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing and validation live here, decoupled from the process environment,
/// so tests can drive it with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let api_base_url = require("CLINICFIND_API_BASE_URL")?;
    let api_token = lookup("CLINICFIND_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("CLINICFIND_ENV", "development"))?;
    let log_level = or_default("CLINICFIND_LOG_LEVEL", "info");
    let ip_geo_url = or_default("CLINICFIND_IP_GEO_URL", "https://ipapi.co/json/");

    let request_timeout_secs = parse_u64("CLINICFIND_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("CLINICFIND_USER_AGENT", "clinicfind/0.1 (clinic-discovery)");
    let max_retries = parse_u32("CLINICFIND_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("CLINICFIND_RETRY_BACKOFF_BASE_MS", "500")?;

    let search_radius_km = parse_radius(&or_default("CLINICFIND_SEARCH_RADIUS_KM", "10"))
        .map_err(|reason| invalid("CLINICFIND_SEARCH_RADIUS_KM", reason))?;
    let device_timeout_ms = parse_u64("CLINICFIND_DEVICE_TIMEOUT_MS", "10000")?;
    let enrich_concurrency = parse_usize("CLINICFIND_ENRICH_CONCURRENCY", "4")?;

    Ok(AppConfig {
        env,
        log_level,
        api_base_url,
        api_token,
        ip_geo_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        search_radius_km,
        device_timeout_ms,
        enrich_concurrency,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CLINICFIND_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// A radius must be a finite, strictly positive number of kilometres.
fn parse_radius(raw: &str) -> Result<f64, String> {
    let radius = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(format!("radius must be a positive number of kilometres, got {raw}"))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
