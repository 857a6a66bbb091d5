//! `locate` command and the location arguments shared with `search`.

use std::time::Duration;

use clap::Args;

use clinicfind_client::IpGeoClient;
use clinicfind_core::{AppConfig, Coordinate};
use clinicfind_discovery::{DevicePosition, LocationResolver, ResolvedLocation};

/// A device position given on the command line. Without it the device
/// strategy reports itself unsupported and IP geolocation is used.
#[derive(Debug, Clone, Default, Args)]
pub struct PositionArgs {
    /// Device latitude in decimal degrees
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Device longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

impl PositionArgs {
    /// # Errors
    ///
    /// Returns an error if the coordinate is out of range.
    pub fn device(&self) -> anyhow::Result<DevicePosition> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng)
                .map(|c| DevicePosition(Some(c)))
                .ok_or_else(|| anyhow::anyhow!("invalid coordinate: --lat {lat} --lng {lng}")),
            _ => Ok(DevicePosition(None)),
        }
    }
}

pub(crate) fn build_resolver(
    config: &AppConfig,
    position: &PositionArgs,
) -> anyhow::Result<LocationResolver<DevicePosition, IpGeoClient>> {
    let device = position.device()?;
    let ip = IpGeoClient::from_config(config)?;
    Ok(LocationResolver::new(
        device,
        ip,
        Duration::from_millis(config.device_timeout_ms),
    ))
}

pub(crate) fn describe_location(resolved: &ResolvedLocation) -> String {
    let mut line = format!("{} via {}", resolved.fix.coordinate, resolved.source);
    if let Some(hint) = &resolved.fix.hint {
        let place: Vec<&str> = [hint.city.as_deref(), hint.region.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !place.is_empty() {
            line.push_str(&format!(" ({})", place.join(", ")));
        }
    }
    line
}

/// Resolve and print the current location.
///
/// An unavailable location is reported, not treated as a failure.
///
/// # Errors
///
/// Returns an error if `--lat/--lng` is invalid or the IP client cannot be built.
pub(crate) async fn run_locate(config: &AppConfig, position: &PositionArgs) -> anyhow::Result<()> {
    let resolver = build_resolver(config, position)?;
    match resolver.resolve().await {
        Ok(resolved) => println!("location: {}", describe_location(&resolved)),
        Err(unavailable) => {
            println!("location unavailable");
            for (strategy, err) in &unavailable.attempts {
                println!("  {strategy:<8} {err}");
            }
        }
    }
    Ok(())
}
