//! Best-effort location resolution with an ordered fallback chain.
//!
//! Strategies run in order: device position, then IP geolocation. The first
//! fix wins. When both fail the caller gets a [`LocationUnavailable`] listing
//! every attempt and is expected to show results without distance bounding.
//! Nothing is retried here; a retry is a fresh call to
//! [`LocationResolver::resolve`].

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use clinicfind_client::{IpGeoClient, IpLocation};
use clinicfind_core::Coordinate;

use crate::error::{LocateError, LocationUnavailable};

/// Coarse place names that can refine a clinic search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionHint {
    pub city: Option<String>,
    pub region: Option<String>,
}

impl RegionHint {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.region.is_none()
    }
}

/// One successful position fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub hint: Option<RegionHint>,
}

impl LocationFix {
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: RegionHint) -> Self {
        self.hint = (!hint.is_empty()).then_some(hint);
        self
    }
}

/// A fix together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub fix: LocationFix,
    pub source: &'static str,
}

/// A single strategy in the fallback chain.
pub trait LocationSource: Send + Sync + 'static {
    /// Short identifier used in logs and in [`LocationUnavailable::attempts`].
    fn name(&self) -> &'static str;

    fn locate(&self) -> impl Future<Output = Result<LocationFix, LocateError>> + Send;
}

/// Device position supplied by the host (for the CLI, `--lat/--lng`).
///
/// `None` models a host with no positioning capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevicePosition(pub Option<Coordinate>);

impl LocationSource for DevicePosition {
    fn name(&self) -> &'static str {
        "device"
    }

    async fn locate(&self) -> Result<LocationFix, LocateError> {
        self.0.map(LocationFix::new).ok_or(LocateError::Unsupported)
    }
}

impl LocationSource for IpGeoClient {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn locate(&self) -> Result<LocationFix, LocateError> {
        let IpLocation {
            coordinate,
            city,
            region,
        } = IpGeoClient::locate(self).await?;
        Ok(LocationFix::new(coordinate).with_hint(RegionHint { city, region }))
    }
}

/// Runs the device strategy (bounded by `device_timeout`), then the IP strategy.
pub struct LocationResolver<D, I> {
    device: D,
    ip: I,
    device_timeout: Duration,
}

impl<D: LocationSource, I: LocationSource> LocationResolver<D, I> {
    pub fn new(device: D, ip: I, device_timeout: Duration) -> Self {
        Self {
            device,
            ip,
            device_timeout,
        }
    }

    /// Resolves a best-effort location.
    ///
    /// # Errors
    ///
    /// Returns [`LocationUnavailable`] when every strategy failed.
    pub async fn resolve(&self) -> Result<ResolvedLocation, LocationUnavailable> {
        let mut attempts = Vec::with_capacity(2);

        let device = tokio::time::timeout(self.device_timeout, self.device.locate())
            .await
            .unwrap_or_else(|_| {
                Err(LocateError::Timeout {
                    timeout_ms: u64::try_from(self.device_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            });
        match device {
            Ok(fix) => return Ok(resolved(fix, self.device.name())),
            Err(err) => {
                tracing::warn!(
                    strategy = self.device.name(),
                    error = %err,
                    "location strategy failed"
                );
                attempts.push((self.device.name(), err));
            }
        }

        match self.ip.locate().await {
            Ok(fix) => return Ok(resolved(fix, self.ip.name())),
            Err(err) => {
                tracing::warn!(
                    strategy = self.ip.name(),
                    error = %err,
                    "location strategy failed"
                );
                attempts.push((self.ip.name(), err));
            }
        }

        tracing::warn!(
            attempts = attempts.len(),
            "location unavailable; distance bounding disabled"
        );
        Err(LocationUnavailable { attempts })
    }
}

fn resolved(fix: LocationFix, source: &'static str) -> ResolvedLocation {
    tracing::info!(
        source,
        lat = fix.coordinate.lat,
        lng = fix.coordinate.lng,
        "location resolved"
    );
    ResolvedLocation { fix, source }
}
