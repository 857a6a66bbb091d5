//! IP-based geolocation client.
//!
//! Coarse by nature: the fix locates the caller's network egress, usually to
//! city precision. The provider's city and region ride along so clinic search
//! can be refined by them.

use std::time::Duration;

use reqwest::Client;

use clinicfind_core::{AppConfig, Coordinate};

use crate::error::ClientError;
use crate::types::IpGeoPayload;

/// A resolved IP geolocation fix.
#[derive(Debug, Clone, PartialEq)]
pub struct IpLocation {
    pub coordinate: Coordinate,
    pub city: Option<String>,
    pub region: Option<String>,
}

/// Client for a single-endpoint IP geolocation provider (ipapi.co shaped).
pub struct IpGeoClient {
    client: Client,
    url: String,
}

impl IpGeoClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: url.trim().to_owned(),
        })
    }

    /// # Errors
    ///
    /// See [`IpGeoClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.ip_geo_url,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// Looks up the caller's approximate position. Single attempt, no retry.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Http`] on network failure.
    /// - [`ClientError::UnexpectedStatus`] / [`ClientError::NotFound`] for non-2xx responses.
    /// - [`ClientError::Deserialize`] if the body is not JSON of the expected shape.
    /// - [`ClientError::MalformedResponse`] if the provider reports an error or
    ///   the coordinate is missing or out of range.
    pub async fn locate(&self) -> Result<IpLocation, ClientError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                url: self.url.clone(),
            });
        }
        if !status.is_success() {
            return Err(ClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.text().await?;
        let payload: IpGeoPayload =
            serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
                context: self.url.clone(),
                source: e,
            })?;

        let location = payload_to_location(payload).map_err(|reason| {
            ClientError::MalformedResponse {
                context: self.url.clone(),
                reason,
            }
        })?;

        tracing::debug!(
            lat = location.coordinate.lat,
            lng = location.coordinate.lng,
            city = location.city.as_deref(),
            "IP geolocation resolved"
        );
        Ok(location)
    }
}

fn payload_to_location(payload: IpGeoPayload) -> Result<IpLocation, String> {
    if payload.error == Some(true) {
        return Err(payload
            .reason
            .unwrap_or_else(|| "provider reported an error".to_string()));
    }
    let (Some(lat), Some(lng)) = (payload.latitude, payload.longitude) else {
        return Err("missing latitude or longitude".to_string());
    };
    let coordinate =
        Coordinate::new(lat, lng).ok_or_else(|| format!("coordinate out of range: {lat},{lng}"))?;

    Ok(IpLocation {
        coordinate,
        city: non_empty(payload.city),
        region: non_empty(payload.region),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
