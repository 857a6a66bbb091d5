//! HTTP client for the clinic search and doctor roster REST API.
//!
//! Wraps `reqwest` with status mapping, retry on transient failures, and
//! per-record tolerant decoding: a list response is decoded item by item and
//! malformed items are skipped with a warning rather than failing the call.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use clinicfind_core::{AppConfig, ClinicId, ClinicRecord, DoctorDetail};

use crate::error::ClientError;
use crate::normalize::{normalize_clinic, normalize_doctor};
use crate::retry::retry_with_backoff;
use crate::types::{ClinicPayload, DoctorPayload, ListPayload};

/// Optional refinement hints for a clinic search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClinicQuery {
    pub city: Option<String>,
    pub region: Option<String>,
}

impl ClinicQuery {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.region.is_none()
    }
}

/// Client for the clinic search and doctor roster endpoints.
///
/// Use [`ClinicApiClient::new`] with an explicit base URL (tests point this at
/// a wiremock server) or [`ClinicApiClient::from_config`] in the binary.
pub struct ClinicApiClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl ClinicApiClient {
    /// Creates a client with no retries and no bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ClientError::InvalidBaseUrl`] if
    /// `base_url` is not an absolute hierarchical URL.
    pub fn new(base_url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            api_token: None,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// See [`ClinicApiClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let client = Self::new(
            &config.api_base_url,
            config.request_timeout_secs,
            &config.user_agent,
        )?
        .with_retries(config.max_retries, config.retry_backoff_base_ms);

        Ok(match &config.api_token {
            Some(token) => client.with_token(token),
            None => client,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.api_token = Some(token.to_owned());
        self
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Searches clinics, optionally refined by city and region.
    ///
    /// Coordinates may be absent on any returned record; malformed records
    /// are skipped.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotFound`] / [`ClientError::UnexpectedStatus`] for non-2xx responses.
    /// - [`ClientError::Http`] on network failure after retries.
    /// - [`ClientError::Deserialize`] if the body is not a clinic list.
    pub async fn search_clinics(
        &self,
        query: &ClinicQuery,
    ) -> Result<Vec<ClinicRecord>, ClientError> {
        let mut url = self.endpoint(&["clinics", "search"])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(city) = &query.city {
                pairs.append_pair("city", city);
            }
            if let Some(region) = &query.region {
                pairs.append_pair("region", region);
            }
        }
        // An empty query_pairs_mut() still leaves a trailing '?'.
        if url.query() == Some("") {
            url.set_query(None);
        }

        let items = self.get_list(&url).await?;
        let clinics: Vec<ClinicRecord> = decode_items::<ClinicPayload>(items, "clinic")
            .into_iter()
            .map(normalize_clinic)
            .collect();

        tracing::debug!(
            city = query.city.as_deref(),
            region = query.region.as_deref(),
            count = clinics.len(),
            "clinic search complete"
        );
        Ok(clinics)
    }

    /// Fetches the detailed doctor roster for one clinic.
    ///
    /// # Errors
    ///
    /// Same as [`ClinicApiClient::search_clinics`].
    pub async fn fetch_doctor_roster(
        &self,
        clinic_id: &ClinicId,
    ) -> Result<Vec<DoctorDetail>, ClientError> {
        let url = self.endpoint(&["clinics", clinic_id.as_str(), "doctors"])?;
        let items = self.get_list(&url).await?;
        let doctors: Vec<DoctorDetail> = decode_items::<DoctorPayload>(items, "doctor")
            .into_iter()
            .map(normalize_doctor)
            .collect();

        tracing::debug!(clinic_id = %clinic_id, count = doctors.len(), "doctor roster fetched");
        Ok(doctors)
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_list(&self, url: &Url) -> Result<Vec<serde_json::Value>, ClientError> {
        let payload: ListPayload = self.get_json(url).await?;
        Ok(payload.into_items())
    }

    /// Sends a GET with retry, maps non-2xx statuses, and decodes the body.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ClientError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let mut request = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json");
                if let Some(token) = &self.api_token {
                    request = request.bearer_auth(token);
                }

                let response = request.send().await?;
                let status = response.status();
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ClientError::NotFound {
                        url: url.to_string(),
                    });
                }
                if !status.is_success() {
                    return Err(ClientError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                Ok(response.text().await?)
            }
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| ClientError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

/// Parses and normalises a base URL so it always ends with a slash.
fn parse_base_url(base_url: &str) -> Result<Url, ClientError> {
    let normalised = format!("{}/", base_url.trim().trim_end_matches('/'));
    let url = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
        base_url: base_url.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: "URL cannot be a base".to_string(),
        });
    }
    Ok(url)
}

/// Decodes each item independently, skipping (and logging) the ones that fail.
fn decode_items<T: DeserializeOwned>(items: Vec<serde_json::Value>, kind: &str) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(kind, index, error = %err, "skipping malformed record");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        tracing::warn!(kind, total, kept = decoded.len(), "some records were skipped");
    }
    decoded
}
