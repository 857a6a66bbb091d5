use thiserror::Error;

use clinicfind_client::ClientError;
use clinicfind_core::ClinicId;

/// Why a single location strategy failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("location capability is not available")]
    Unsupported,

    #[error("location permission denied")]
    PermissionDenied,

    #[error("location lookup timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed location response: {0}")]
    Malformed(String),
}

impl From<ClientError> for LocateError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Deserialize { .. } | ClientError::MalformedResponse { .. } => {
                LocateError::Malformed(err.to_string())
            }
            other => LocateError::Network(other.to_string()),
        }
    }
}

/// Every location strategy failed. Non-fatal: discovery continues without
/// distance bounding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("location unavailable after {} strategies", .attempts.len())]
pub struct LocationUnavailable {
    /// `(strategy name, failure)` in the order the strategies were tried.
    pub attempts: Vec<(&'static str, LocateError)>,
}

/// A roster fetch for one clinic failed. Recovered per clinic and eligible
/// for retry on the next trigger.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("doctor roster unavailable for clinic {clinic_id}: {reason}")]
pub struct EnrichmentFailed {
    pub clinic_id: ClinicId,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("clinic search failed: {0}")]
    Search(#[from] ClientError),
}
