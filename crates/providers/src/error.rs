//! Error types for provider requests.
//!
//! None of these escape a provider: `fetch` logs them and reports the
//! provider as failed.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use reconciler::{Coordinates, Domain, DomainResult, ProviderId};

/// Result type alias using ProviderError.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Value out of range for {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("No data: {0}")]
    Empty(String),

    #[error("Decompression failed: {0}")]
    Decompress(#[from] std::io::Error),
}

impl ProviderError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Http(e) if e.is_timeout() => "timeout",
            ProviderError::Http(_) => "http",
            ProviderError::Status { .. } => "status",
            ProviderError::Parse(_) => "parse",
            ProviderError::OutOfRange { .. } => "out_of_range",
            ProviderError::Empty(_) => "empty",
            ProviderError::Decompress(_) => "decompress",
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Parse(e.to_string())
    }
}

/// Collapse a provider attempt into the result `fetch` returns: errors become
/// an empty result naming the provider as failed.
pub(crate) fn settle<D: Domain>(
    id: ProviderId,
    location: &Coordinates,
    date: NaiveDate,
    attempt: ProviderResult<DomainResult<D>>,
) -> DomainResult<D> {
    match attempt {
        Ok(mut result) => {
            result.successful_providers.insert(id);
            result
        }
        Err(e) => {
            warn!(provider = %id, kind = e.kind(), error = %e, "Provider fetch failed");
            DomainResult::failed(*location, date, id)
        }
    }
}
