//! Error taxonomy for the extraction pipeline.
//!
//! Errors are split by the layer that raises them:
//!
//! - [`FetchError`]: raised by the fetch gateway and transports. Transient
//!   variants ([`FetchError::Unreachable`], [`FetchError::Timeout`]) may be
//!   retried once by callers through an alternate transport path.
//! - [`FailureReason`]: carried on failure-flagged [`Article`](crate::models::Article)
//!   records. Extraction never raises; it reports why it gave up.
//! - [`CrawlError`]: orchestrator misuse, surfaced synchronously to the caller.
//! - [`ConfigError`]: settings file loading and validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single outbound fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    /// Malformed URL or a scheme other than `http`/`https`. Never retried.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Network failure, refused connection or non-success HTTP status.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The per-call deadline expired before the transport answered.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(#[serde(with = "duration_ms")] Duration),

    /// The transport answered, but without a usable payload.
    #[error("empty response from {0}")]
    EmptyResponse(String),
}

impl FetchError {
    /// Whether a caller may retry this failure once via an alternate path.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Unreachable(_) | FetchError::Timeout(_))
    }
}

/// Why an extraction produced a failure-flagged record instead of an article.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Every strategy ran but none produced enough body text.
    #[error("insufficient content: best candidate had {found} of {required} required characters")]
    InsufficientContent { found: usize, required: usize },

    /// The markup could not be obtained in the first place.
    #[error("fetch failed: {error}")]
    Fetch { error: FetchError },
}

/// Orchestrator-level misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("a batch is already running on this orchestrator")]
    AlreadyRunning,

    #[error("no enabled sources to crawl")]
    NoSources,
}

/// Settings file loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
