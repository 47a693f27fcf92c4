//! Fetch gateway: outbound HTTP GETs through a pluggable transport.
//!
//! The gateway owns three concerns and nothing else:
//!
//! 1. **Validation**: only absolute `http`/`https` URLs with a host are
//!    accepted, everything else is [`FetchError::InvalidUrl`].
//! 2. **Deadline**: every call is wrapped in a hard timeout; expiry maps to
//!    [`FetchError::Timeout`] whatever the transport was doing.
//! 3. **Envelope unwrapping**: transports that wrap the page (an indirection
//!    service returning JSON with a payload field) are unwrapped here, and a
//!    missing payload is [`FetchError::EmptyResponse`].
//!
//! Retry policy lives with callers. [`FetchPlan`] is the policy
//! the crawler uses: one attempt on the primary gateway, then at most one
//! more through the fallback gateway when the failure was transient.
//!
//! # Transports
//!
//! | Transport | Module | Envelope |
//! |-----------|--------|----------|
//! | [`DirectTransport`] | [`direct`] | raw bytes |
//! | [`ProxyTransport`] | [`proxy`] | raw or JSON field, per configuration |

pub mod direct;
pub mod proxy;

pub use direct::DirectTransport;
pub use proxy::ProxyTransport;

use crate::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// How a transport packages the page it fetched.
///
/// In YAML either the bare word `raw` or a map naming the payload key:
///
/// ```yaml
/// envelope: raw
/// envelope: { json_field: contents }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "EnvelopeRepr")]
pub enum Envelope {
    /// The body is the page itself.
    #[default]
    Raw,
    /// The body is a JSON object; the page is the string under this key.
    JsonField(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvelopeRepr {
    Name(String),
    Json { json_field: String },
}

impl TryFrom<EnvelopeRepr> for Envelope {
    type Error = String;

    fn try_from(repr: EnvelopeRepr) -> Result<Self, Self::Error> {
        match repr {
            EnvelopeRepr::Name(name) if name.eq_ignore_ascii_case("raw") => Ok(Envelope::Raw),
            EnvelopeRepr::Name(name) => Err(format!("unknown envelope {name:?}, expected raw or {{ json_field: <key> }}")),
            EnvelopeRepr::Json { json_field } if json_field.trim().is_empty() => {
                Err("envelope json_field must not be empty".to_string())
            }
            EnvelopeRepr::Json { json_field } => Ok(Envelope::JsonField(json_field)),
        }
    }
}

/// Capability to fetch a URL and hand back the bytes the remote returned.
///
/// Implementations do not validate URLs, enforce deadlines or unwrap
/// envelopes; [`FetchGateway`] does that uniformly for all of them.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Short name used in logs, e.g. `"direct"`.
    fn name(&self) -> &str;

    fn envelope(&self) -> Envelope {
        Envelope::Raw
    }

    async fn fetch_raw(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Parse and vet a URL for fetching.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FetchError::InvalidUrl(format!(
                "{url}: unsupported scheme {other}"
            )));
        }
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::InvalidUrl(format!("{url}: missing host")));
    }
    Ok(parsed)
}

/// Validating, deadline-enforcing front for a [`Transport`].
#[derive(Debug, Clone)]
pub struct FetchGateway {
    transport: Arc<dyn Transport>,
}

impl FetchGateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Fetch `url`, returning the unwrapped page bytes.
    #[instrument(level = "debug", skip(self), fields(transport = %self.transport.name()))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let parsed = validate_url(url)?;
        let t0 = Instant::now();

        let raw = match tokio::time::timeout(timeout, self.transport.fetch_raw(&parsed, timeout)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(timeout)),
        };

        let body = unwrap_envelope(&self.transport.envelope(), raw, url)?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched"
        );
        Ok(body)
    }
}

fn unwrap_envelope(envelope: &Envelope, raw: Vec<u8>, url: &str) -> Result<Vec<u8>, FetchError> {
    let body = match envelope {
        Envelope::Raw => raw,
        Envelope::JsonField(field) => {
            let value: serde_json::Value = serde_json::from_slice(&raw)
                .map_err(|_| FetchError::EmptyResponse(url.to_string()))?;
            match value.get(field).and_then(|v| v.as_str()) {
                Some(payload) => payload.as_bytes().to_vec(),
                None => return Err(FetchError::EmptyResponse(url.to_string())),
            }
        }
    };

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::EmptyResponse(url.to_string()));
    }
    Ok(body)
}

/// Caller-side fetch policy: primary gateway, then one fallback attempt.
///
/// The fallback is only tried for transient failures (unreachable or timed
/// out). Invalid URLs and empty payloads are returned as-is.
#[derive(Debug, Clone)]
pub struct FetchPlan {
    primary: FetchGateway,
    fallback: Option<FetchGateway>,
    timeout: Duration,
}

impl FetchPlan {
    pub fn new(primary: FetchGateway, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: FetchGateway) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` and decode it as (lossy) UTF-8 markup.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_markup(&self, url: &str) -> Result<String, FetchError> {
        let bytes = match self.primary.fetch(url, self.timeout).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_transient() => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        error = %e,
                        primary = %self.primary.transport_name(),
                        fallback = %fallback.transport_name(),
                        "Primary fetch failed; retrying once via fallback"
                    );
                    fallback.fetch(url, self.timeout).await?
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport used by tests across the crate.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum Canned {
        Body(String),
        Fail(FetchError),
        Slow(Duration, String),
    }

    #[derive(Debug, Default)]
    pub struct FakeTransport {
        pub name: String,
        pub envelope: Envelope,
        pub routes: HashMap<String, Canned>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Default::default()
            }
        }

        pub fn route(mut self, url: &str, canned: Canned) -> Self {
            self.routes.insert(url.to_string(), canned);
            self
        }

        pub fn body(self, url: &str, body: &str) -> Self {
            self.route(url, Canned::Body(body.to_string()))
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn name(&self) -> &str {
            &self.name
        }

        fn envelope(&self) -> Envelope {
            self.envelope.clone()
        }

        async fn fetch_raw(&self, url: &Url, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.routes.get(url.as_str()) {
                Some(Canned::Body(body)) => Ok(body.clone().into_bytes()),
                Some(Canned::Fail(e)) => Err(e.clone()),
                Some(Canned::Slow(delay, body)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(body.clone().into_bytes())
                }
                None => Err(FetchError::Unreachable(format!("HTTP 404 for {url}"))),
            }
        }
    }
}
