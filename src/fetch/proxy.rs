//! Indirection transport: fetches a page through an intermediary service.
//!
//! The service is described by a URL prefix. The target URL is url-encoded
//! and either substituted for a `{url}` placeholder or appended to the
//! prefix. Services that answer with JSON (`{"contents": "<html>..."}`)
//! declare [`Envelope::JsonField`]; the gateway unwraps it.

use super::{DirectTransport, Envelope, Transport};
use crate::config::ProxySettings;
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;
use url::Url;

#[derive(Debug, Clone)]
pub struct ProxyTransport {
    http: DirectTransport,
    prefix: String,
    envelope: Envelope,
}

impl ProxyTransport {
    pub fn new(http: DirectTransport, settings: &ProxySettings) -> Self {
        Self {
            http,
            prefix: settings.prefix.clone(),
            envelope: settings.envelope.clone(),
        }
    }

    /// Build the service URL that fetches `target`.
    pub fn proxied_url(&self, target: &Url) -> Result<Url, FetchError> {
        let encoded = urlencoding::encode(target.as_str());
        let raw = if self.prefix.contains("{url}") {
            self.prefix.replace("{url}", &encoded)
        } else {
            format!("{}{}", self.prefix, encoded)
        };
        Url::parse(&raw).map_err(|e| FetchError::InvalidUrl(format!("proxy prefix {}: {e}", self.prefix)))
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    fn name(&self) -> &str {
        "proxy"
    }

    fn envelope(&self) -> Envelope {
        self.envelope.clone()
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_raw(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let proxied = self.proxied_url(url)?;
        self.http.get(&proxied, timeout).await
    }
}
