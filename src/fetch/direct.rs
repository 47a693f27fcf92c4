//! Direct HTTP transport backed by `reqwest`.

use super::Transport;
use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Browser-like user agent; several news sites serve stripped pages to
/// unknown agents.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct DirectTransport {
    client: reqwest::Client,
}

impl DirectTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Issue the GET and map failures; shared with [`super::ProxyTransport`].
    pub(crate) async fn get(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unreachable(format!("HTTP {} for {}", status.as_u16(), url)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;
        debug!(%url, status = status.as_u16(), bytes = bytes.len(), "HTTP response");
        Ok(bytes.to_vec())
    }
}

fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Unreachable(e.to_string())
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn name(&self) -> &str {
        "direct"
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_raw(&self, url: &Url, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        self.get(url, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchGateway;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_direct_transport_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>story</html>", "text/html"))
            .mount(&server)
            .await;

        let gw = FetchGateway::new(Arc::new(DirectTransport::new().unwrap()));
        let body = gw
            .fetch(&format!("{}/story", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, b"<html>story</html>");
    }

    #[tokio::test]
    async fn test_direct_transport_maps_http_status_to_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let gw = FetchGateway::new(Arc::new(DirectTransport::new().unwrap()));
        let err = gw
            .fetch(&format!("{}/gone", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            FetchError::Unreachable(msg) => assert!(msg.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_direct_transport_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let gw = FetchGateway::new(Arc::new(DirectTransport::new().unwrap()));
        let err = gw
            .fetch(&format!("{}/slow", server.uri()), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Timeout(Duration::from_millis(100)));
    }
}
