//! HTTP client for fetching a resolved safety data sheet.
//!
//! Each transfer builds its own client, so no connection or cookie state is
//! shared between fetch tasks. Redirects are never followed: a redirect on
//! the document URL means the provider link expired and whatever the server
//! would serve instead is not the sheet.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DOWNLOAD_TIMEOUT};
use super::error::DownloadError;
use crate::user_agent;

/// Fetches document bodies with a bounded timeout and a strict no-redirect rule.
#[derive(Debug, Clone, Copy)]
pub struct DocumentClient {
    timeout: Duration,
}

impl Default for DocumentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentClient {
    /// Creates a client with the default 20 second transfer timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }

    /// Creates a client with an explicit transfer timeout.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the transfer timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Downloads the document at `url` into memory.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The request fails (network error, timeout)
    /// - The server redirects (the link is considered stale)
    /// - The server returns a non-success status
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let client = self.open_session()?;

        let response = client
            .get(parsed)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok());
            return Err(DownloadError::redirected(url, location));
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::network(url, e))?;
        debug!(bytes = body.len(), "document fetched");
        Ok(body.to_vec())
    }

    fn open_session(&self) -> Result<Client, DownloadError> {
        Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(self.timeout))
            .timeout(self.timeout)
            .user_agent(user_agent::browser_user_agent())
            .gzip(true)
            .redirect(Policy::none())
            .build()
            .map_err(DownloadError::client_build)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_body_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sds/64-19-7.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 body".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let body = DocumentClient::new()
            .fetch(&format!("{}/sds/64-19-7.pdf", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"%PDF-1.4 body");
    }

    #[tokio::test]
    async fn test_fetch_redirect_is_error_and_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old.pdf"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/landing"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>expired</html>"))
            .expect(0)
            .mount(&server)
            .await;

        let result = DocumentClient::new()
            .fetch(&format!("{}/old.pdf", server.uri()))
            .await;
        assert!(
            matches!(result, Err(DownloadError::Redirected { ref location, .. }) if location == "/landing"),
            "unexpected: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = DocumentClient::new()
            .fetch(&format!("{}/missing.pdf", server.uri()))
            .await;
        assert!(matches!(
            result,
            Err(DownloadError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let result = DocumentClient::with_timeout(Duration::from_millis(200))
            .fetch(&format!("{}/slow.pdf", server.uri()))
            .await;
        assert!(
            matches!(result, Err(DownloadError::Timeout { .. })),
            "unexpected: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let result = DocumentClient::new().fetch("not a url").await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }
}
