//! Shared HTTP session policy for provider adapters.
//!
//! Every provider call opens its own session: a fresh client with its own
//! cookie jar, built here so adapters stay consistent on timeouts,
//! user-agent, compression and redirect handling. The session is dropped when
//! the adapter's lookup returns, on success and failure alike.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::user_agent;

use super::ResolveError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_FOLLOWED_REDIRECTS: usize = 10;

/// How a provider session treats HTTP redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RedirectRule {
    /// The provider never redirects on success; a 3xx is a failure.
    Reject,
    /// Redirects are followed transparently.
    Follow,
}

/// Opens a new provider session.
///
/// # Errors
///
/// Returns [`ResolveError::ClientBuild`] when the client cannot be built.
pub(crate) fn open_session(
    provider: &str,
    timeout: Duration,
    redirects: RedirectRule,
) -> Result<Client, ResolveError> {
    let policy = match redirects {
        RedirectRule::Reject => Policy::none(),
        RedirectRule::Follow => Policy::limited(MAX_FOLLOWED_REDIRECTS),
    };
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
        .timeout(timeout)
        .user_agent(user_agent::browser_user_agent())
        .gzip(true)
        .cookie_provider(Arc::new(Jar::default()))
        .redirect(policy)
        .build()
        .map_err(|error| ResolveError::client_build(provider, error))
}

/// Sends a request, mapping transport failures to [`ResolveError::Network`].
pub(crate) async fn send(provider: &str, request: RequestBuilder) -> Result<Response, ResolveError> {
    request
        .send()
        .await
        .map_err(|error| ResolveError::network(provider, error))
}

/// Requires a success status with no redirect.
///
/// Sessions opened with [`RedirectRule::Reject`] surface redirects as 3xx
/// responses, which this maps to [`ResolveError::Redirected`].
pub(crate) fn ensure_direct_success(provider: &str, response: &Response) -> Result<(), ResolveError> {
    let status = response.status();
    if status.is_redirection() {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok());
        return Err(ResolveError::redirected(provider, location));
    }
    if !status.is_success() {
        return Err(ResolveError::http_status(provider, status.as_u16()));
    }
    Ok(())
}

/// Reads a response body as text.
pub(crate) async fn read_text(provider: &str, response: Response) -> Result<String, ResolveError> {
    response
        .text()
        .await
        .map_err(|error| ResolveError::network(provider, error))
}

/// Reads a response body and decodes it as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, ResolveError> {
    let body = read_text(provider, response).await?;
    serde_json::from_str(&body)
        .map_err(|error| ResolveError::invalid_payload(provider, error.to_string()))
}
