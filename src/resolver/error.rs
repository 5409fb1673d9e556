//! Error types for provider lookups.
//!
//! These errors never escape an [`SdsResolver`](super::SdsResolver): they are
//! reported through diagnostics and then collapsed to "no match". They exist
//! so that adapters can use `?` internally and so verbose runs can say *why*
//! a provider came up empty.

use thiserror::Error;

/// Errors that can occur while a single provider looks up a CAS number.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Transport-level failure (DNS, connect, TLS, timeout, body read).
    #[error("{provider}: network error: {source}")]
    Network {
        /// Provider that issued the request.
        provider: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with a non-success status.
    #[error("{provider}: HTTP {status}")]
    HttpStatus {
        /// Provider that issued the request.
        provider: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provider redirected where it never redirects on success.
    #[error("{provider}: unexpected redirect to {location}")]
    Redirected {
        /// Provider that issued the request.
        provider: String,
        /// The `Location` header, or `<unknown>`.
        location: String,
    },

    /// The response lacked the markup or field the adapter relies on.
    #[error("{provider}: expected {what} not found in response")]
    MissingMarkup {
        /// Provider that issued the request.
        provider: String,
        /// What was looked for.
        what: String,
    },

    /// The provider's confirmation field named a different CAS number.
    #[error("{provider}: identifier mismatch (expected {expected}, got {found})")]
    IdentifierMismatch {
        /// Provider that issued the request.
        provider: String,
        /// The CAS number that was queried.
        expected: String,
        /// The CAS number the provider returned.
        found: String,
    },

    /// A JSON payload could not be decoded or had the wrong shape.
    #[error("{provider}: invalid payload: {reason}")]
    InvalidPayload {
        /// Provider that issued the request.
        provider: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The per-call HTTP session could not be constructed.
    #[error("{provider}: HTTP client construction failed: {source}")]
    ClientBuild {
        /// Provider whose session failed to build.
        provider: String,
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl ResolveError {
    /// Creates a `Network` error.
    #[must_use]
    pub fn network(provider: &str, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.to_string(),
            source,
        }
    }

    /// Creates an `HttpStatus` error.
    #[must_use]
    pub fn http_status(provider: &str, status: u16) -> Self {
        Self::HttpStatus {
            provider: provider.to_string(),
            status,
        }
    }

    /// Creates a `Redirected` error.
    #[must_use]
    pub fn redirected(provider: &str, location: Option<&str>) -> Self {
        Self::Redirected {
            provider: provider.to_string(),
            location: location.unwrap_or("<unknown>").to_string(),
        }
    }

    /// Creates a `MissingMarkup` error.
    #[must_use]
    pub fn missing_markup(provider: &str, what: &str) -> Self {
        Self::MissingMarkup {
            provider: provider.to_string(),
            what: what.to_string(),
        }
    }

    /// Creates an `IdentifierMismatch` error.
    #[must_use]
    pub fn identifier_mismatch(provider: &str, expected: &str, found: &str) -> Self {
        Self::IdentifierMismatch {
            provider: provider.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an `InvalidPayload` error.
    #[must_use]
    pub fn invalid_payload(provider: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(provider: &str, source: reqwest::Error) -> Self {
        Self::ClientBuild {
            provider: provider.to_string(),
            source,
        }
    }
}
