//! SDS link resolution across independent providers.
//!
//! Each provider site speaks its own ad hoc protocol (HTML scraping, session +
//! token POSTs, chained JSON calls). This module wraps every provider behind a
//! single [`SdsResolver`] capability and evaluates them in a fixed priority
//! order through a [`ResolverChain`].
//!
//! # Architecture
//!
//! - [`SdsResolver`] - Async trait that individual provider adapters implement
//! - [`ResolverChain`] - Ordered fallback over resolvers, first match wins
//! - [`SdsLink`] - Provenance label plus download URL for a located sheet
//! - [`ResolveContext`] - Per-run settings handed to every resolver call
//! - [`ChemBlinkResolver`], [`VwrResolver`], [`FisherResolver`],
//!   [`TciResolver`], [`ChemicalSafetyResolver`], [`FluorochemResolver`]
//!
//! # Contract
//!
//! A resolver never returns an error to its caller. Transport failures,
//! unexpected status codes, redirects, missing markup and failed identifier
//! cross-checks are all mapped to `None`; the underlying [`ResolveError`] is
//! only handed to the injected [`Diagnostics`].
//!
//! # Example
//!
//! ```no_run
//! use find_sds_core::CasNumber;
//! use find_sds_core::resolver::{build_default_resolver_chain, ResolveContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = build_default_resolver_chain();
//! let ctx = ResolveContext::default();
//! let cas = CasNumber::new("64-19-7")?;
//! if let Some(link) = chain.resolve(&cas, &ctx).await {
//!     println!("{} -> {}", link.source, link.url);
//! }
//! # Ok(())
//! # }
//! ```

mod chain;
mod chemblink;
mod chemicalsafety;
mod error;
mod fisher;
mod fluorochem;
mod http_client;
mod markup;
mod tci;
mod utils;
mod vwr;

pub use chain::ResolverChain;
pub use chemblink::ChemBlinkResolver;
pub use chemicalsafety::ChemicalSafetyResolver;
pub use error::ResolveError;
pub use fisher::FisherResolver;
pub use fluorochem::FluorochemResolver;
pub use tci::TciResolver;
pub use vwr::VwrResolver;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cas::CasNumber;

/// Builds the default resolver chain in fixed provider precedence.
///
/// Providers differ in coverage and in how long their links stay valid, so the
/// order is configuration rather than something computed at runtime.
#[must_use]
pub fn build_default_resolver_chain() -> ResolverChain {
    let mut chain = ResolverChain::new();
    chain.register(Box::new(ChemBlinkResolver::new()));
    chain.register(Box::new(VwrResolver::new()));
    chain.register(Box::new(FisherResolver::new()));
    chain.register(Box::new(TciResolver::new()));
    chain.register(Box::new(ChemicalSafetyResolver::new()));
    chain.register(Box::new(FluorochemResolver::new()));
    chain
}

/// A located safety data sheet: where it came from and where to fetch it.
///
/// Both fields are always populated; "no match" is expressed as
/// `Option::<SdsLink>::None`, never as a half-filled link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdsLink {
    /// Human-readable provenance (e.g. `Fisher`, `Alfa-Aesar`).
    pub source: String,
    /// Absolute URL of the document.
    pub url: String,
}

impl SdsLink {
    /// Creates a link from a source label and URL.
    #[must_use]
    pub fn new(source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
        }
    }
}

/// Verbosity capability for provider failure detail.
///
/// Injected by the caller; nothing in the library reads a process-wide flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Surface swallowed provider errors at `warn` instead of `debug`.
    pub verbose: bool,
}

impl Diagnostics {
    /// Creates diagnostics with the given verbosity.
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Records a provider failure that is about to be mapped to "no match".
    pub fn report(&self, provider: &str, cas: &CasNumber, error: &ResolveError) {
        if self.verbose {
            warn!(provider, cas = %cas, error = %error, "provider lookup failed");
        } else {
            debug!(provider, cas = %cas, error = %error, "provider lookup failed");
        }
    }

    /// Records a failed transfer of an already resolved document.
    pub fn report_transfer(&self, cas: &CasNumber, url: &str, error: &dyn std::fmt::Display) {
        if self.verbose {
            warn!(cas = %cas, url, error = %error, "document transfer failed");
        } else {
            debug!(cas = %cas, url, error = %error, "document transfer failed");
        }
    }
}

/// Context passed to resolvers on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext {
    /// Where swallowed provider errors are reported.
    pub diagnostics: Diagnostics,
}

impl ResolveContext {
    /// Creates a context with the given diagnostics.
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }
}

/// Trait that every SDS provider adapter implements.
///
/// # Object Safety
///
/// Uses `async_trait` so adapters can be held as `Box<dyn SdsResolver>` in a
/// [`ResolverChain`].
#[async_trait]
pub trait SdsResolver: Send + Sync {
    /// Short provider name used in logs (e.g. "fisher").
    fn name(&self) -> &str;

    /// Looks up a download link for `cas`.
    ///
    /// Returns `None` when the provider has no match or failed in any way.
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink>;
}

/// Collapses a provider's internal lookup result into the public contract.
pub(crate) fn settle(
    provider: &str,
    cas: &CasNumber,
    ctx: &ResolveContext,
    result: Result<Option<SdsLink>, ResolveError>,
) -> Option<SdsLink> {
    match result {
        Ok(Some(link)) => {
            debug!(provider, cas = %cas, source = %link.source, url = %link.url, "provider matched");
            Some(link)
        }
        Ok(None) => {
            debug!(provider, cas = %cas, "provider has no match");
            None
        }
        Err(error) => {
            ctx.diagnostics.report(provider, cas, &error);
            None
        }
    }
}
