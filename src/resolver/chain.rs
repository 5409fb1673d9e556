//! Ordered resolver chain with first-match-wins evaluation.
//!
//! The [`ResolverChain`] holds provider adapters in registration order and
//! tries them one at a time for a CAS number. The first adapter to return a
//! link wins; later adapters are never called. An adapter that panics is
//! treated exactly like one that found nothing.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tracing::{debug, info, warn};

use crate::cas::CasNumber;

use super::{ResolveContext, SdsLink, SdsResolver};

/// A fixed-order collection of resolvers.
///
/// Order is precedence: register the most trusted provider first. Nothing is
/// retried; an adapter that returns `None` is skipped for the rest of the
/// lookup.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn SdsResolver>>,
}

impl ResolverChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Appends a resolver at the lowest precedence.
    #[tracing::instrument(skip(self, resolver), fields(resolver_name))]
    pub fn register(&mut self, resolver: Box<dyn SdsResolver>) {
        tracing::Span::current().record("resolver_name", resolver.name());
        debug!(
            name = resolver.name(),
            position = self.resolvers.len(),
            "Registering resolver"
        );
        self.resolvers.push(resolver);
    }

    /// Returns the number of registered resolvers.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Returns true if no resolvers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolver names in precedence order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Tries each resolver in order and returns the first link found.
    ///
    /// Returns `None` when every resolver came up empty (or the chain is empty).
    #[tracing::instrument(skip(self, cas, ctx), fields(cas = %cas))]
    pub async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        for resolver in &self.resolvers {
            debug!(resolver = resolver.name(), "Trying resolver");

            let attempt = AssertUnwindSafe(resolver.resolve(cas, ctx))
                .catch_unwind()
                .await;

            match attempt {
                Ok(Some(link)) => {
                    info!(
                        resolver = resolver.name(),
                        source = %link.source,
                        url = %link.url,
                        "Resolution successful"
                    );
                    return Some(link);
                }
                Ok(None) => {
                    debug!(resolver = resolver.name(), "Resolver had no match, trying next");
                }
                Err(_) => {
                    warn!(resolver = resolver.name(), "Resolver panicked, trying next");
                }
            }
        }

        debug!(tried = self.resolvers.len(), "No resolver matched");
        None
    }
}

impl std::fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverChain")
            .field("resolver_count", &self.resolvers.len())
            .field("resolvers", &self.names())
            .finish()
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new()
    }
}
