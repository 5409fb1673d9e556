//! Shared User-Agent string for provider and document HTTP clients.
//!
//! Several providers serve a stripped or blocked page to non-browser clients,
//! so every request presents the same desktop browser identity.

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// User-Agent for both provider lookups and document transfers.
#[must_use]
pub(crate) fn browser_user_agent() -> &'static str {
    BROWSER_UA
}
