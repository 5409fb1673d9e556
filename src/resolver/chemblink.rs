//! ChemBlink resolver.
//!
//! ChemBlink serves one static page per CAS number listing mirrored sheets.
//! The first "View / download" link is taken; its file name carries the
//! original supplier (`64-19-7_Alfa-Aesar.pdf` → `Alfa-Aesar`). The URL
//! itself embeds the queried CAS number, so no separate cross-check is done.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{RedirectRule, ensure_direct_success, open_session, read_text, send};
use super::markup::find_first;
use super::utils::{absolutize_url, compile_static_regex, first_capture};
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "chemblink";
const DEFAULT_BASE_URL: &str = "https://www.chemblink.com";
const TIMEOUT_SECS: u64 = 20;
const DOWNLOAD_LINK_TEXT: &str = "View / download";

static SOURCE_IN_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\S+_(\S*)\.pdf"));

/// Resolver for `chemblink.com` MSDS pages.
#[derive(Debug, Clone)]
pub struct ChemBlinkResolver {
    base_url: String,
    timeout: Duration,
}

impl ChemBlinkResolver {
    /// Creates a resolver against the public site.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a resolver against a custom base URL (used by integration tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(TIMEOUT_SECS),
        }
    }

    async fn lookup(&self, cas: &CasNumber) -> Result<Option<SdsLink>, ResolveError> {
        let client = open_session(PROVIDER, self.timeout, RedirectRule::Reject)?;
        let page_url = format!("{}/MSDS/{cas}_MSDS.htm", self.base_url);
        debug!(url = %page_url, "Fetching ChemBlink MSDS page");

        let response = send(PROVIDER, client.get(&page_url)).await?;
        ensure_direct_success(PROVIDER, &response)?;
        let html = read_text(PROVIDER, response).await?;

        extract_link(&html, &self.base_url)
    }
}

impl Default for ChemBlinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for ChemBlinkResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "chemblink", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

fn extract_link(html: &str, base_url: &str) -> Result<Option<SdsLink>, ResolveError> {
    let Some(anchor) =
        find_first(html, |el| el.name() == "a" && el.text().contains(DOWNLOAD_LINK_TEXT))
    else {
        return Ok(None);
    };

    let href = anchor
        .attr("href")
        .filter(|href| !href.is_empty())
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "download link href"))?;
    let source = first_capture(href, &SOURCE_IN_HREF_RE)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "supplier name in link"))?;
    let url = absolutize_url(href, base_url)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "absolute download URL"))?;

    Ok(Some(SdsLink::new(source, url)))
}
