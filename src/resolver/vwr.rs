//! VWR resolver.
//!
//! VWR's SDS search returns an HTML result table. A result-count banner is
//! checked first, then the first row's `SDS` cell link and `Manufacturer` cell
//! text are read. The manufacturer becomes the source label.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{RedirectRule, ensure_direct_success, open_session, read_text, send};
use super::markup::{Element, find_all, find_first};
use super::utils::{absolutize_url, compile_static_regex, first_capture};
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "vwr";
const DEFAULT_BASE_URL: &str = "https://us.vwr.com";
const TIMEOUT_SECS: u64 = 10;

static RESULT_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)(\d+).*results were found"));

/// Resolver for the VWR SDS search.
#[derive(Debug, Clone)]
pub struct VwrResolver {
    base_url: String,
    timeout: Duration,
}

impl VwrResolver {
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
        let search_url = format!("{}/store/msds", self.base_url);
        debug!(url = %search_url, "Searching VWR");

        let request = client
            .get(&search_url)
            .query(&[("keyword", cas.as_str())]);
        let response = send(PROVIDER, request).await?;
        ensure_direct_success(PROVIDER, &response)?;
        let html = read_text(PROVIDER, response).await?;

        extract_link(&html, &self.base_url)
    }
}

impl Default for VwrResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for VwrResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "vwr", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

fn extract_link(html: &str, base_url: &str) -> Result<Option<SdsLink>, ResolveError> {
    let banner = result_banner(html)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "result count banner"))?;
    let count: u64 = first_capture(&banner, &RESULT_COUNT_RE)
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "result count"))?;
    if count == 0 {
        return Ok(None);
    }

    let href = find_first(html, |el| is_data_cell(el, "SDS"))
        .and_then(|cell| cell.find(|el| el.name() == "a" && el.attr("href").is_some()))
        .and_then(|anchor| anchor.attr("href").map(str::to_string))
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "SDS link cell"))?;
    let manufacturer = find_first(html, |el| is_data_cell(el, "Manufacturer"))
        .map(|cell| cell.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "manufacturer cell"))?;
    let url = absolutize_url(&href, base_url)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "absolute SDS URL"))?;

    Ok(Some(SdsLink::new(manufacturer, url)))
}

/// Text of the first `.pull-left` nested in a `.clearfix` container.
fn result_banner(html: &str) -> Option<String> {
    find_all(html, |el| el.has_classes("clearfix"))
        .iter()
        .find_map(|container| container.find(|el| el.has_classes("pull-left")))
        .map(|el| el.text())
}

fn is_data_cell(el: &Element<'_>, title: &str) -> bool {
    el.name() == "td" && el.attr("data-title") == Some(title)
}
