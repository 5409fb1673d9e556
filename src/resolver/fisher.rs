//! Fisher Scientific resolver.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{RedirectRule, ensure_direct_success, open_session, read_text, send};
use super::markup::find_first;
use super::utils::absolutize_url;
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "fisher";
const SOURCE_LABEL: &str = "Fisher";
const DEFAULT_BASE_URL: &str = "https://www.fishersci.com";
const TIMEOUT_SECS: u64 = 10;
const NO_RESULTS_CLASSES: &str = "errormessage search_results_error_message";

/// Resolver for the Fisher Scientific SDS search.
#[derive(Debug, Clone)]
pub struct FisherResolver {
    base_url: String,
    timeout: Duration,
}

impl FisherResolver {
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
        let search_url = format!("{}/us/en/catalog/search/sds", self.base_url);
        debug!(url = %search_url, "Searching Fisher");

        let request = client
            .get(&search_url)
            .query(&[("selectLang", "EN"), ("msdsKeyword", cas.as_str())]);
        let response = send(PROVIDER, request).await?;
        ensure_direct_success(PROVIDER, &response)?;
        let html = read_text(PROVIDER, response).await?;

        extract_link(&html, &self.base_url)
    }
}

impl Default for FisherResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for FisherResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "fisher", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

fn extract_link(html: &str, base_url: &str) -> Result<Option<SdsLink>, ResolveError> {
    if find_first(html, |el| el.has_classes(NO_RESULTS_CLASSES)).is_some() {
        return Ok(None);
    }
    let Some(items) = find_first(html, |el| el.has_classes("catlog_items")) else {
        return Ok(None);
    };

    let href = items
        .find(|el| el.name() == "a")
        .and_then(|anchor| anchor.attr("href").map(str::to_string))
        .filter(|href| !href.is_empty())
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "catalog item link"))?;
    let url = absolutize_url(&href, base_url)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "absolute SDS URL"))?;

    Ok(Some(SdsLink::new(SOURCE_LABEL, url)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_link_first_catalog_item() {
        let html = r#"
            <div class="catlog_items">
              <a href="/store/msds?partNumber=AC124010010&productDescription=ACETIC+ACID">Acetic acid</a>
              <a href="/store/msds?partNumber=OTHER">Other</a>
            </div>
            <div class="catlog_items"><a href="/third">Third</a></div>
        "#;
        let link = extract_link(html, DEFAULT_BASE_URL).unwrap().unwrap();
        assert_eq!(link.source, "Fisher");
        assert_eq!(
            link.url,
            "https://www.fishersci.com/store/msds?partNumber=AC124010010&productDescription=ACETIC+ACID"
        );
    }

    #[test]
    fn test_extract_link_error_banner_is_no_match() {
        let html = r#"
            <div class="errormessage search_results_error_message">No results</div>
            <div class="catlog_items"><a href="/ignored">x</a></div>
        "#;
        assert!(extract_link(html, DEFAULT_BASE_URL).unwrap().is_none());
    }

    #[test]
    fn test_extract_link_partial_error_class_does_not_count() {
        let html = r#"
            <div class="errormessage">Unrelated</div>
            <div class="catlog_items"><a href="/sds">x</a></div>
        "#;
        assert!(extract_link(html, DEFAULT_BASE_URL).unwrap().is_some());
    }

    #[test]
    fn test_extract_link_no_items_is_no_match() {
        assert!(
            extract_link("<html><body></body></html>", DEFAULT_BASE_URL)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_extract_link_items_without_anchor_is_error() {
        let html = r#"<div class="catlog_items"><span>empty</span></div>"#;
        assert!(extract_link(html, DEFAULT_BASE_URL).is_err());
    }

    #[test]
    fn test_extract_link_skips_commented_out_items() {
        let html = r#"
            <!-- <div class="catlog_items"><a href="/retired/sds">old</a></div> -->
            <div class="catlog_items"><a href="/store/msds?partNumber=REAL">Acetic acid</a></div>
        "#;
        let link = extract_link(html, DEFAULT_BASE_URL).unwrap().unwrap();
        assert_eq!(link.url, "https://www.fishersci.com/store/msds?partNumber=REAL");
    }

    #[test]
    fn test_extract_link_commented_out_banner_does_not_count() {
        let html = r#"
            <!-- <div class="errormessage search_results_error_message">No results</div> -->
            <div class="catlog_items"><a href="/sds">x</a></div>
        "#;
        assert!(extract_link(html, DEFAULT_BASE_URL).unwrap().is_some());
    }
}
