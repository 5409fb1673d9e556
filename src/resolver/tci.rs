//! TCI Chemicals resolver.
//!
//! TCI needs two requests in one cookie session:
//!
//! 1. A product search page, which carries the CSRF token, the site's context
//!    path, the product facet count and the first hit's product code. The hit's
//!    `data-casno` must equal the queried CAS number exactly.
//! 2. A form POST for that product code, whose `Content-Disposition` header
//!    names the SDS file. The sheet URL is built from the context path and
//!    that file name.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{RedirectRule, ensure_direct_success, open_session, read_text, send};
use super::markup::find_first;
use super::utils::{compile_static_regex, first_capture};
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "tci";
const SOURCE_LABEL: &str = "TCI";
const DEFAULT_BASE_URL: &str = "https://www.tcichemicals.com";
const SEARCH_TIMEOUT_SECS: u64 = 10;
const DOCUMENT_TIMEOUT_SECS: u64 = 15;
const PRODUCTS_FACET: &str = "Products";

static CONTEXT_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"encodedContextPath[^;]+?'(\S+)';"));
static FACET_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\((\d+)\)"));
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#)
});

/// Resolver for TCI Chemicals (US site).
#[derive(Debug, Clone)]
pub struct TciResolver {
    base_url: String,
    search_timeout: Duration,
    document_timeout: Duration,
}

/// What the search page yields for a confirmed hit.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    csrf_token: String,
    context_path: String,
    product_code: String,
}

impl TciResolver {
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
            search_timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS),
            document_timeout: Duration::from_secs(DOCUMENT_TIMEOUT_SECS),
        }
    }

    async fn lookup(&self, cas: &CasNumber) -> Result<Option<SdsLink>, ResolveError> {
        // Session timeout covers the slower document step; the search step
        // gets its own per-request limit.
        let client = open_session(PROVIDER, self.document_timeout, RedirectRule::Reject)?;

        let search_url = format!("{}/US/en/search/", self.base_url);
        debug!(url = %search_url, "Searching TCI");
        let request = client
            .get(&search_url)
            .query(&[("text", cas.as_str()), ("resulttype", "product")])
            .timeout(self.search_timeout);
        let response = send(PROVIDER, request).await?;
        ensure_direct_success(PROVIDER, &response)?;
        let html = read_text(PROVIDER, response).await?;

        let Some(hit) = parse_search_page(&html, cas)? else {
            return Ok(None);
        };
        debug!(product_code = %hit.product_code, "TCI product confirmed");

        let document_url = format!("{}/US/en/documentSearch/productSDSSearchDoc", self.base_url);
        let request = client.post(&document_url).form(&[
            ("productCode", hit.product_code.as_str()),
            ("langSelector", "en"),
            ("selectedCountry", "US"),
            ("CSRFToken", hit.csrf_token.as_str()),
        ]);
        let response = send(PROVIDER, request).await?;
        // A redirect here means the session or token was refused.
        ensure_direct_success(PROVIDER, &response)?;

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "Content-Disposition header"))?;
        let file_name = filename_from_disposition(disposition)
            .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "SDS file name"))?;

        let url = format!("{}{}/sds/{file_name}", self.base_url, hit.context_path);
        Ok(Some(SdsLink::new(SOURCE_LABEL, url)))
    }
}

impl Default for TciResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for TciResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "tci", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

fn parse_search_page(html: &str, cas: &CasNumber) -> Result<Option<SearchHit>, ResolveError> {
    let csrf_token = find_first(html, |el| {
        el.name() == "input" && el.attr("name") == Some("CSRFToken")
    })
    .and_then(|input| input.attr("value").map(str::to_string))
    .filter(|token| !token.is_empty())
    .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "CSRF token"))?;

    let context_path = first_capture(html, &CONTEXT_PATH_RE)
        .map(|raw| raw.replace('\\', ""))
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "encodedContextPath"))?;

    if product_hit_count(html)? == 0 {
        return Ok(None);
    }

    let first_product = find_first(html, |el| el.name() == "div" && el.has_classes("prductlist"))
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "product list entry"))?;
    let listed_cas = first_product.attr("data-casno").unwrap_or_default();
    if listed_cas != cas.as_str() {
        return Err(ResolveError::identifier_mismatch(
            PROVIDER,
            cas.as_str(),
            listed_cas,
        ));
    }
    let Some(product_code) = first_product
        .attr("data-id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
    else {
        return Ok(None);
    };

    Ok(Some(SearchHit {
        csrf_token,
        context_path,
        product_code: product_code.to_string(),
    }))
}

/// Number of hits under the "Products" facet; zero when the facet names
/// something else (the site falls back to other result types).
fn product_hit_count(html: &str) -> Result<u64, ResolveError> {
    let facet = find_first(html, |el| {
        el.name() == "div" && el.attr("id") == Some("contentSearchFacet")
    })
    .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "search facet"))?;
    let facet_text = facet
        .find(|el| el.name() == "span" && el.has_classes("facet__text"))
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "facet text"))?;

    let label = facet_text
        .find(|el| el.name() == "a")
        .map(|anchor| anchor.text().trim().to_string())
        .unwrap_or_default();
    if label != PRODUCTS_FACET {
        return Ok(0);
    }

    facet_text
        .find(|el| el.has_classes("facet__value__count"))
        .and_then(|count| first_capture(&count.text(), &FACET_COUNT_RE))
        .and_then(|count| count.parse().ok())
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "product facet count"))
}

fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = first_capture(header, &FILENAME_RE)?;
    let decoded = urlencoding::decode(&raw).map_or(raw.clone(), |name| name.into_owned());
    Some(decoded).filter(|name| !name.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn search_page(facet: &str, count: u32, casno: &str, id: &str) -> String {
        format!(
            r#"
            <script>
              ACC.config.encodedContextPath = '\/US\/en';
            </script>
            <form><input type="hidden" name="CSRFToken" value="tok-123"></form>
            <div id="contentSearchFacet">
              <span class="facet__text"><a href="?q=x">{facet}</a>&nbsp;<span class="facet__value__count">({count})</span></span>
            </div>
            <div class="prductlist" data-casno="{casno}" data-id="{id}"></div>
            <div class="prductlist" data-casno="999-99-9" data-id="Z9"></div>
            "#
        )
    }

    fn cas() -> CasNumber {
        CasNumber::new("885051-07-0").unwrap()
    }

    #[test]
    fn test_parse_search_page_confirmed_hit() {
        let html = search_page("Products", 1, "885051-07-0", "B3747");
        let hit = parse_search_page(&html, &cas()).unwrap().unwrap();
        assert_eq!(
            hit,
            SearchHit {
                csrf_token: "tok-123".to_string(),
                context_path: "/US/en".to_string(),
                product_code: "B3747".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_search_page_cas_mismatch_is_error() {
        let html = search_page("Products", 1, "885051-07-1", "B3747");
        assert!(matches!(
            parse_search_page(&html, &cas()),
            Err(ResolveError::IdentifierMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_search_page_zero_products_is_no_match() {
        let html = search_page("Products", 0, "885051-07-0", "B3747");
        assert!(parse_search_page(&html, &cas()).unwrap().is_none());
    }

    #[test]
    fn test_parse_search_page_other_facet_is_no_match() {
        let html = search_page("Documents", 4, "885051-07-0", "B3747");
        assert!(parse_search_page(&html, &cas()).unwrap().is_none());
    }

    #[test]
    fn test_parse_search_page_empty_product_id_is_no_match() {
        let html = search_page("Products", 1, "885051-07-0", "");
        assert!(parse_search_page(&html, &cas()).unwrap().is_none());
    }

    #[test]
    fn test_parse_search_page_missing_token_is_error() {
        let html = search_page("Products", 1, "885051-07-0", "B3747")
            .replace("CSRFToken", "OtherField");
        assert!(matches!(
            parse_search_page(&html, &cas()),
            Err(ResolveError::MissingMarkup { .. })
        ));
    }

    #[test]
    fn test_filename_from_disposition_variants() {
        assert_eq!(
            filename_from_disposition("attachment; filename=B3747_US_EN.pdf"),
            Some("B3747_US_EN.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="B3747_US_EN.pdf""#),
            Some("B3747_US_EN.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''B%203747.pdf"),
            Some("B 3747.pdf".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }
}
