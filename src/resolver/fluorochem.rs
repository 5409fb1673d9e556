//! Fluorochem resolver.
//!
//! Fluorochem's product search returns an HTML fragment; the first product's
//! catalog code is read from its detail link. Sheets themselves are served by
//! the cheminfo web service, keyed by that catalog code.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{RedirectRule, open_session, read_text, send};
use super::markup::find_first;
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "fluorochem";
const SOURCE_LABEL: &str = "Fluorochem";
const DEFAULT_BASE_URL: &str = "http://www.fluorochem.co.uk";
const DEFAULT_CHEMINFO_URL: &str = "https://www.cheminfo.org";
const TIMEOUT_SECS: u64 = 20;

/// Resolver for Fluorochem products, with sheets served via cheminfo.
#[derive(Debug, Clone)]
pub struct FluorochemResolver {
    base_url: String,
    cheminfo_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    lst_search_type: &'a str,
    txt_search_text: &'a str,
    show_prices: &'a str,
    show_structures: &'a str,
    group_filters: Vec<String>,
}

impl FluorochemResolver {
    /// Creates a resolver against the public sites.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_BASE_URL, DEFAULT_CHEMINFO_URL)
    }

    /// Creates a resolver against custom search and cheminfo base URLs.
    #[must_use]
    pub fn with_base_urls(base_url: impl Into<String>, cheminfo_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cheminfo_url: cheminfo_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(TIMEOUT_SECS),
        }
    }

    async fn lookup(&self, cas: &CasNumber) -> Result<Option<SdsLink>, ResolveError> {
        let client = open_session(PROVIDER, self.timeout, RedirectRule::Follow)?;
        let search_url = format!("{}/Products/Search", self.base_url);
        debug!(url = %search_url, "Searching Fluorochem");

        let body = SearchRequest {
            lst_search_type: "C",
            txt_search_text: cas.as_str(),
            show_prices: "false",
            show_structures: "false",
            group_filters: Vec::new(),
        };
        // Any status is read; a page without a product row is simply no match.
        let response = send(PROVIDER, client.post(&search_url).json(&body)).await?;
        debug!(status = %response.status(), "Fluorochem search answered");
        let html = read_text(PROVIDER, response).await?;

        let Some(catalog_code) = extract_catalog_code(&html)? else {
            return Ok(None);
        };
        Ok(Some(SdsLink::new(
            SOURCE_LABEL,
            sheet_url(&self.cheminfo_url, &catalog_code),
        )))
    }
}

impl Default for FluorochemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for FluorochemResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "fluorochem", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

/// Catalog code of the first product, or `None` when the result table is empty.
fn extract_catalog_code(html: &str) -> Result<Option<String>, ResolveError> {
    if find_first(html, |el| el.name() == "td").is_none() {
        return Ok(None);
    }
    find_first(html, |el| el.has_classes("textLink prodDetailLink"))
        .and_then(|link| link.attr("prodcode").map(str::trim).map(str::to_string))
        .filter(|code| !code.is_empty())
        .map(Some)
        .ok_or_else(|| ResolveError::missing_markup(PROVIDER, "product detail link"))
}

fn sheet_url(cheminfo_url: &str, catalog_code: &str) -> String {
    format!(
        "{cheminfo_url}/webservices/msds?brand=fluorochem&catalog={}&embed=true",
        urlencoding::encode(catalog_code)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_shape() {
        let body = SearchRequest {
            lst_search_type: "C",
            txt_search_text: "64-19-7",
            show_prices: "false",
            show_structures: "false",
            group_filters: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "lstSearchType": "C",
                "txtSearchText": "64-19-7",
                "showPrices": "false",
                "showStructures": "false",
                "groupFilters": []
            })
        );
    }

    #[test]
    fn test_extract_catalog_code_first_product() {
        let html = r#"
            <table><tr>
              <td><span class="textLink prodDetailLink" prodcode="F093425">Acetic acid</span></td>
              <td><span class="textLink prodDetailLink" prodcode="F000002">Other</span></td>
            </tr></table>
        "#;
        assert_eq!(
            extract_catalog_code(html).unwrap(),
            Some("F093425".to_string())
        );
    }

    #[test]
    fn test_extract_catalog_code_empty_table_is_no_match() {
        assert_eq!(
            extract_catalog_code("<table></table><p>No products</p>").unwrap(),
            None
        );
    }

    #[test]
    fn test_extract_catalog_code_missing_link_is_error() {
        assert!(extract_catalog_code("<table><tr><td>row</td></tr></table>").is_err());
    }

    #[test]
    fn test_sheet_url_format() {
        assert_eq!(
            sheet_url(DEFAULT_CHEMINFO_URL, "F093425"),
            "https://www.cheminfo.org/webservices/msds?brand=fluorochem&catalog=F093425&embed=true"
        );
    }
}
