//! ChemicalSafety resolver.
//!
//! Three chained JSON calls against the `retriever.php` endpoint:
//! `search` finds an MSDS id by CAS number, `msdsdetail` confirms the id and
//! CAS number and yields a file reference, `getpdfurl` turns that reference
//! into a downloadable URL. Rows are positional arrays.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cas::CasNumber;

use super::http_client::{
    RedirectRule, ensure_direct_success, open_session, read_json, send,
};
use super::{ResolveContext, ResolveError, SdsLink, SdsResolver, settle};

const PROVIDER: &str = "chemicalsafety";
const SOURCE_LABEL: &str = "ChemicalSafety";
const DEFAULT_BASE_URL: &str = "https://chemicalsafety.com";
const HOST_NAME: &str = "chemicalsafety.com";
const TIMEOUT_SECS: u64 = 20;

const COL_ID: usize = 0;
const COL_CAS: usize = 3;
const COL_FILE: usize = 10;

/// Resolver for the ChemicalSafety SDS retriever API.
#[derive(Debug, Clone)]
pub struct ChemicalSafetyResolver {
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieverRequest<'a> {
    action: &'a str,
    p1: Value,
    p2: &'a str,
    p3: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    host_name: Option<&'a str>,
    is_contains: &'a str,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct PdfUrlResponse {
    url: Option<String>,
}

impl ChemicalSafetyResolver {
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
        let endpoint = format!("{}/sds1/retriever.php", self.base_url);

        let search = RetrieverRequest {
            action: "search",
            p1: Value::from("MSMSDS.COMMON|"),
            p2: "MSMSDS.MANUFACT|",
            p3: format!("MSCHEM.CAS|{cas}"),
            host_name: Some(HOST_NAME),
            is_contains: "0",
        };
        let rows: RowsResponse = self.call(&client, &endpoint, &search).await?;
        let Some(msds_id) = find_msds_id(&rows.rows, cas) else {
            return Ok(None);
        };
        debug!(msds_id = %msds_id, "ChemicalSafety search hit");

        let detail = RetrieverRequest {
            action: "msdsdetail",
            p1: msds_id.clone(),
            p2: "",
            p3: String::new(),
            host_name: None,
            is_contains: "",
        };
        let rows: RowsResponse = self.call(&client, &endpoint, &detail).await?;
        let file_ref = confirm_detail(&rows.rows, &msds_id, cas)?;

        let pdf = RetrieverRequest {
            action: "getpdfurl",
            p1: Value::from(file_ref),
            p2: "",
            p3: String::new(),
            host_name: None,
            is_contains: "",
        };
        let response: PdfUrlResponse = self.call(&client, &endpoint, &pdf).await?;
        let url = response
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ResolveError::invalid_payload(PROVIDER, "getpdfurl returned no url"))?;

        Ok(Some(SdsLink::new(SOURCE_LABEL, url)))
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        body: &RetrieverRequest<'_>,
    ) -> Result<T, ResolveError> {
        debug!(action = body.action, "Calling ChemicalSafety retriever");
        let response = send(PROVIDER, client.post(endpoint).json(body)).await?;
        ensure_direct_success(PROVIDER, &response)?;
        read_json(PROVIDER, response).await
    }
}

impl Default for ChemicalSafetyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SdsResolver for ChemicalSafetyResolver {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[tracing::instrument(skip(self, cas, ctx), fields(resolver = "chemicalsafety", cas = %cas))]
    async fn resolve(&self, cas: &CasNumber, ctx: &ResolveContext) -> Option<SdsLink> {
        settle(PROVIDER, cas, ctx, self.lookup(cas).await)
    }
}

/// Id of the first search row whose CAS column equals `cas`.
fn find_msds_id(rows: &[Vec<Value>], cas: &CasNumber) -> Option<Value> {
    rows.iter()
        .find(|row| row.get(COL_CAS).and_then(Value::as_str) == Some(cas.as_str()))
        .and_then(|row| row.get(COL_ID).cloned())
}

/// Checks that the first detail row names the same id and CAS number, and
/// returns its file reference with trailing commas removed.
fn confirm_detail(
    rows: &[Vec<Value>],
    msds_id: &Value,
    cas: &CasNumber,
) -> Result<String, ResolveError> {
    let row = rows
        .first()
        .ok_or_else(|| ResolveError::invalid_payload(PROVIDER, "msdsdetail returned no rows"))?;

    let row_id = row.get(COL_ID).unwrap_or(&Value::Null);
    if row_id != msds_id {
        return Err(ResolveError::identifier_mismatch(
            PROVIDER,
            &msds_id.to_string(),
            &row_id.to_string(),
        ));
    }
    let row_cas = row.get(COL_CAS).and_then(Value::as_str).unwrap_or_default();
    if row_cas != cas.as_str() {
        return Err(ResolveError::identifier_mismatch(
            PROVIDER,
            cas.as_str(),
            row_cas,
        ));
    }

    row.get(COL_FILE)
        .and_then(Value::as_str)
        .map(|file| file.trim_end_matches(',').to_string())
        .filter(|file| !file.is_empty())
        .ok_or_else(|| ResolveError::invalid_payload(PROVIDER, "msdsdetail row has no file reference"))
}
