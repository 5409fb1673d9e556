use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cas::CasNumber;
use crate::download::DocumentClient;
use crate::resolver::{ResolveContext, ResolverChain};
use crate::store::ArtifactStore;

/// Result of processing one CAS number.
///
/// `persisted` is true when a sheet is on disk after the task, whether it was
/// fetched now or already there. `source` is only set for a fresh fetch; a
/// sheet found on disk has no recorded provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// The CAS number processed.
    pub cas: CasNumber,
    /// Whether a sheet is stored for `cas`.
    pub persisted: bool,
    /// Provider label when the sheet was fetched in this run.
    pub source: Option<String>,
}

impl FetchOutcome {
    /// Nothing stored for `cas`.
    #[must_use]
    pub fn missing(cas: CasNumber) -> Self {
        Self {
            cas,
            persisted: false,
            source: None,
        }
    }

    /// The sheet was already on disk; nothing was fetched.
    #[must_use]
    pub fn already_present(cas: CasNumber) -> Self {
        Self {
            cas,
            persisted: true,
            source: None,
        }
    }

    /// The sheet was fetched from `source` and written.
    #[must_use]
    pub fn fetched(cas: CasNumber, source: impl Into<String>) -> Self {
        Self {
            cas,
            persisted: true,
            source: Some(source.into()),
        }
    }
}

/// Resolve-fetch-persist pipeline for one CAS number.
///
/// Shared read-only across all tasks of a batch; each `run` owns its own
/// provider sessions and document transfer.
#[derive(Debug)]
pub struct FetchTask {
    store: ArtifactStore,
    chain: Arc<ResolverChain>,
    client: DocumentClient,
    ctx: ResolveContext,
}

impl FetchTask {
    /// Creates a task pipeline over the given store, chain and client.
    #[must_use]
    pub fn new(
        store: ArtifactStore,
        chain: Arc<ResolverChain>,
        client: DocumentClient,
        ctx: ResolveContext,
    ) -> Self {
        Self {
            store,
            chain,
            client,
            ctx,
        }
    }

    /// The artifact store this task writes to.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Processes `cas` to completion. Never fails: every error path yields a
    /// missing outcome.
    #[instrument(skip(self, cas), fields(cas = %cas))]
    pub async fn run(&self, cas: CasNumber) -> FetchOutcome {
        if self.store.exists(&cas) {
            debug!(path = %self.store.path_for(&cas).display(), "sheet already on disk");
            return FetchOutcome::already_present(cas);
        }

        info!("Searching for {} ...", self.store.file_name(&cas));

        let Some(link) = self.chain.resolve(&cas, &self.ctx).await else {
            debug!("no provider matched");
            return FetchOutcome::missing(cas);
        };

        let bytes = match self.client.fetch(&link.url).await {
            Ok(bytes) => bytes,
            Err(error) => {
                self.ctx
                    .diagnostics
                    .report_transfer(&cas, &link.url, &error);
                return FetchOutcome::missing(cas);
            }
        };

        match self.store.write(&cas, bytes).await {
            Ok(path) => {
                info!(source = %link.source, path = %path.display(), "sheet saved");
                FetchOutcome::fetched(cas, link.source)
            }
            Err(error) => {
                warn!(error = %error, "failed to save sheet");
                FetchOutcome::missing(cas)
            }
        }
    }

    /// Like [`run`](Self::run), but gives up as soon as `token` is cancelled.
    ///
    /// Abandoning the pipeline drops any in-flight provider or document
    /// request along with its connection.
    pub async fn run_cancellable(&self, cas: CasNumber, token: &CancellationToken) -> FetchOutcome {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                debug!(cas = %cas, "fetch cancelled");
                FetchOutcome::missing(cas)
            }
            outcome = self.run(cas.clone()) => outcome,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::resolver::{SdsLink, SdsResolver};

    struct FixedResolver {
        url: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SdsResolver for FixedResolver {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn resolve(&self, _cas: &CasNumber, _ctx: &ResolveContext) -> Option<SdsLink> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.url.clone().map(|url| SdsLink::new("Fixed", url))
        }
    }

    fn task_with(dir: &TempDir, url: Option<String>) -> (FetchTask, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = ResolverChain::new();
        chain.register(Box::new(FixedResolver {
            url,
            calls: Arc::clone(&calls),
        }));
        let task = FetchTask::new(
            ArtifactStore::new(dir.path()),
            Arc::new(chain),
            DocumentClient::new(),
            ResolveContext::default(),
        );
        (task, calls)
    }

    fn cas(value: &str) -> CasNumber {
        CasNumber::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_existing_file_short_circuits_resolution() {
        let dir = TempDir::new().unwrap();
        let (task, calls) = task_with(&dir, Some("http://127.0.0.1:9/never".to_string()));
        std::fs::write(dir.path().join("64-19-7-SDS.pdf"), b"cached").unwrap();

        let outcome = task.run(cas("64-19-7")).await;
        assert_eq!(outcome, FetchOutcome::already_present(cas("64-19-7")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_match_is_missing_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let (task, calls) = task_with(&dir, None);

        let outcome = task.run(cas("00000-0-0")).await;
        assert_eq!(outcome, FetchOutcome::missing(cas("00000-0-0")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!task.store().exists(&cas("00000-0-0")));
    }

    #[tokio::test]
    async fn test_resolved_document_is_saved_with_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let (task, _) = task_with(&dir, Some(format!("{}/sheet.pdf", server.uri())));

        let outcome = task.run(cas("141-78-6")).await;
        assert_eq!(outcome, FetchOutcome::fetched(cas("141-78-6"), "Fixed"));
        assert_eq!(
            std::fs::read(dir.path().join("141-78-6-SDS.pdf")).unwrap(),
            b"%PDF"
        );
    }

    #[tokio::test]
    async fn test_redirected_document_is_not_saved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sheet.pdf"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/expired"))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let (task, _) = task_with(&dir, Some(format!("{}/sheet.pdf", server.uri())));

        let outcome = task.run(cas("141-78-6")).await;
        assert_eq!(outcome, FetchOutcome::missing(cas("141-78-6")));
        assert!(!dir.path().join("141-78-6-SDS.pdf").exists());
    }

    #[tokio::test]
    async fn test_cancelled_token_yields_missing_without_lookup() {
        let dir = TempDir::new().unwrap();
        let (task, calls) = task_with(&dir, None);
        let token = CancellationToken::new();
        token.cancel();

        let outcome = task.run_cancellable(cas("64-19-7"), &token).await;
        assert_eq!(outcome, FetchOutcome::missing(cas("64-19-7")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
