//! Run configuration for a fetch batch.
//!
//! All tunables travel in a [`FetchConfig`] value handed to the library by
//! the caller; nothing is read from process-wide state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cas::CasNumber;
use crate::download::{
    BatchRun, BatchScheduler, DEFAULT_CONCURRENCY, DOWNLOAD_TIMEOUT, DocumentClient, EngineError,
    FetchTask,
};
use crate::resolver::{Diagnostics, ResolveContext, ResolverChain};
use crate::store::{ArtifactStore, DEFAULT_EXTENSION};

/// Tunables for one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Number of CAS numbers processed at once (1-100).
    pub concurrency: usize,
    /// Timeout for the final document GET.
    pub download_timeout: Duration,
    /// Artifact file extension, without the dot.
    pub extension: String,
    /// Where swallowed provider and transfer errors are reported.
    pub diagnostics: Diagnostics,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            download_timeout: DOWNLOAD_TIMEOUT,
            extension: DEFAULT_EXTENSION.to_string(),
            diagnostics: Diagnostics::default(),
        }
    }
}

impl FetchConfig {
    /// Context handed to every resolver call.
    #[must_use]
    pub fn resolve_context(&self) -> ResolveContext {
        ResolveContext::new(self.diagnostics)
    }

    /// Builds the scheduler for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] for a width outside 1-100.
    pub fn scheduler(&self) -> Result<BatchScheduler, EngineError> {
        BatchScheduler::new(self.concurrency)
    }

    /// Builds the per-identifier pipeline writing into `output_dir`.
    #[must_use]
    pub fn fetch_task(&self, output_dir: impl Into<PathBuf>, chain: Arc<ResolverChain>) -> FetchTask {
        FetchTask::new(
            ArtifactStore::new(output_dir).with_extension(self.extension.as_str()),
            chain,
            DocumentClient::with_timeout(self.download_timeout),
            self.resolve_context(),
        )
    }

    /// Runs a whole batch: validates the width, then fetches every distinct
    /// CAS number in `ids` into `output_dir` through `chain`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] or [`EngineError::EmptyBatch`]
    /// before any network or filesystem access.
    pub async fn run(
        &self,
        chain: ResolverChain,
        output_dir: impl Into<PathBuf>,
        ids: impl IntoIterator<Item = CasNumber>,
        token: CancellationToken,
    ) -> Result<BatchRun, EngineError> {
        let scheduler = self.scheduler()?;
        let output_dir = output_dir.into();
        debug!(
            concurrency = self.concurrency,
            output_dir = %output_dir.display(),
            resolvers = ?chain.names(),
            "preparing batch"
        );
        let task = Arc::new(self.fetch_task(output_dir, Arc::new(chain)));
        scheduler.run_batch_cancellable(task, ids, token).await
    }
}
