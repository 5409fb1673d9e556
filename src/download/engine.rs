//! Batch scheduler for concurrent CAS number lookups.
//!
//! This module provides the [`BatchScheduler`] which runs one [`FetchTask`]
//! per distinct CAS number using a semaphore-based concurrency control
//! pattern. Tasks are independent: a failing or panicking task only turns its
//! own CAS number into a missing outcome.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use find_sds_core::download::{BatchScheduler, DocumentClient, FetchTask};
//! use find_sds_core::resolver::{build_default_resolver_chain, ResolveContext};
//! use find_sds_core::{ArtifactStore, CasNumber};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let task = Arc::new(FetchTask::new(
//!     ArtifactStore::new("SDS"),
//!     Arc::new(build_default_resolver_chain()),
//!     DocumentClient::new(),
//!     ResolveContext::default(),
//! ));
//! let scheduler = BatchScheduler::new(10)?;
//! let run = scheduler
//!     .run_batch(task, vec![CasNumber::new("64-19-7")?, CasNumber::new("141-78-6")?])
//!     .await?;
//! println!("{} outcomes", run.outcomes.len());
//! # Ok(())
//! # }
//! ```

mod task;

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use task::{FetchOutcome, FetchTask};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use crate::cas::CasNumber;
use crate::summary::BatchSummary;

/// Error type for batch scheduling.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The batch contained no CAS numbers.
    #[error("List of CAS numbers is empty!")]
    EmptyBatch,

    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed while tasks were still being dispatched.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Everything a batch produced.
#[derive(Debug, Default)]
pub struct BatchRun {
    /// One outcome per distinct CAS number submitted, in no particular order.
    pub outcomes: Vec<FetchOutcome>,
    /// Scheduler failure that stopped dispatch early, if any. CAS numbers
    /// that were never dispatched are reported as missing.
    pub failure: Option<EngineError>,
    /// Whether the batch was cancelled before all tasks finished.
    pub cancelled: bool,
}

impl BatchRun {
    /// Aggregates the outcomes into resolved and missing sets.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::summarize(&self.outcomes)
    }
}

/// Bounded-width scheduler over independent fetch tasks.
///
/// # Concurrency Model
///
/// - Each CAS number runs in its own Tokio task
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when tasks complete (RAII)
/// - Duplicate CAS numbers are collapsed before dispatch
#[derive(Debug)]
pub struct BatchScheduler {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
}

impl BatchScheduler {
    /// Creates a scheduler with the given pool width.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }
        debug!(concurrency, "creating batch scheduler");
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Stops admitting new tasks. Batches in progress record
    /// [`EngineError::SemaphoreClosed`] and report the rest as missing.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Runs `task` for every distinct CAS number in `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyBatch`] when `ids` is empty, before any
    /// network or filesystem access. Per-identifier failures never error;
    /// they appear as missing outcomes.
    pub async fn run_batch(
        &self,
        task: Arc<FetchTask>,
        ids: impl IntoIterator<Item = CasNumber>,
    ) -> Result<BatchRun, EngineError> {
        self.run_batch_cancellable(task, ids, CancellationToken::new())
            .await
    }

    /// Like [`run_batch`](Self::run_batch), stopping early when `token` is
    /// cancelled. Unfinished CAS numbers are reported as missing and the run
    /// is marked `cancelled`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyBatch`] when `ids` is empty.
    #[instrument(skip_all, fields(concurrency = self.concurrency))]
    pub async fn run_batch_cancellable(
        &self,
        task: Arc<FetchTask>,
        ids: impl IntoIterator<Item = CasNumber>,
        token: CancellationToken,
    ) -> Result<BatchRun, EngineError> {
        let unique: BTreeSet<CasNumber> = ids.into_iter().collect();
        if unique.is_empty() {
            return Err(EngineError::EmptyBatch);
        }

        info!(total = unique.len(), "starting batch");

        let mut run = BatchRun::default();
        let mut handles: Vec<(CasNumber, JoinHandle<FetchOutcome>)> = Vec::new();
        let mut pending = unique.into_iter();

        while let Some(cas) = pending.next() {
            // Acquire semaphore permit (waits if at concurrency limit)
            let permit = tokio::select! {
                biased;
                () = token.cancelled() => {
                    run.outcomes.push(FetchOutcome::missing(cas));
                    run.outcomes.extend(pending.by_ref().map(FetchOutcome::missing));
                    break;
                }
                permit = Arc::clone(&self.semaphore).acquire_owned() => permit,
            };
            let Ok(permit) = permit else {
                warn!(cas = %cas, "semaphore closed; remaining identifiers not dispatched");
                run.failure = Some(EngineError::SemaphoreClosed);
                run.outcomes.push(FetchOutcome::missing(cas));
                run.outcomes.extend(pending.by_ref().map(FetchOutcome::missing));
                break;
            };

            let task = Arc::clone(&task);
            let token = token.clone();
            let id = cas.clone();
            handles.push((
                cas,
                tokio::spawn(async move {
                    // Permit is dropped when this block exits (RAII)
                    let _permit = permit;
                    let fallback = id.clone();
                    AssertUnwindSafe(task.run_cancellable(id, &token))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            warn!(cas = %fallback, "fetch task panicked");
                            FetchOutcome::missing(fallback)
                        })
                }),
            ));
        }

        debug!(task_count = handles.len(), "waiting for fetch tasks to complete");

        for (cas, handle) in handles {
            match handle.await {
                Ok(outcome) => run.outcomes.push(outcome),
                Err(error) => {
                    warn!(cas = %cas, error = %error, "fetch task did not complete");
                    run.outcomes.push(FetchOutcome::missing(cas));
                }
            }
        }

        run.cancelled = token.is_cancelled();
        let summary = run.summary();
        info!(
            resolved = summary.resolved.len(),
            missing = summary.missing.len(),
            cancelled = run.cancelled,
            "batch complete"
        );
        Ok(run)
    }
}
