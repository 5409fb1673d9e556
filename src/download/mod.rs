//! Document transfer and batch orchestration.
//!
//! Turns a set of CAS numbers into sheets on disk: each identifier runs
//! through a [`FetchTask`] (store check, provider chain, document GET,
//! atomic write), and a [`BatchScheduler`] runs those tasks with bounded
//! parallelism.
//!
//! # Features
//!
//! - Bounded-width parallel execution (default 10, range 1-100)
//! - Per-task failure isolation, including panics
//! - Strict no-redirect rule on the document GET
//! - Cooperative cancellation through a `CancellationToken`

mod client;
mod constants;
mod engine;
mod error;

pub use client::DocumentClient;
pub use constants::{DEFAULT_CONCURRENCY, DOWNLOAD_TIMEOUT, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use engine::{BatchRun, BatchScheduler, EngineError, FetchOutcome, FetchTask};
pub use error::DownloadError;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
