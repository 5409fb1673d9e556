//! find-sds core library
//!
//! This library locates and downloads safety data sheets (SDS) for chemicals
//! identified by CAS registry number. Several independent supplier sites are
//! queried in a fixed priority order and the first confirmed sheet is saved
//! to disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`cas`] - CAS number value type
//! - [`resolver`] - Per-provider adapters and the ordered resolver chain
//! - [`download`] - Document transfer, fetch task and batch scheduler
//! - [`store`] - On-disk artifact store with atomic writes
//! - [`summary`] - Aggregation of outcomes into resolved/missing sets
//! - [`config`] - Run configuration passed in by the caller

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cas;
pub mod config;
pub mod download;
pub mod resolver;
pub mod store;
pub mod summary;
mod user_agent;

// Re-export commonly used types
pub use cas::{CasError, CasNumber};
pub use config::FetchConfig;
pub use download::{
    BatchRun, BatchScheduler, DEFAULT_CONCURRENCY, DocumentClient, DownloadError, EngineError,
    FetchOutcome, FetchTask,
};
pub use resolver::{
    Diagnostics, ResolveContext, ResolveError, ResolverChain, SdsLink, SdsResolver,
    build_default_resolver_chain,
};
pub use store::{ArtifactStore, StoreError};
pub use summary::BatchSummary;
