//! Constants for the document transfer and batch scheduling.

use std::time::Duration;

/// HTTP connect timeout for the document GET.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Overall timeout for the document GET.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Default number of identifiers processed at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Smallest accepted pool width.
pub const MIN_CONCURRENCY: usize = 1;

/// Largest accepted pool width.
pub const MAX_CONCURRENCY: usize = 100;
