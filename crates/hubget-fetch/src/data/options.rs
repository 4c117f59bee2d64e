use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::progress::Progress;
use crate::core::RetryPolicy;

/// Phases of a file transfer.
///
/// Transfers progress through these phases in order:
/// Connecting → Downloading → Verifying → Committing → Completed
///
/// A fresh pass after a digest mismatch returns to Connecting. A file that
/// gives up ends in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Probing the remote file.
    #[default]
    Connecting,

    /// Streaming segments into the part file.
    Downloading,

    /// Hashing the complete part file.
    Verifying,

    /// Renaming the part file to its final path.
    Committing,

    Completed,

    Failed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Connecting => write!(f, "Connecting"),
            FetchPhase::Downloading => write!(f, "Downloading"),
            FetchPhase::Verifying => write!(f, "Verifying"),
            FetchPhase::Committing => write!(f, "Committing"),
            FetchPhase::Completed => write!(f, "Completed"),
            FetchPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Configuration for a repository download.
///
/// # Examples
///
/// ```
/// use hubget_fetch::{FetchOptions, RetryPolicy};
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .retry(RetryPolicy::default().max_attempts(5))
///     .timeout(Some(Duration::from_secs(120)))
///     .max_concurrent_files(8);
/// assert_eq!(options.connection_budget(), 32);
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Retry policy applied to every network operation.
    ///
    /// Default: 3 attempts, 500ms base delay, 30s cap
    pub retry: RetryPolicy,

    /// Maximum number of files transferred at once.
    ///
    /// Default: 4
    pub max_concurrent_files: usize,

    /// Maximum number of byte-range segments per file.
    ///
    /// Default: 4
    pub max_segments_per_file: usize,

    /// Process-wide ceiling on outstanding network operations.
    ///
    /// Default: `max_concurrent_files * max_segments_per_file`
    pub max_connections: Option<usize>,

    /// Files smaller than this are fetched as one stream.
    ///
    /// Default: 64 MiB
    pub segment_threshold: u64,

    /// Fresh full passes granted after a digest mismatch.
    ///
    /// Default: 1
    pub digest_retries: u32,

    /// Progress callback invoked on phase changes and after each chunk write.
    ///
    /// Default: None
    pub on_progress: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("retry", &self.retry)
            .field("max_concurrent_files", &self.max_concurrent_files)
            .field("max_segments_per_file", &self.max_segments_per_file)
            .field("max_connections", &self.max_connections)
            .field("segment_threshold", &self.segment_threshold)
            .field("digest_retries", &self.digest_retries)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retry:                 RetryPolicy::default(),
            max_concurrent_files:  4,
            max_segments_per_file: 4,
            max_connections:       None,
            segment_threshold:     64 * 1024 * 1024,
            digest_retries:        1,
            on_progress:           None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Shorthand for setting the retry policy's per-attempt timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.retry = self.retry.attempt_timeout(timeout);
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn max_concurrent_files(mut self, n: usize) -> Self {
        self.max_concurrent_files = n.max(1);
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn max_segments_per_file(mut self, n: usize) -> Self {
        self.max_segments_per_file = n.max(1);
        self
    }

    #[must_use]
    pub fn max_connections(mut self, n: Option<usize>) -> Self {
        self.max_connections = n.map(|n| n.max(1));
        self
    }

    #[must_use]
    pub fn segment_threshold(mut self, bytes: u64) -> Self {
        self.segment_threshold = bytes;
        self
    }

    #[must_use]
    pub fn digest_retries(mut self, n: u32) -> Self {
        self.digest_retries = n;
        self
    }

    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Effective connection ceiling, never above files × segments.
    pub fn connection_budget(&self) -> usize {
        let product = self
            .max_concurrent_files
            .max(1)
            .saturating_mul(self.max_segments_per_file.max(1));
        self.max_connections.map_or(product, |n| n.clamp(1, product))
    }

    pub(crate) fn report(&self, progress: Progress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}
