use std::sync::Arc;

use crate::data::options::FetchPhase;

/// Snapshot of one file's transfer, handed to progress callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Remote path of the file.
    pub path: Arc<str>,

    pub phase: FetchPhase,

    /// Bytes present in the part file, including bytes from a previous run.
    pub bytes_downloaded: u64,

    /// Expected size from the manifest.
    pub total_bytes: u64,

    /// Current fresh pass over the file (1-based).
    pub attempt: u32,
}

impl Progress {
    /// Percentage of completion. Empty files report 100% once completed.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            if self.is_completed() { 100.0 } else { 0.0 }
        } else {
            (self.bytes_downloaded as f64 / self.total_bytes as f64) * 100.0
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool { self.phase == FetchPhase::Completed }

    #[must_use]
    pub fn is_retrying(&self) -> bool { self.attempt > 1 }
}
