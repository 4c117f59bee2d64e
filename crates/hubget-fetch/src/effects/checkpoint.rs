//! Segment checkpoints for resumable transfers.
//!
//! A checkpoint sits next to its part file and records which segments of the
//! pre-sized part file already hold their final bytes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use hubget_fs::{AtomicWriteOptions, atomic_read, atomic_write};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Segment;
use crate::data::RemoteFileEntry;
use crate::error::{FetchError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCheckpoint {
    /// Commit the part file belongs to.
    pub commit:     String,
    pub size:       u64,
    /// `kind:hex` of the expected digest.
    pub digest:     String,
    pub segments:   Vec<Segment>,
    pub completed:  BTreeSet<u32>,
    pub updated_at: DateTime<Utc>,
}

impl SegmentCheckpoint {
    pub fn new(entry: &RemoteFileEntry, segments: Vec<Segment>) -> Self {
        Self {
            commit: entry.commit.clone(),
            size: entry.size,
            digest: digest_tag(entry),
            segments,
            completed: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    /// Same commit, size and digest as `entry`. Any change of revision makes
    /// earlier partial bytes worthless.
    pub fn belongs_to(&self, entry: &RemoteFileEntry) -> bool {
        self.commit == entry.commit && self.size == entry.size && self.digest == digest_tag(entry)
    }

    pub fn has_layout(&self, segments: &[Segment]) -> bool { self.segments == segments }

    pub fn is_completed(&self, index: u32) -> bool { self.completed.contains(&index) }

    pub fn mark_completed(&mut self, index: u32) {
        self.completed.insert(index);
        self.updated_at = Utc::now();
    }

    pub fn completed_bytes(&self) -> u64 {
        self.segments
            .iter()
            .filter(|s| self.completed.contains(&s.index))
            .map(Segment::len)
            .sum()
    }

    /// Loads a checkpoint; a missing or unreadable one is simply absent.
    pub async fn load(path: &Path) -> Option<Self> {
        let owned = path.to_path_buf();
        let bytes = tokio::task::spawn_blocking(move || atomic_read(&owned)).await.ok()?.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                debug!(path = %path.display(), "ignoring corrupt checkpoint: {e}");
                None
            }
        }
    }

    /// Replaces the checkpoint on disk atomically.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| FetchError::io(path, std::io::Error::other(e)))?;
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            atomic_write(&owned, &json, AtomicWriteOptions::new().sync(true))
        })
        .await
        .map_err(|e| FetchError::io(path, std::io::Error::other(e)))??;
        Ok(())
    }
}

fn digest_tag(entry: &RemoteFileEntry) -> String {
    format!("{}:{}", entry.digest.kind(), entry.digest)
}
