use std::collections::HashSet;

use futures_util::{StreamExt, stream};
use hubget_fs::StagingArea;
use hubget_verify::verify_file;
use tracing::{debug, warn};

use crate::data::{LocalState, RemoteFileEntry, TransferTask};
use crate::effects::checkpoint::SegmentCheckpoint;
use crate::error::{FetchError, Result};

/// Outcome of planning: what must be fetched and what is already in place.
#[derive(Debug, Default)]
pub struct Plan {
    /// In manifest order.
    pub tasks:    Vec<TransferTask>,
    /// Entries whose final file already matches the manifest digest.
    pub verified: Vec<RemoteFileEntry>,
}

/// Classifies filtered entries against the destination tree. Never writes.
#[derive(Debug, Clone)]
pub struct TransferPlanner {
    staging:     StagingArea,
    concurrency: usize,
}

impl TransferPlanner {
    pub fn new(staging: StagingArea) -> Self {
        Self {
            staging,
            concurrency: 4,
        }
    }

    /// How many existing files are hashed at once.
    #[must_use]
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub async fn plan(&self, entries: Vec<RemoteFileEntry>) -> Result<Plan> {
        {
            let mut seen = HashSet::with_capacity(entries.len());
            for entry in &entries {
                if !seen.insert(entry.path.as_str()) {
                    return Err(FetchError::Protocol(format!(
                        "manifest lists {} more than once",
                        entry.path
                    )));
                }
            }
        }

        let inspected: Vec<_> = stream::iter(entries)
            .map(|entry| self.inspect(entry))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut plan = Plan::default();
        for task in inspected {
            let task = task?;
            if task.state == LocalState::CompleteVerified {
                plan.verified.push(task.entry);
            } else {
                plan.tasks.push(task);
            }
        }
        Ok(plan)
    }

    /// Determines the local state of one entry.
    pub async fn inspect(&self, entry: RemoteFileEntry) -> Result<TransferTask> {
        let destination = self.staging.destination(&entry.path)?;
        let staging = self.staging.part_path(&entry.path)?;

        let mut state = match tokio::fs::metadata(&destination).await {
            Ok(meta) if meta.is_file() && meta.len() == entry.size => LocalState::CompleteUnverified,
            Ok(_) => {
                debug!(path = %entry.path, "existing file differs in size, will replace");
                LocalState::Absent
            }
            Err(_) => LocalState::Absent,
        };

        if state == LocalState::CompleteUnverified {
            let path = destination.clone();
            let digest = entry.digest.clone();
            let verified = tokio::task::spawn_blocking(move || verify_file(&path, &digest))
                .await
                .map_err(|e| FetchError::io(&destination, std::io::Error::other(e)))?;
            state = match verified {
                Ok(()) => LocalState::CompleteVerified,
                Err(e) => {
                    warn!(path = %entry.path, "existing file does not verify, will replace: {e}");
                    LocalState::Absent
                }
            };
        }

        if state == LocalState::Absent {
            let checkpoint_path = self.staging.checkpoint_path(&entry.path)?;
            if let Some(checkpoint) = SegmentCheckpoint::load(&checkpoint_path).await {
                if checkpoint.belongs_to(&entry) {
                    state = LocalState::Partial {
                        completed_bytes: checkpoint.completed_bytes(),
                    };
                } else {
                    debug!(path = %entry.path, "stale checkpoint from another revision");
                }
            }
        }

        Ok(TransferTask {
            entry,
            destination,
            staging,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use hubget_verify::{Digest, DigestKind, Sha256Hasher};
    use tempfile::tempdir;

    use super::*;
    use crate::core::calculate_segments;

    fn entry(path: &str, content: &[u8]) -> RemoteFileEntry {
        RemoteFileEntry {
            path:   path.into(),
            size:   content.len() as u64,
            digest: Digest::from_bytes(DigestKind::Sha256, &Sha256Hasher::digest(content)).unwrap(),
            commit: "c1".into(),
        }
    }

    #[tokio::test]
    async fn test_classifies_local_state() {
        let dir = tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        std::fs::write(dir.path().join("good.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("corrupt.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("short.bin"), b"abc").unwrap();

        let partial = entry("sub/partial.bin", b"0123456789");
        let mut checkpoint = SegmentCheckpoint::new(&partial, calculate_segments(10, 2).unwrap());
        checkpoint.mark_completed(0);
        checkpoint.save(&staging.checkpoint_path("sub/partial.bin").unwrap()).await.unwrap();

        let plan = TransferPlanner::new(staging)
            .plan(vec![
                entry("good.json", b"{}"),
                entry("corrupt.json", b"{}"),
                entry("short.bin", b"abcdef"),
                entry("missing.txt", b"x"),
                partial,
            ])
            .await
            .unwrap();

        assert_eq!(plan.verified.len(), 1);
        assert_eq!(plan.verified[0].path, "good.json");

        let states: Vec<_> = plan.tasks.iter().map(|t| (t.entry.path.as_str(), t.state)).collect();
        assert_eq!(states, [
            ("corrupt.json", LocalState::Absent),
            ("short.bin", LocalState::Absent),
            ("missing.txt", LocalState::Absent),
            ("sub/partial.bin", LocalState::Partial { completed_bytes: 5 }),
        ]);
        assert!(plan.tasks[3].staging.ends_with(".hubget/incomplete/sub/partial.bin.part"));
    }

    #[tokio::test]
    async fn test_checkpoint_from_other_commit_is_ignored() {
        let dir = tempdir().unwrap();
        let staging = StagingArea::new(dir.path());

        let old = entry("a.bin", b"aaaa");
        let mut checkpoint = SegmentCheckpoint::new(&old, calculate_segments(4, 1).unwrap());
        checkpoint.mark_completed(0);
        checkpoint.save(&staging.checkpoint_path("a.bin").unwrap()).await.unwrap();

        let mut new = old.clone();
        new.commit = "c2".into();
        let task = TransferPlanner::new(staging).inspect(new).await.unwrap();
        assert_eq!(task.state, LocalState::Absent);
    }

    #[tokio::test]
    async fn test_duplicate_paths_rejected() {
        let dir = tempdir().unwrap();
        let planner = TransferPlanner::new(StagingArea::new(dir.path()));
        let err = planner
            .plan(vec![entry("a", b"1"), entry("a", b"2")])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_planning_does_not_write() {
        let dir = tempdir().unwrap();
        let planner = TransferPlanner::new(StagingArea::new(dir.path()));
        planner.plan(vec![entry("x/y.bin", b"data")]).await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
