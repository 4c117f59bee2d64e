use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::join_all;
use hubget_fs::{StagingArea, place_file};
use hubget_verify::digest_file;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{Endpoint, Segment, calculate_segments, segment_count};
use crate::data::{
    FetchOptions, FetchPhase, LocalState, OutcomeState, Progress, ResolvedRepository,
    TransferOutcome, TransferTask,
};
use crate::effects::checkpoint::SegmentCheckpoint;
use crate::effects::http::{BoxStream, HttpClient};
use crate::effects::retry::{Retrier, bounded};
use crate::error::{FetchError, Result};

/// Counters shared by the segments of one file.
#[derive(Debug)]
struct Tally {
    total:      u64,
    /// Highest attempt count of any operation in the current pass.
    attempts:   AtomicU32,
    /// Bytes received over the network, across all passes.
    received:   AtomicU64,
    /// Bytes currently held in the part file.
    downloaded: AtomicU64,
}

impl Tally {
    fn new(total: u64) -> Self {
        Self {
            total,
            attempts: AtomicU32::new(0),
            received: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
        }
    }
}

/// Executes one [`TransferTask`] to a terminal [`TransferOutcome`].
///
/// Large files on servers that honour range requests are split into segments
/// written positionally into one pre-sized part file; everything else is one
/// stream. The part file only reaches its final path after its digest matches.
pub struct ChunkedFetcher<C: HttpClient> {
    client:      Arc<C>,
    endpoint:    Endpoint,
    repo:        Arc<ResolvedRepository>,
    staging:     StagingArea,
    options:     FetchOptions,
    retrier:     Retrier,
    connections: Arc<Semaphore>,
}

impl<C: HttpClient> ChunkedFetcher<C> {
    pub fn new(
        client: Arc<C>,
        endpoint: Endpoint,
        repo: Arc<ResolvedRepository>,
        staging: StagingArea,
        options: FetchOptions,
        connections: Arc<Semaphore>,
        cancel: CancellationToken,
    ) -> Self {
        let retrier = Retrier::new(options.retry.clone(), cancel);
        Self {
            client,
            endpoint,
            repo,
            staging,
            options,
            retrier,
            connections,
        }
    }

    pub async fn fetch(&self, task: TransferTask) -> TransferOutcome {
        let path: Arc<str> = Arc::from(task.entry.path.as_str());
        let tally = Tally::new(task.entry.size);
        let mut attempts = 0;
        let mut digest_retries = self.options.digest_retries;
        let mut range_restarts = 1;
        let mut resume = matches!(task.state, LocalState::Partial { .. });
        let mut pass = 0;

        loop {
            pass += 1;
            tally.attempts.store(0, Ordering::Relaxed);
            let result = self.run_pass(&task, &path, pass, resume, &tally).await;
            attempts += tally.attempts.load(Ordering::Relaxed).max(1);

            let err = match result {
                Ok(()) => {
                    return TransferOutcome {
                        path: task.entry.path,
                        state: OutcomeState::Succeeded,
                        bytes_transferred: tally.received.load(Ordering::Relaxed),
                        attempts,
                    };
                }
                Err(err) => err,
            };

            let fresh = match &err {
                FetchError::DigestMismatch { .. } | FetchError::Truncated { .. }
                    if digest_retries > 0 =>
                {
                    digest_retries -= 1;
                    true
                }
                FetchError::RangeNotSatisfiable(_) if range_restarts > 0 => {
                    range_restarts -= 1;
                    true
                }
                _ => false,
            };
            if !fresh {
                // A short body leaves bytes that can never verify.
                if matches!(err, FetchError::Truncated { .. }) {
                    if let Err(discard_err) = self.discard(&task.entry.path).await {
                        return self.failed(&task, &path, pass, &discard_err, &tally, attempts);
                    }
                }
                return self.failed(&task, &path, pass, &err, &tally, attempts);
            }

            warn!(path = %path, pass, "starting over: {err}");
            if let Err(discard_err) = self.discard(&task.entry.path).await {
                return self.failed(&task, &path, pass, &discard_err, &tally, attempts);
            }
            resume = false;
        }
    }

    fn failed(
        &self,
        task: &TransferTask,
        path: &Arc<str>,
        pass: u32,
        err: &FetchError,
        tally: &Tally,
        attempts: u32,
    ) -> TransferOutcome {
        self.progress(path, FetchPhase::Failed, tally, pass);
        TransferOutcome::failed(
            task.entry.path.clone(),
            err,
            tally.received.load(Ordering::Relaxed),
            attempts,
        )
    }

    async fn run_pass(
        &self,
        task: &TransferTask,
        path: &Arc<str>,
        pass: u32,
        resume: bool,
        tally: &Tally,
    ) -> Result<()> {
        tally.downloaded.store(0, Ordering::Relaxed);
        self.progress(path, FetchPhase::Connecting, tally, pass);

        if task.entry.size == 0 {
            self.discard(&task.entry.path).await?;
            self.prepare_part(&task.entry.path, 0).await?;
        } else {
            self.download(task, path, pass, resume, tally).await?;
        }

        self.verify_and_place(task, path, pass, tally).await
    }

    async fn download(
        &self,
        task: &TransferTask,
        path: &Arc<str>,
        pass: u32,
        resume: bool,
        tally: &Tally,
    ) -> Result<()> {
        let entry = &task.entry;
        let url = self.endpoint.file_url(&self.repo, &entry.path)?.to_string();

        let timeout = self.options.retry.attempt_timeout;
        let head = self
            .retrier
            .call_unbounded(&format!("HEAD {}", entry.path), |_| async {
                let _permit = self.connection().await?;
                bounded(timeout, self.client.head(&url)).await
            })
            .await;
        tally.attempts.fetch_max(head.attempts, Ordering::Relaxed);
        let head = head.result?;

        if let Some(len) = head.content_length.filter(|&len| len != entry.size) {
            warn!(path = %path, expected = entry.size, advertised = len, "server size differs from manifest");
        }
        let ranged = head.accept_ranges && head.content_length == Some(entry.size);
        let count = segment_count(
            entry.size,
            ranged,
            self.options.segment_threshold,
            self.options.max_segments_per_file,
        );
        let segments = calculate_segments(entry.size, count)?;

        let checkpoint_path = self.staging.checkpoint_path(&entry.path)?;
        let checkpoint = match self.resumable(task, resume, &checkpoint_path, &segments).await {
            Some(checkpoint) => checkpoint,
            None => {
                self.discard(&entry.path).await?;
                SegmentCheckpoint::new(entry, segments.clone())
            }
        };
        let part = self.prepare_part(&entry.path, entry.size).await?;
        checkpoint.save(&checkpoint_path).await?;

        let pending: Vec<Segment> = segments
            .iter()
            .filter(|s| !checkpoint.is_completed(s.index))
            .copied()
            .collect();
        let resumed = checkpoint.completed_bytes();
        if resumed > 0 {
            debug!(path = %path, resumed, remaining = pending.len(), "resuming from checkpoint");
        }
        tally.downloaded.store(resumed, Ordering::Relaxed);
        self.progress(path, FetchPhase::Downloading, tally, pass);

        let checkpoint = Mutex::new(checkpoint);
        let pool = Semaphore::new(self.options.max_segments_per_file.max(1));
        let ctx = SegmentContext {
            url: &url,
            part: &part,
            ranged,
            path,
            pass,
            checkpoint: &checkpoint,
            checkpoint_path: &checkpoint_path,
            pool: &pool,
            tally,
        };

        let mut running = Vec::with_capacity(pending.len());
        for segment in &pending {
            running.push(self.fetch_segment(&ctx, *segment));
        }
        // Every segment runs to completion so finished ones are checkpointed
        // even when a sibling fails.
        join_all(running).await.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// The checkpoint of an earlier run, if it can be continued.
    async fn resumable(
        &self,
        task: &TransferTask,
        resume: bool,
        checkpoint_path: &Path,
        segments: &[Segment],
    ) -> Option<SegmentCheckpoint> {
        if !resume {
            return None;
        }
        let checkpoint = SegmentCheckpoint::load(checkpoint_path).await?;
        if !checkpoint.belongs_to(&task.entry) || !checkpoint.has_layout(segments) {
            debug!(path = %task.entry.path, "segment layout changed, starting over");
            return None;
        }
        let part_len = tokio::fs::metadata(&task.staging).await.ok()?.len();
        (part_len == task.entry.size).then_some(checkpoint)
    }

    async fn fetch_segment(&self, ctx: &SegmentContext<'_>, segment: Segment) -> Result<()> {
        let _slot = ctx.pool.acquire().await.map_err(|_| FetchError::Cancelled)?;
        let what = format!("segment {} of {}", segment.index, ctx.path);

        let outcome = self
            .retrier
            .call_unbounded(&what, |_| self.stream_segment(ctx, segment))
            .await;
        ctx.tally.attempts.fetch_max(outcome.attempts, Ordering::Relaxed);
        outcome.result?;

        let mut checkpoint = ctx.checkpoint.lock().await;
        checkpoint.mark_completed(segment.index);
        checkpoint.save(ctx.checkpoint_path).await
    }

    async fn stream_segment(&self, ctx: &SegmentContext<'_>, segment: Segment) -> Result<()> {
        let _permit = self.connection().await?;
        let timeout = self.options.retry.attempt_timeout;
        let range = ctx.ranged.then(|| segment.range());
        let mut stream = bounded(timeout, self.client.stream(ctx.url, range)).await?;

        let io_err = |e: std::io::Error| FetchError::io(ctx.part, e);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .open(ctx.part)
            .await
            .map_err(io_err)?;
        file.seek(SeekFrom::Start(segment.start)).await.map_err(io_err)?;

        let mut written = 0u64;
        let result = async {
            while let Some(chunk) = next_chunk(&mut stream, timeout).await? {
                let len = chunk.len() as u64;
                ctx.tally.received.fetch_add(len, Ordering::Relaxed);
                if written + len > segment.len() {
                    return Err(FetchError::Protocol(format!(
                        "{}: server sent more than the {} bytes requested",
                        ctx.path,
                        segment.len()
                    )));
                }
                file.write_all(&chunk).await.map_err(io_err)?;
                written += len;
                ctx.tally.downloaded.fetch_add(len, Ordering::Relaxed);
                self.progress(ctx.path, FetchPhase::Downloading, ctx.tally, ctx.pass);
            }
            if written != segment.len() {
                return Err(FetchError::Truncated {
                    path:     ctx.path.to_string(),
                    received: written,
                    expected: segment.len(),
                });
            }
            file.flush().await.map_err(io_err)?;
            file.sync_data().await.map_err(io_err)
        }
        .await;

        if result.is_err() {
            ctx.tally.downloaded.fetch_sub(written, Ordering::Relaxed);
        }
        result
    }

    async fn verify_and_place(
        &self,
        task: &TransferTask,
        path: &Arc<str>,
        pass: u32,
        tally: &Tally,
    ) -> Result<()> {
        let entry = &task.entry;
        self.progress(path, FetchPhase::Verifying, tally, pass);

        let part = task.staging.clone();
        let kind = entry.digest.kind();
        let actual = tokio::task::spawn_blocking(move || digest_file(&part, kind))
            .await
            .map_err(|e| FetchError::io(&task.staging, std::io::Error::other(e)))?
            .map_err(|e| FetchError::io(&task.staging, e))?;

        if actual != entry.digest {
            self.discard(&entry.path).await?;
            return Err(FetchError::DigestMismatch {
                path:     entry.path.clone(),
                expected: entry.digest.to_hex(),
                actual:   actual.to_hex(),
            });
        }

        self.progress(path, FetchPhase::Committing, tally, pass);
        let (part, destination) = (task.staging.clone(), task.destination.clone());
        tokio::task::spawn_blocking(move || place_file(&part, &destination))
            .await
            .map_err(|e| FetchError::io(&task.destination, std::io::Error::other(e)))??;
        self.discard(&entry.path).await?;

        self.progress(path, FetchPhase::Completed, tally, pass);
        Ok(())
    }

    async fn connection(&self) -> Result<SemaphorePermit<'_>> {
        self.connections.acquire().await.map_err(|_| FetchError::Cancelled)
    }

    async fn prepare_part(&self, rel: &str, size: u64) -> Result<std::path::PathBuf> {
        let staging = self.staging.clone();
        let rel = rel.to_string();
        let dest = self.staging.root().to_path_buf();
        tokio::task::spawn_blocking(move || staging.prepare_part(&rel, size))
            .await
            .map_err(|e| FetchError::io(dest, std::io::Error::other(e)))?
            .map_err(FetchError::from)
    }

    async fn discard(&self, rel: &str) -> Result<()> {
        let staging = self.staging.clone();
        let rel = rel.to_string();
        let dest = self.staging.root().to_path_buf();
        tokio::task::spawn_blocking(move || staging.discard(&rel))
            .await
            .map_err(|e| FetchError::io(dest, std::io::Error::other(e)))?
            .map_err(FetchError::from)
    }

    fn progress(&self, path: &Arc<str>, phase: FetchPhase, tally: &Tally, attempt: u32) {
        if self.options.on_progress.is_none() {
            return;
        }
        self.options.report(Progress {
            path: path.clone(),
            phase,
            bytes_downloaded: tally.downloaded.load(Ordering::Relaxed),
            total_bytes: tally.total,
            attempt,
        });
    }
}

/// Borrowed state shared by the segments of one pass.
struct SegmentContext<'a> {
    url:             &'a str,
    part:            &'a Path,
    ranged:          bool,
    path:            &'a Arc<str>,
    pass:            u32,
    checkpoint:      &'a Mutex<SegmentCheckpoint>,
    checkpoint_path: &'a Path,
    pool:            &'a Semaphore,
    tally:           &'a Tally,
}

async fn next_chunk(
    stream: &mut BoxStream<'static, Result<Bytes>>,
    timeout: Option<Duration>,
) -> Result<Option<Bytes>> {
    bounded(timeout, async { stream.next().await.transpose() }).await
}
