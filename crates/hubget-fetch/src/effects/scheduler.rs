use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::Reporter;
use crate::data::{TransferOutcome, TransferTask};
use crate::effects::fetcher::ChunkedFetcher;
use crate::effects::http::HttpClient;
use crate::error::FetchError;

/// Bounds whole-file transfers and, through the shared connection pool, the
/// total number of outstanding network operations.
#[derive(Debug, Clone)]
pub struct Scheduler {
    files:       Arc<Semaphore>,
    connections: Arc<Semaphore>,
}

impl Scheduler {
    pub fn new(max_files: usize, max_connections: usize) -> Self {
        Self {
            files:       Arc::new(Semaphore::new(max_files.max(1))),
            connections: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// The pool fetchers draw segment connections from.
    pub fn connections(&self) -> Arc<Semaphore> { self.connections.clone() }

    /// Runs every task to an outcome, recording each as it finishes.
    ///
    /// Tasks are admitted in order, and one is only spawned once a file slot
    /// is free. After cancellation the remaining tasks are recorded as
    /// cancelled without being started.
    pub async fn run<C>(
        &self,
        fetcher: Arc<ChunkedFetcher<C>>,
        tasks: Vec<TransferTask>,
        cancel: &CancellationToken,
        reporter: &mut Reporter,
    ) where
        C: HttpClient + 'static,
    {
        let mut running = FuturesUnordered::new();
        let mut queue = tasks.into_iter();

        'admit: while let Some(task) = queue.next() {
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        reporter.record(cancelled(&task));
                        break 'admit;
                    }
                    Some(done) = running.next(), if !running.is_empty() => {
                        reporter.record(joined(done));
                    }
                    permit = self.files.clone().acquire_owned() => match permit {
                        Ok(permit) => break permit,
                        Err(_) => {
                            reporter.record(cancelled(&task));
                            continue 'admit;
                        }
                    },
                }
            };

            let fetcher = fetcher.clone();
            let path = task.entry.path.clone();
            let handle: JoinHandle<TransferOutcome> = tokio::spawn(async move {
                let outcome = fetcher.fetch(task).await;
                drop(permit);
                outcome
            });
            running.push(async move { (path, handle.await) });
        }

        for task in queue {
            reporter.record(cancelled(&task));
        }
        while let Some(done) = running.next().await {
            reporter.record(joined(done));
        }
    }
}

fn cancelled(task: &TransferTask) -> TransferOutcome {
    TransferOutcome::failed(task.entry.path.clone(), &FetchError::Cancelled, 0, 0)
}

fn joined(
    (path, result): (String, std::result::Result<TransferOutcome, tokio::task::JoinError>),
) -> TransferOutcome {
    result.unwrap_or_else(|e| {
        let err = FetchError::io(&path, std::io::Error::other(format!("transfer task failed: {e}")));
        TransferOutcome::failed(path, &err, 0, 0)
    })
}
