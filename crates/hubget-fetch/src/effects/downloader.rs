use std::path::PathBuf;
use std::sync::Arc;

use hubget_fs::StagingArea;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::{Endpoint, PatternSet, Report, Reporter};
use crate::data::{FetchOptions, RepositoryRef, TransferOutcome};
use crate::effects::fetcher::ChunkedFetcher;
use crate::effects::http::HttpClient;
use crate::effects::manifest::ManifestResolver;
use crate::effects::planner::TransferPlanner;
use crate::effects::retry::Retrier;
use crate::effects::scheduler::Scheduler;
use crate::error::Result;

/// One repository to mirror into a local directory.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub repo:      RepositoryRef,
    pub patterns:  PatternSet,
    pub local_dir: PathBuf,
}

impl DownloadJob {
    /// A job for every file of `repo` into its default directory.
    pub fn new(repo: RepositoryRef) -> Self {
        let local_dir = repo.default_local_dir();
        Self {
            repo,
            patterns: PatternSet::all(),
            local_dir,
        }
    }

    #[must_use]
    pub fn patterns(mut self, patterns: PatternSet) -> Self {
        self.patterns = patterns;
        self
    }

    #[must_use]
    pub fn local_dir(mut self, local_dir: impl Into<PathBuf>) -> Self {
        self.local_dir = local_dir.into();
        self
    }
}

/// Resolves, filters, plans and transfers one repository at a time.
///
/// # Examples
///
/// ```no_run
/// use hubget_fetch::{
///     ClientConfig, DownloadJob, Downloader, Endpoint, FetchOptions, PatternSet, RepoKind,
///     RepositoryRef, ReqwestClient, DEFAULT_ENDPOINT,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), hubget_fetch::FetchError> {
/// let client = ReqwestClient::new(&ClientConfig::default())?;
/// let downloader = Downloader::new(client, Endpoint::parse(DEFAULT_ENDPOINT)?, FetchOptions::default());
///
/// let repo = RepositoryRef::new("openai/whisper-tiny", RepoKind::Model)?;
/// let job = DownloadJob::new(repo).patterns(PatternSet::new(["*.json"], ["*.md"])?);
/// let report = downloader.download(&job, CancellationToken::new()).await?;
/// assert!(report.is_success());
/// # Ok(())
/// # }
/// ```
pub struct Downloader<C: HttpClient> {
    client:   Arc<C>,
    endpoint: Endpoint,
    options:  FetchOptions,
}

impl<C: HttpClient + 'static> Downloader<C> {
    pub fn new(client: C, endpoint: Endpoint, options: FetchOptions) -> Self {
        Self {
            client: Arc::new(client),
            endpoint,
            options,
        }
    }

    /// Downloads the selected files of one repository.
    ///
    /// Fails as a whole only when the manifest cannot be resolved or planned;
    /// per-file failures are reported in the returned [`Report`].
    pub async fn download(&self, job: &DownloadJob, cancel: CancellationToken) -> Result<Report> {
        let retrier = Retrier::new(self.options.retry.clone(), cancel.clone());
        let resolver = ManifestResolver::new(self.client.clone(), self.endpoint.clone(), retrier);
        let manifest = resolver.resolve(&job.repo).await?;

        let (entries, excluded) = job.patterns.filter(manifest.entries);
        info!(selected = entries.len(), excluded, "applied file patterns");

        let staging = StagingArea::new(&job.local_dir);
        let plan = TransferPlanner::new(staging.clone())
            .concurrency(self.options.max_concurrent_files)
            .plan(entries)
            .await?;

        let mut reporter = Reporter::new();
        for entry in plan.verified {
            reporter.record(TransferOutcome::skipped(entry.path));
        }

        let scheduler = Scheduler::new(
            self.options.max_concurrent_files,
            self.options.connection_budget(),
        );
        let fetcher = Arc::new(ChunkedFetcher::new(
            self.client.clone(),
            self.endpoint.clone(),
            Arc::new(manifest.repository),
            staging,
            self.options.clone(),
            scheduler.connections(),
            cancel.clone(),
        ));
        scheduler.run(fetcher, plan.tasks, &cancel, &mut reporter).await;

        let report = reporter.finish(excluded);
        let summary = report.summary();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            retried = summary.retried,
            bytes = summary.bytes_transferred,
            "finished {}",
            job.repo
        );
        Ok(report)
    }
}
