use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use hubget_fetch::{
    ClientConfig, DEFAULT_ENDPOINT, DownloadJob, Downloader, Endpoint, FetchOptions, PatternSet,
    RepoKind, RepositoryRef, ReqwestClient, RetryPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};

use crate::env::HubEnv;
use crate::jobs::{JobFile, PlannedJob};
use crate::utils::ui::Ui;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "hubget", version, about, long_about = None)]
pub struct App {
    /// Repository to download, as `owner/name`.
    #[arg(long, value_name = "OWNER/NAME", required_unless_present = "jobs")]
    pub repo_id: Option<String>,

    #[arg(long, value_enum, required_unless_present = "jobs")]
    pub repo_type: Option<RepoType>,

    /// Branch, tag or commit.
    #[arg(long, default_value = RepositoryRef::DEFAULT_REVISION)]
    pub revision: String,

    /// Destination root [default: downloads/{type}/{owner}__{name}/{revision}]
    #[arg(long, value_name = "PATH")]
    pub local_dir: Option<PathBuf>,

    /// Only download paths matching these globs.
    #[arg(long, value_name = "GLOB", num_args = 1.., action = ArgAction::Append)]
    pub allow: Vec<String>,

    /// Skip paths matching these globs (wins over --allow).
    #[arg(long, value_name = "GLOB", num_args = 1.., action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Per-attempt network timeout [default: 60]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Attempts per network operation.
    #[arg(long, value_name = "N", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub retries: u32,

    /// Concurrent file transfers.
    #[arg(long, value_name = "N", default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_files: u16,

    /// Concurrent segments per file.
    #[arg(long, value_name = "N", default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub max_segments: u16,

    /// Minimum file size for segmented transfers, in MiB.
    #[arg(long, value_name = "MIB", default_value_t = 64)]
    pub segment_threshold_mb: u64,

    #[arg(long, env = "HF_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Bearer token for gated or private repositories.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Run the jobs listed in a TOML file, one after another.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["repo_id", "repo_type"])]
    pub jobs: Option<PathBuf>,

    /// Disable progress bars.
    #[arg(long)]
    pub no_progress: bool,

    /// More logging (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepoType {
    Model,
    Dataset,
    Space,
}

impl From<RepoType> for RepoKind {
    fn from(value: RepoType) -> Self {
        match value {
            RepoType::Model => RepoKind::Model,
            RepoType::Dataset => RepoKind::Dataset,
            RepoType::Space => RepoKind::Space,
        }
    }
}

impl App {
    pub fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    /// Runs every job and reports whether all of them succeeded.
    pub async fn run(self, ui: &Ui) -> Result<bool> {
        let jobs = self.planned_jobs()?;

        let proxy = HubEnv::from_env().proxy().clone();
        let config = ClientConfig::default().token(self.token.clone()).proxy(proxy);
        let client = ReqwestClient::new(&config).context("failed to build HTTP client")?;
        let endpoint = Endpoint::parse(&self.endpoint).context("invalid --endpoint")?;

        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling transfers");
                    cancel.cancel();
                }
            }
        });

        let mut all_ok = true;
        for planned in jobs {
            if cancel.is_cancelled() {
                warn!(repo = %planned.job.repo, "not started");
                all_ok = false;
                continue;
            }
            all_ok &= self.run_job(&client, &endpoint, planned, ui, &cancel).await;
        }
        Ok(all_ok)
    }

    async fn run_job(
        &self,
        client: &ReqwestClient,
        endpoint: &Endpoint,
        planned: PlannedJob,
        ui: &Ui,
        cancel: &CancellationToken,
    ) -> bool {
        let job = planned.job;
        info!(repo = %job.repo, dir = %job.local_dir.display(), "starting");

        let tracker = ui.tracker();
        let options = self.options(planned.timeout).on_progress(tracker.callback());
        let downloader = Downloader::new(client.clone(), endpoint.clone(), options);

        let result = downloader.download(&job, cancel.clone()).await;
        tracker.finish();
        match result {
            Ok(report) => {
                ui.print_report(&job, &report);
                report.is_success()
            }
            Err(e) => {
                error!(repo = %job.repo, "download failed: {e}");
                false
            }
        }
    }

    fn options(&self, job_timeout: Option<u64>) -> FetchOptions {
        let mut retry = RetryPolicy::default().max_attempts(self.retries);
        if let Some(secs) = job_timeout.or(self.timeout) {
            retry = retry.attempt_timeout(Some(Duration::from_secs(secs)));
        }
        FetchOptions::default()
            .retry(retry)
            .max_concurrent_files(usize::from(self.max_files))
            .max_segments_per_file(usize::from(self.max_segments))
            .segment_threshold(self.segment_threshold_mb.saturating_mul(MIB))
    }

    fn planned_jobs(&self) -> Result<Vec<PlannedJob>> {
        if let Some(path) = &self.jobs {
            return JobFile::load(path)?.plan();
        }

        let (Some(repo_id), Some(repo_type)) = (&self.repo_id, self.repo_type) else {
            anyhow::bail!("--repo-id and --repo-type are required without --jobs");
        };
        let repo = RepositoryRef::new(repo_id.as_str(), repo_type.into())?
            .with_revision(self.revision.as_str())?;
        let patterns = PatternSet::new(&self.allow, &self.ignore)?;

        let mut job = DownloadJob::new(repo).patterns(patterns);
        if let Some(dir) = &self.local_dir {
            job = job.local_dir(dir);
        }
        Ok(vec![PlannedJob { job, timeout: None }])
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> App {
        App::try_parse_from(std::iter::once("hubget").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_command_is_well_formed() { App::command().debug_assert(); }

    #[test]
    fn test_single_job_from_flags() {
        let app = parse(&[
            "--repo-id",
            "openai/whisper-tiny",
            "--repo-type",
            "model",
            "--allow",
            "*.json",
            "--ignore",
            "*.md",
        ]);
        let jobs = app.planned_jobs().unwrap();

        assert_eq!(jobs.len(), 1);
        let job = &jobs[0].job;
        assert_eq!(job.repo.repo_id(), "openai/whisper-tiny");
        assert_eq!(job.repo.revision(), "main");
        assert_eq!(job.local_dir, PathBuf::from("downloads/model/openai__whisper-tiny/main"));
        assert!(job.patterns.matches("config.json"));
        assert!(!job.patterns.matches("README.md"));
    }

    #[test]
    fn test_globs_take_several_values() {
        let app = parse(&[
            "--repo-id",
            "a/b",
            "--repo-type",
            "model",
            "--allow",
            "*.bin",
            "*.json",
            "--ignore",
            "*.md",
            "--allow",
            "tokenizer/",
            "--ignore",
            "*.onnx",
            "*.h5",
        ]);
        assert_eq!(app.allow, ["*.bin", "*.json", "tokenizer/"]);
        assert_eq!(app.ignore, ["*.md", "*.onnx", "*.h5"]);

        let job = &app.planned_jobs().unwrap()[0].job;
        assert!(job.patterns.matches("model.bin"));
        assert!(job.patterns.matches("config.json"));
        assert!(!job.patterns.matches("model.onnx"));
    }

    #[test]
    fn test_invalid_repo_id_is_an_error() {
        let app = parse(&["--repo-id", "no-slash", "--repo-type", "dataset"]);
        assert!(app.planned_jobs().is_err());
    }

    #[test]
    fn test_options_from_flags() {
        let app = parse(&[
            "--repo-id",
            "a/b",
            "--repo-type",
            "dataset",
            "--timeout",
            "5",
            "--retries",
            "7",
            "--max-files",
            "2",
            "--segment-threshold-mb",
            "1",
        ]);
        let options = app.options(None);

        assert_eq!(options.retry.max_attempts, 7);
        assert_eq!(options.retry.attempt_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.max_concurrent_files, 2);
        assert_eq!(options.segment_threshold, MIB);

        let options = app.options(Some(30));
        assert_eq!(options.retry.attempt_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["--jobs", "j.toml"]).log_level(), Level::INFO);
        assert_eq!(parse(&["--jobs", "j.toml", "-v"]).log_level(), Level::DEBUG);
        assert_eq!(parse(&["--jobs", "j.toml", "-q"]).log_level(), Level::WARN);
    }

    #[test]
    fn test_jobs_conflicts_with_repo_id() {
        let err = App::try_parse_from(["hubget", "--jobs", "j.toml", "--repo-id", "a/b"]);
        assert!(err.is_err());
    }
}
