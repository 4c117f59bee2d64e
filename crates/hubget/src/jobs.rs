//! Declarative job files.
//!
//! ```toml
//! [defaults]
//! timeout = 120
//! allow = ["*.json"]
//!
//! [[job]]
//! repo_id = "owner/name"
//! repo_type = "dataset"
//! allow = ["*.parquet"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hubget_fetch::{DownloadJob, PatternSet, RepoKind, RepositoryRef};
use serde::Deserialize;

/// A job with the settings that may differ between jobs of one file.
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub job:     DownloadJob,
    /// Per-attempt timeout in seconds, overriding `--timeout`.
    pub timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobFile {
    #[serde(default)]
    pub defaults: JobDefaults,
    #[serde(default, rename = "job")]
    pub jobs:     Vec<JobSpec>,
}

/// Values applied to every job that does not set its own.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobDefaults {
    pub revision: Option<String>,
    pub timeout:  Option<u64>,
    pub allow:    Option<Vec<String>>,
    pub ignore:   Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    pub repo_id:   String,
    pub repo_type: RepoKind,
    pub revision:  Option<String>,
    pub local_dir: Option<PathBuf>,
    pub timeout:   Option<u64>,
    /// Replaces `defaults.allow` entirely.
    pub allow:     Option<Vec<String>>,
    pub ignore:    Option<Vec<String>>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid job file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> { Ok(toml::from_str(text)?) }

    /// Resolves every job against the defaults, in file order.
    pub fn plan(self) -> Result<Vec<PlannedJob>> {
        if self.jobs.is_empty() {
            bail!("no [[job]] entries");
        }
        self.jobs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                plan_job(&self.defaults, spec).with_context(|| format!("job #{}", i + 1))
            })
            .collect()
    }
}

fn plan_job(defaults: &JobDefaults, spec: JobSpec) -> Result<PlannedJob> {
    if spec.timeout.or(defaults.timeout) == Some(0) {
        bail!("timeout must be at least one second");
    }

    let revision = spec
        .revision
        .or_else(|| defaults.revision.clone())
        .unwrap_or_else(|| RepositoryRef::DEFAULT_REVISION.to_string());
    let repo = RepositoryRef::new(spec.repo_id, spec.repo_type)?.with_revision(revision)?;

    let allow = spec.allow.or_else(|| defaults.allow.clone()).unwrap_or_default();
    let ignore = spec.ignore.or_else(|| defaults.ignore.clone()).unwrap_or_default();
    let mut job = DownloadJob::new(repo).patterns(PatternSet::new(allow, ignore)?);
    if let Some(dir) = spec.local_dir {
        job = job.local_dir(dir);
    }

    Ok(PlannedJob {
        job,
        timeout: spec.timeout.or(defaults.timeout),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
        [defaults]
        timeout = 120
        allow = ["*.json"]

        [[job]]
        repo_id = "owner/first"
        repo_type = "dataset"
        revision = "v1"
        local_dir = "data/x"
        allow = ["*.parquet"]
        ignore = ["*.md"]

        [[job]]
        repo_id = "owner/second"
        repo_type = "model"
        timeout = 5
    "#;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let jobs = JobFile::parse(FILE).unwrap().plan().unwrap();
        assert_eq!(jobs.len(), 2);

        let first = &jobs[0];
        assert_eq!(first.job.repo.kind(), RepoKind::Dataset);
        assert_eq!(first.job.repo.revision(), "v1");
        assert_eq!(first.job.local_dir, PathBuf::from("data/x"));
        assert_eq!(first.timeout, Some(120));
        assert!(first.job.patterns.matches("train.parquet"));
        assert!(!first.job.patterns.matches("config.json"));

        let second = &jobs[1];
        assert_eq!(second.job.repo.revision(), "main");
        assert_eq!(second.job.local_dir, PathBuf::from("downloads/model/owner__second/main"));
        assert_eq!(second.timeout, Some(5));
        assert!(second.job.patterns.matches("config.json"));
        assert!(!second.job.patterns.matches("model.bin"));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        assert!(JobFile::parse("").unwrap().plan().is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let text = "[[job]]\nrepo_id = \"a/b\"\nrepo_type = \"model\"\nrepo = \"typo\"\n";
        assert!(JobFile::parse(text).is_err());
    }

    #[test]
    fn test_bad_job_names_its_index() {
        let text = "[[job]]\nrepo_id = \"a/b\"\nrepo_type = \"model\"\n\n[[job]]\nrepo_id = \"bad\"\nrepo_type = \"model\"\n";
        let err = JobFile::parse(text).unwrap().plan().unwrap_err();
        assert!(format!("{err:#}").contains("job #2"));
    }

    #[test]
    fn test_unknown_repo_type_is_rejected() {
        let text = "[[job]]\nrepo_id = \"a/b\"\nrepo_type = \"collection\"\n";
        assert!(JobFile::parse(text).is_err());
    }
}
