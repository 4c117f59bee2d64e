use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Kind of hosted repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Model,
    Dataset,
    Space,
}

impl RepoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoKind::Model => "model",
            RepoKind::Dataset => "dataset",
            RepoKind::Space => "space",
        }
    }

    /// Collection name in the listing API (`/api/{segment}/...`).
    pub fn api_segment(self) -> &'static str {
        match self {
            RepoKind::Model => "models",
            RepoKind::Dataset => "datasets",
            RepoKind::Space => "spaces",
        }
    }

    /// Leading path segment of file URLs. Models have none.
    pub fn url_prefix(self) -> Option<&'static str> {
        match self {
            RepoKind::Model => None,
            RepoKind::Dataset => Some("datasets"),
            RepoKind::Space => Some("spaces"),
        }
    }
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for RepoKind {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(RepoKind::Model),
            "dataset" => Ok(RepoKind::Dataset),
            "space" => Ok(RepoKind::Space),
            other => Err(FetchError::InvalidRepoKind(other.to_string())),
        }
    }
}

/// A repository at a (possibly symbolic) revision.
///
/// Construction validates the identifier, so `owner()` and `name()` are always
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    repo_id:  String,
    split:    usize,
    kind:     RepoKind,
    revision: String,
}

impl RepositoryRef {
    pub const DEFAULT_REVISION: &'static str = "main";

    pub fn new(repo_id: impl Into<String>, kind: RepoKind) -> Result<Self> {
        let repo_id = repo_id.into();
        let split = validate_repo_id(&repo_id)?;
        Ok(Self {
            repo_id,
            split,
            kind,
            revision: Self::DEFAULT_REVISION.to_string(),
        })
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Result<Self> {
        let revision = revision.into();
        // Revisions become directory names under the default destination.
        let bad_char = |c: char| c.is_whitespace() || c.is_control() || c == '\\';
        let bad_part = |part: &str| part.is_empty() || part == "." || part == "..";
        if revision.chars().any(bad_char) || revision.split('/').any(bad_part) {
            return Err(FetchError::InvalidRevision(revision));
        }
        self.revision = revision;
        Ok(self)
    }

    pub fn repo_id(&self) -> &str { &self.repo_id }

    pub fn owner(&self) -> &str { &self.repo_id[..self.split] }

    pub fn name(&self) -> &str { &self.repo_id[self.split + 1..] }

    pub fn kind(&self) -> RepoKind { self.kind }

    pub fn revision(&self) -> &str { &self.revision }

    /// `downloads/{kind}/{owner}__{name}/{revision}`, used when no destination
    /// is given. Each revision gets its own tree.
    pub fn default_local_dir(&self) -> PathBuf {
        PathBuf::from("downloads")
            .join(self.kind.as_str())
            .join(format!("{}__{}", self.owner(), self.name()))
            .join(&self.revision)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}@{}", self.kind, self.repo_id, self.revision)
    }
}

fn validate_repo_id(repo_id: &str) -> Result<usize> {
    let invalid = || FetchError::InvalidRepoId(repo_id.to_string());
    let (owner, name) = repo_id.split_once('/').ok_or_else(invalid)?;
    let bad_part = |part: &str| {
        part.is_empty()
            || part == "."
            || part.contains("..")
            || part.contains('/')
            || part.chars().any(|c| c.is_whitespace() || c.is_control() || c == '\\')
    };
    if bad_part(owner) || bad_part(name) {
        return Err(invalid());
    }
    Ok(owner.len())
}

/// A repository whose revision has been pinned to a concrete commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRepository {
    pub reference: RepositoryRef,
    pub commit:    String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("model".parse::<RepoKind>().unwrap(), RepoKind::Model);
        assert_eq!("dataset".parse::<RepoKind>().unwrap(), RepoKind::Dataset);
        assert_eq!("space".parse::<RepoKind>().unwrap(), RepoKind::Space);
        assert!("Dataset".parse::<RepoKind>().is_err());
        assert!("models".parse::<RepoKind>().is_err());
    }

    #[test]
    fn test_repo_id_validation() {
        let repo = RepositoryRef::new("openai/whisper-tiny", RepoKind::Model).unwrap();
        assert_eq!(repo.owner(), "openai");
        assert_eq!(repo.name(), "whisper-tiny");
        assert_eq!(repo.revision(), "main");

        for bad in ["", "noslash", "/name", "owner/", "a/b/c", "a b/c", "../x", "a/..", "a\\b/c"] {
            assert!(RepositoryRef::new(bad, RepoKind::Model).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_revision() {
        let repo = RepositoryRef::new("o/n", RepoKind::Dataset)
            .unwrap()
            .with_revision("refs/pr/1")
            .unwrap();
        assert_eq!(repo.revision(), "refs/pr/1");
        assert!(repo.clone().with_revision("").is_err());
        assert!(repo.clone().with_revision("a b").is_err());
        for bad in ["..", "../x", "v1/../..", "/abs", "a//b", "a\\b", "./v1"] {
            assert!(repo.clone().with_revision(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_default_local_dir() {
        let repo = RepositoryRef::new("HuggingFaceFW/fineweb", RepoKind::Dataset).unwrap();
        assert_eq!(
            repo.default_local_dir(),
            PathBuf::from("downloads/dataset/HuggingFaceFW__fineweb/main")
        );

        let pinned = repo.with_revision("v1.2").unwrap();
        assert_eq!(
            pinned.default_local_dir(),
            PathBuf::from("downloads/dataset/HuggingFaceFW__fineweb/v1.2")
        );
    }
}
