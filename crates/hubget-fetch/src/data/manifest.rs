use hubget_verify::{Digest, DigestKind};
use serde::Deserialize;

use crate::data::repo::{RepositoryRef, ResolvedRepository};
use crate::error::{FetchError, Result};

/// One file of a repository at a resolved commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path:   String,
    pub size:   u64,
    pub digest: Digest,
    pub commit: String,
}

/// The file listing of a repository, in the order the service returned it.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub repository: ResolvedRepository,
    pub entries:    Vec<RemoteFileEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiRepoInfo {
    sha:      Option<String>,
    #[serde(default)]
    siblings: Vec<ApiSibling>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSibling {
    rfilename: String,
    size:      Option<u64>,
    blob_id:   Option<String>,
    lfs:       Option<ApiLfs>,
}

#[derive(Debug, Deserialize)]
struct ApiLfs {
    sha256: String,
    size:   Option<u64>,
}

impl Manifest {
    /// Parses the body of `GET /api/{kind}s/{repo}/revision/{rev}?blobs=true`.
    ///
    /// Every entry must carry a size and a digest, and every path must stay
    /// inside the destination root; anything else makes the whole listing
    /// unusable.
    pub fn from_api_json(reference: RepositoryRef, body: &[u8]) -> Result<Self> {
        let info: ApiRepoInfo = serde_json::from_slice(body)
            .map_err(|e| FetchError::Protocol(format!("malformed repository listing: {e}")))?;
        let commit = info
            .sha
            .filter(|sha| !sha.is_empty())
            .ok_or_else(|| FetchError::Protocol("repository listing has no commit".into()))?;

        let entries = info
            .siblings
            .into_iter()
            .map(|sibling| sibling.into_entry(&commit))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            repository: ResolvedRepository { reference, commit },
            entries,
        })
    }

    pub fn commit(&self) -> &str { &self.repository.commit }

    pub fn total_size(&self) -> u64 { self.entries.iter().map(|e| e.size).sum() }
}

impl ApiSibling {
    fn into_entry(self, commit: &str) -> Result<RemoteFileEntry> {
        let invalid = |what: &str| FetchError::Protocol(format!("{}: {what}", self.rfilename));

        hubget_fs::validate_relative(&self.rfilename).map_err(|_| invalid("unsafe path"))?;

        let (digest, size) = match &self.lfs {
            Some(lfs) => (
                Digest::from_hex(DigestKind::Sha256, &lfs.sha256)
                    .map_err(|_| invalid("invalid sha256"))?,
                lfs.size.or(self.size),
            ),
            None => {
                let blob_id = self.blob_id.as_deref().ok_or_else(|| invalid("missing blob id"))?;
                (
                    Digest::from_hex(DigestKind::GitSha1, blob_id)
                        .map_err(|_| invalid("invalid blob id"))?,
                    self.size,
                )
            }
        };
        let size = size.ok_or_else(|| invalid("missing size"))?;

        Ok(RemoteFileEntry {
            path: self.rfilename,
            size,
            digest,
            commit: commit.to_string(),
        })
    }
}
