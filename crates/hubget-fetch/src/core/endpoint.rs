use url::Url;

use crate::data::{RepositoryRef, ResolvedRepository};
use crate::error::{FetchError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Base URL of the hosting service and the URL layout below it.
///
/// Every path segment is percent-encoded individually, so revisions such as
/// `refs/pr/1` travel as one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || FetchError::InvalidEndpoint(s.to_string());
        let base = Url::parse(s).map_err(|_| invalid())?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(invalid());
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(invalid());
        }
        Ok(Self { base })
    }

    pub fn as_url(&self) -> &Url { &self.base }

    /// `{base}/api/{kind}s/{owner}/{name}/revision/{revision}?blobs=true`
    pub fn manifest_url(&self, repo: &RepositoryRef) -> Result<Url> {
        let mut url = self.join([
            "api",
            repo.kind().api_segment(),
            repo.owner(),
            repo.name(),
            "revision",
            repo.revision(),
        ])?;
        url.query_pairs_mut().append_pair("blobs", "true");
        Ok(url)
    }

    /// `{base}/{prefix}{owner}/{name}/resolve/{commit}/{path}`
    pub fn file_url(&self, repo: &ResolvedRepository, path: &str) -> Result<Url> {
        let reference = &repo.reference;
        let head = reference.kind().url_prefix().into_iter().chain([
            reference.owner(),
            reference.name(),
            "resolve",
            repo.commit.as_str(),
        ]);
        self.join(head.chain(path.split('/')))
    }

    fn join<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidEndpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
