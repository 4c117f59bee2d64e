use std::sync::Arc;

use tracing::{debug, info};

use crate::core::Endpoint;
use crate::data::{Manifest, RepositoryRef};
use crate::effects::http::HttpClient;
use crate::effects::retry::Retrier;
use crate::error::Result;

/// Fetches a repository listing and pins its revision to a commit.
pub struct ManifestResolver<C: HttpClient> {
    client:   Arc<C>,
    endpoint: Endpoint,
    retrier:  Retrier,
}

impl<C: HttpClient> ManifestResolver<C> {
    pub fn new(client: Arc<C>, endpoint: Endpoint, retrier: Retrier) -> Self {
        Self {
            client,
            endpoint,
            retrier,
        }
    }

    pub async fn resolve(&self, repo: &RepositoryRef) -> Result<Manifest> {
        let url = self.endpoint.manifest_url(repo)?.to_string();
        debug!(%url, "resolving manifest");

        let outcome = self
            .retrier
            .call("manifest request", |_| self.client.get_bytes(&url))
            .await;
        let body = outcome.result?;
        let manifest = Manifest::from_api_json(repo.clone(), &body)?;

        info!(
            repo = %repo,
            commit = %manifest.commit(),
            files = manifest.entries.len(),
            bytes = manifest.total_size(),
            "resolved manifest"
        );
        Ok(manifest)
    }
}
