use std::sync::Arc;

use tracing::debug;

use crate::error::FetchError;
use crate::remote::github::GithubApi;
use crate::source::SourceLocator;

use super::{FetchOutcome, Fetcher, Prefetcher, Unpack};

/// Hashes repository revisions the way `fetchFromGitHub` expects.
pub struct GithubFetcher {
    api: GithubApi,
    prefetcher: Arc<dyn Prefetcher>,
}

impl GithubFetcher {
    pub fn new(api: GithubApi, prefetcher: Arc<dyn Prefetcher>) -> Self {
        Self { api, prefetcher }
    }
}

impl Fetcher for GithubFetcher {
    fn fetch(&self, locator: &SourceLocator, revision: &str) -> Result<FetchOutcome, FetchError> {
        let SourceLocator::Repository { owner, repo, .. } = locator else {
            return Err(FetchError::UnexpectedResponse {
                url: locator.to_string(),
                message: "the github fetcher only serves owner/repo sources".to_string(),
            });
        };

        let canonical_url = self.api.tarball_url(owner, repo, revision);
        let archive_url = self.api.zipball_url(owner, repo, revision);
        debug!(%canonical_url, %archive_url, "hashing repository revision");

        let content_hash = self.prefetcher.prefetch(&archive_url, Unpack::Tree)?;
        Ok(FetchOutcome {
            canonical_url,
            content_hash,
        })
    }
}
