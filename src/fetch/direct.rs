use std::sync::Arc;

use tracing::debug;

use crate::error::FetchError;
use crate::source::SourceLocator;

use super::{FetchOutcome, Fetcher, Prefetcher, Unpack};

/// Hashes the bytes behind a literal URL (`fetchurl` semantics).
pub struct UrlFetcher {
    prefetcher: Arc<dyn Prefetcher>,
}

impl UrlFetcher {
    pub fn new(prefetcher: Arc<dyn Prefetcher>) -> Self {
        Self { prefetcher }
    }
}

impl Fetcher for UrlFetcher {
    fn fetch(&self, locator: &SourceLocator, _revision: &str) -> Result<FetchOutcome, FetchError> {
        let SourceLocator::Url { url } = locator else {
            return Err(FetchError::UnexpectedResponse {
                url: locator.to_string(),
                message: "the url fetcher only serves URL sources".to_string(),
            });
        };

        debug!(url, "hashing url");
        let content_hash = self.prefetcher.prefetch(url, Unpack::Flat)?;
        Ok(FetchOutcome {
            canonical_url: url.clone(),
            content_hash,
        })
    }
}
