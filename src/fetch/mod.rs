//! Fetcher backends: turn a pinned locator into a content hash.
//!
//! - [`GithubFetcher`]: hashes the unpacked tree of a repository revision.
//! - [`UrlFetcher`]: hashes the bytes behind a literal URL.
//!
//! How bytes are obtained and hashed is delegated to a [`Prefetcher`].

pub mod direct;
pub mod github;
pub mod prefetch;

pub use direct::UrlFetcher;
pub use github::GithubFetcher;
pub use prefetch::{BuiltinPrefetcher, NixPrefetchUrl, Prefetcher, Unpack};

use crate::error::FetchError;
use crate::hash::ContentHash;
use crate::source::SourceLocator;

/// What a fetcher learned about one revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOutcome {
    /// URL a build description would fetch from.
    pub canonical_url: String,
    pub content_hash: ContentHash,
}

/// A backend able to hash a pinned source.
pub trait Fetcher: Send + Sync {
    /// Fetches `locator` at `revision` and hashes it.
    ///
    /// URL locators ignore `revision`.
    fn fetch(&self, locator: &SourceLocator, revision: &str) -> Result<FetchOutcome, FetchError>;
}

/// Checks a computed hash against a user-supplied one.
///
/// Digests are compared, so any supported spelling of the right hash
/// passes. An expected value that is not a hash at all never matches.
pub fn verify(expected: Option<&str>, actual: &ContentHash) -> Result<(), FetchError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match ContentHash::parse(expected) {
        Ok(parsed) if parsed == *actual => Ok(()),
        _ => Err(FetchError::HashMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
    }
}
