//! Source locators and the descriptors they resolve into.
//!
//! A [`SourceLocator`] is what the user asked for; a [`ResolvedDescriptor`]
//! is what they get back once the revision and content hash are known.

pub mod reference;

use std::fmt;

use crate::error::ParseError;
use crate::hash::ContentHash;

pub use reference::parse_reference;

/// Backend name for repository-backed sources.
pub const GITHUB_BACKEND: &str = "github";
/// Backend name for direct-URL sources.
pub const URL_BACKEND: &str = "url";

/// Where a source lives.
///
/// Exactly one shape is populated. Repository owners and names only ever
/// contain ASCII alphanumerics, `_` and `-`; [`parse_reference`] enforces this.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SourceLocator {
    Repository {
        owner: String,
        repo: String,
        revision: Option<String>,
    },
    Url {
        url: String,
    },
}

impl SourceLocator {
    /// Creates a repository locator without a revision.
    pub fn repository(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        SourceLocator::Repository {
            owner: owner.into(),
            repo: repo.into(),
            revision: None,
        }
    }

    /// Creates a direct-URL locator.
    pub fn url(url: impl Into<String>) -> Self {
        SourceLocator::Url { url: url.into() }
    }

    /// Returns the same locator pinned to `revision`.
    ///
    /// URL locators carry no revision and are returned unchanged.
    pub fn with_revision(self, revision: impl Into<String>) -> Self {
        match self {
            SourceLocator::Repository { owner, repo, .. } => SourceLocator::Repository {
                owner,
                repo,
                revision: Some(revision.into()),
            },
            url @ SourceLocator::Url { .. } => url,
        }
    }

    /// The explicit revision, if the user supplied one.
    pub fn revision(&self) -> Option<&str> {
        match self {
            SourceLocator::Repository { revision, .. } => revision.as_deref(),
            SourceLocator::Url { .. } => None,
        }
    }

    /// Name of the fetcher backend that serves this shape.
    pub fn backend(&self) -> &'static str {
        match self {
            SourceLocator::Repository { .. } => GITHUB_BACKEND,
            SourceLocator::Url { .. } => URL_BACKEND,
        }
    }

    /// `owner/repo` or the URL, without any revision.
    pub fn display_name(&self) -> String {
        match self {
            SourceLocator::Repository { owner, repo, .. } => format!("{owner}/{repo}"),
            SourceLocator::Url { url } => url.clone(),
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Repository {
                owner,
                repo,
                revision: Some(revision),
            } => write!(f, "{owner}/{repo}@{revision}"),
            SourceLocator::Repository { owner, repo, .. } => write!(f, "{owner}/{repo}"),
            SourceLocator::Url { url } => f.write_str(url),
        }
    }
}

/// A fully pinned source: exact revision plus verified content hash.
///
/// Only produced by a successful resolution. There are no setters; pinning
/// again yields a new value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedDescriptor {
    locator: SourceLocator,
    revision: String,
    content_hash: ContentHash,
}

impl ResolvedDescriptor {
    /// Assembles a descriptor.
    ///
    /// For URL sources the revision is the URL itself.
    ///
    /// # Errors
    /// Returns [`ParseError::EmptyRevision`] if `revision` is empty.
    pub fn new(
        locator: SourceLocator,
        revision: impl Into<String>,
        content_hash: ContentHash,
    ) -> Result<Self, ParseError> {
        let revision = revision.into();
        if revision.is_empty() {
            return Err(ParseError::EmptyRevision);
        }
        Ok(Self {
            locator,
            revision,
            content_hash,
        })
    }

    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }
}

impl fmt::Display for ResolvedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            SourceLocator::Repository { owner, repo, .. } => {
                write!(f, "{owner}/{repo}@{} ({})", self.revision, self.content_hash)
            }
            SourceLocator::Url { url } => write!(f, "{url} ({})", self.content_hash),
        }
    }
}
