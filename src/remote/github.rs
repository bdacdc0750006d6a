//! GitHub REST and archive endpoints.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;

use super::Transport;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_ARCHIVE_BASE: &str = "https://github.com";

/// Tags requested per page when listing releases.
pub const TAGS_PER_PAGE: usize = 100;

/// One entry of the `/tags` listing.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TagCommit {
    pub sha: String,
}

/// Client for the handful of GitHub endpoints pinning needs.
#[derive(Clone)]
pub struct GithubApi {
    transport: Arc<dyn Transport>,
    api_base: String,
    archive_base: String,
}

impl GithubApi {
    pub fn new(
        transport: Arc<dyn Transport>,
        api_base: impl Into<String>,
        archive_base: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            archive_base: archive_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Commit id currently at the head of `branch`.
    pub fn branch_head(&self, owner: &str, repo: &str, branch: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/git/refs/heads/{branch}",
            self.api_base
        );
        let body = self.transport.get_json(&url).map_err(|err| match err {
            FetchError::NotFound { .. } => branch_not_found(owner, repo, branch),
            other => other,
        })?;

        let wanted = format!("refs/heads/{branch}");
        let entry = match &body {
            // A partial ref name answers with every ref sharing the prefix.
            Value::Array(refs) => refs
                .iter()
                .find(|entry| entry.get("ref").and_then(Value::as_str) == Some(wanted.as_str()))
                .ok_or_else(|| branch_not_found(owner, repo, branch))?,
            other => other,
        };

        entry
            .get("object")
            .and_then(|object| object.get("sha"))
            .and_then(Value::as_str)
            .filter(|sha| !sha.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FetchError::UnexpectedResponse {
                url,
                message: "missing object.sha in ref".to_string(),
            })
    }

    /// One page (1-based) of the repository's tags.
    pub fn tags_page(&self, owner: &str, repo: &str, page: usize) -> Result<Vec<Tag>, FetchError> {
        let url = format!(
            "{}/repos/{owner}/{repo}/tags?per_page={TAGS_PER_PAGE}&page={page}",
            self.api_base
        );
        let body = self.transport.get_json(&url)?;
        serde_json::from_value(body).map_err(|source| FetchError::UnexpectedResponse {
            url,
            message: format!("invalid tag listing: {source}"),
        })
    }

    /// Archive URL `fetchFromGitHub` downloads for `revision`.
    pub fn tarball_url(&self, owner: &str, repo: &str, revision: &str) -> String {
        format!(
            "{}/{owner}/{repo}/archive/{revision}.tar.gz",
            self.archive_base
        )
    }

    /// Zip archive of the same tree, which we can unpack in memory.
    pub fn zipball_url(&self, owner: &str, repo: &str, revision: &str) -> String {
        format!("{}/{owner}/{repo}/archive/{revision}.zip", self.archive_base)
    }
}

fn branch_not_found(owner: &str, repo: &str, branch: &str) -> FetchError {
    FetchError::NotFound {
        what: format!("branch '{branch}' of {owner}/{repo}"),
    }
}
