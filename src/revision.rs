//! Branch-head lookup for sources given without an explicit revision.

use tracing::debug;

use crate::error::FetchError;
use crate::remote::github::GithubApi;
use crate::source::SourceLocator;

/// Maps a branch name to the commit currently at its head.
///
/// A lookup is read-only. Two calls may disagree only because the branch
/// moved upstream in between.
pub trait RevisionResolver: Send + Sync {
    fn resolve_branch_head(
        &self,
        locator: &SourceLocator,
        branch: &str,
    ) -> Result<String, FetchError>;
}

/// Reads `object.sha` from the GitHub refs endpoint.
pub struct GithubRevisionResolver {
    api: GithubApi,
}

impl GithubRevisionResolver {
    pub fn new(api: GithubApi) -> Self {
        Self { api }
    }
}

impl RevisionResolver for GithubRevisionResolver {
    fn resolve_branch_head(
        &self,
        locator: &SourceLocator,
        branch: &str,
    ) -> Result<String, FetchError> {
        let SourceLocator::Repository { owner, repo, .. } = locator else {
            return Err(FetchError::NotFound {
                what: format!("branch '{branch}' of {locator} (URL sources have no branches)"),
            });
        };

        let sha = self.api.branch_head(owner, repo, branch)?;
        debug!(%locator, branch, %sha, "resolved branch head");
        Ok(sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::Transport;
    use serde_json::Value;
    use std::sync::Arc;

    struct Refs;

    impl Transport for Refs {
        fn get_json(&self, url: &str) -> Result<Value, FetchError> {
            match url {
                "https://api.test/repos/o/r/git/refs/heads/main" => {
                    Ok(serde_json::json!({"ref": "refs/heads/main", "object": {"sha": "f00d"}}))
                }
                "https://api.test/repos/o/r/git/refs/heads/flaky" => {
                    Err(FetchError::NetworkFailure {
                        url: url.to_string(),
                        message: "connection reset".to_string(),
                    })
                }
                _ => Err(FetchError::NotFound {
                    what: url.to_string(),
                }),
            }
        }

        fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::NotFound {
                what: url.to_string(),
            })
        }
    }

    fn resolver() -> GithubRevisionResolver {
        GithubRevisionResolver::new(GithubApi::new(
            Arc::new(Refs),
            "https://api.test",
            "https://gh.test",
        ))
    }

    #[test]
    fn resolves_existing_branch() {
        let sha = resolver()
            .resolve_branch_head(&SourceLocator::repository("o", "r"), "main")
            .expect("resolve");
        assert_eq!(sha, "f00d");
    }

    #[test]
    fn missing_branch_differs_from_network_failure() {
        let locator = SourceLocator::repository("o", "r");
        let missing = resolver()
            .resolve_branch_head(&locator, "gone")
            .expect_err("missing");
        assert!(matches!(missing, FetchError::NotFound { .. }));

        let flaky = resolver()
            .resolve_branch_head(&locator, "flaky")
            .expect_err("flaky");
        assert!(flaky.is_retryable());
    }
}
