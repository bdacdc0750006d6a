use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::remote::github::{GithubApi, Tag, TAGS_PER_PAGE};
use crate::source::SourceLocator;
use crate::tracked::TrackedSource;
use crate::version::Version;

use super::{best_match, Updater, VersionStream};

const NAME: &str = "github";

/// Treats repository tags as releases.
///
/// Tag names are versions with an optional leading `v`; other tags are
/// skipped. The pinned revision is the tag name itself.
pub struct GithubUpdater {
    api: GithubApi,
}

impl GithubUpdater {
    pub fn new(api: GithubApi) -> Self {
        Self { api }
    }

    fn tags<'a>(
        &'a self,
        source: &TrackedSource,
    ) -> Result<impl Iterator<Item = Result<Tag, UpdateError>> + 'a, UpdateError> {
        let SourceLocator::Repository { owner, repo, .. } = &source.locator else {
            return Err(UpdateError::UnsupportedSource {
                updater: NAME.to_string(),
                source_name: source.name(),
                reason: "only owner/repo sources have tags".to_string(),
            });
        };

        Ok(TagPages {
            api: &self.api,
            owner: owner.clone(),
            repo: repo.clone(),
            next_page: 1,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }

    fn tagged_versions<'a>(
        &'a self,
        source: &TrackedSource,
    ) -> Box<dyn Iterator<Item = Result<(Version, Tag), UpdateError>> + 'a> {
        match self.tags(source) {
            Ok(tags) => Box::new(tags.filter_map(|tag| match tag {
                Ok(tag) => match tag_version(&tag.name) {
                    Some(version) => Some(Ok((version, tag))),
                    None => {
                        warn!(tag = %tag.name, "skipping tag that is not a version");
                        None
                    }
                },
                Err(err) => Some(Err(err)),
            })),
            Err(err) => Box::new(std::iter::once(Err(err))),
        }
    }
}

impl Updater for GithubUpdater {
    fn list_versions<'a>(&'a self, source: &'a TrackedSource) -> VersionStream<'a> {
        Box::new(
            self.tagged_versions(source)
                .map(|item| item.map(|(version, _)| version)),
        )
    }

    fn pin_version(
        &self,
        source: &TrackedSource,
        target: &Version,
    ) -> Result<SourceLocator, UpdateError> {
        let tag = best_match(self.tagged_versions(source), target)?.ok_or_else(|| {
            UpdateError::UnknownVersion {
                source_name: source.name(),
                version: target.to_string(),
            }
        })?;
        debug!(tag = %tag.name, commit = %tag.commit.sha, "pinned version to tag");
        Ok(source.locator.clone().with_revision(tag.name))
    }
}

/// Parses `v1.2.3` / `1.2.3` tag names.
pub fn tag_version(name: &str) -> Option<Version> {
    let bare = name.strip_prefix('v').unwrap_or(name);
    Version::parse(bare).ok()
}

/// Walks the paginated tag listing one page at a time.
struct TagPages<'a> {
    api: &'a GithubApi,
    owner: String,
    repo: String,
    next_page: usize,
    buffer: VecDeque<Tag>,
    exhausted: bool,
}

impl Iterator for TagPages<'_> {
    type Item = Result<Tag, UpdateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tag) = self.buffer.pop_front() {
                return Some(Ok(tag));
            }
            if self.exhausted {
                return None;
            }

            match self.api.tags_page(&self.owner, &self.repo, self.next_page) {
                Ok(page) => {
                    debug!(page = self.next_page, tags = page.len(), "listed tags");
                    self.exhausted = page.len() < TAGS_PER_PAGE;
                    self.next_page += 1;
                    self.buffer.extend(page);
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}
