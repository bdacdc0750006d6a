//! Resolution orchestration: reference in, pinned descriptor out.
//!
//! parse -> (branch head, when no revision was given) -> fetch -> verify ->
//! descriptor. Each stage runs strictly after the previous one; the first
//! failure is returned tagged with its stage. Independent resolutions share
//! nothing mutable and may run in parallel.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ResolverConfig, DEFAULT_BRANCH};
use crate::error::{FetchError, RegistryError, ResolveError, UpdateError};
use crate::fetch::{verify, Fetcher};
use crate::registry::{BackendRegistry, CUSTOM_BACKEND};
use crate::source::{parse_reference, ResolvedDescriptor, SourceLocator, GITHUB_BACKEND};
use crate::tracked::TrackedSource;
use crate::update::{select_latest, versions_descending};
use crate::version::Version;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// One independent resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveRequest {
    pub reference: String,
    pub branch: String,
    pub expected_hash: Option<String>,
}

impl ResolveRequest {
    pub fn new(reference: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            branch: branch.into(),
            expected_hash: None,
        }
    }

    pub fn expecting(mut self, hash: impl Into<String>) -> Self {
        self.expected_hash = Some(hash.into());
        self
    }
}

/// The single entry point callers use to pin sources.
#[derive(Clone)]
pub struct Resolver {
    registry: BackendRegistry,
    retries: u32,
    retry_delay: Duration,
}

impl Resolver {
    /// A resolver that never retries.
    pub fn new(registry: BackendRegistry) -> Self {
        Self {
            registry,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Standard backends and retry policy from `config`.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(BackendRegistry::standard(config)).with_retries(config.retries)
    }

    /// Retry network failures up to `retries` extra times.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Pause between attempts, multiplied by the attempt number.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Resolves and pins `reference`.
    ///
    /// `branch` is only consulted when the reference has no revision. When
    /// `expected_hash` is given, a different computed hash is a hard
    /// [`FetchError::HashMismatch`].
    pub fn resolve(
        &self,
        reference: &str,
        branch: &str,
        expected_hash: Option<&str>,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let locator = parse_reference(reference)?;
        self.resolve_locator(locator, branch, expected_hash)
    }

    /// [`Resolver::resolve`] for an already parsed locator.
    pub fn resolve_locator(
        &self,
        locator: SourceLocator,
        branch: &str,
        expected_hash: Option<&str>,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let fetcher = self.registry.fetcher_for(&locator)?;
        self.resolve_with(locator, fetcher, branch, expected_hash)
    }

    fn resolve_with(
        &self,
        locator: SourceLocator,
        fetcher: Arc<dyn Fetcher>,
        branch: &str,
        expected_hash: Option<&str>,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let reference = locator.to_string();

        let revision = match &locator {
            SourceLocator::Repository {
                revision: Some(revision),
                ..
            } => revision.clone(),
            SourceLocator::Repository { revision: None, .. } => {
                let resolver = self.registry.revision_resolver_for(&locator)?;
                self.retrying(&reference, || {
                    resolver.resolve_branch_head(&locator, branch)
                })
                .map_err(|source| ResolveError::BranchHead {
                    reference: reference.clone(),
                    branch: branch.to_string(),
                    source,
                })?
            }
            SourceLocator::Url { url } => url.clone(),
        };
        debug!(%reference, %revision, "fetching");

        let outcome = self
            .retrying(&reference, || fetcher.fetch(&locator, &revision))
            .and_then(|outcome| verify(expected_hash, &outcome.content_hash).map(|()| outcome))
            .map_err(|source| ResolveError::Fetch {
                reference: reference.clone(),
                source,
            })?;

        let descriptor = ResolvedDescriptor::new(locator, revision, outcome.content_hash)?;
        info!(%descriptor, url = %outcome.canonical_url, "pinned");
        Ok(descriptor)
    }

    /// Resolves every request in parallel, one result per request, in order.
    pub fn resolve_many(
        &self,
        requests: &[ResolveRequest],
    ) -> Vec<Result<ResolvedDescriptor, ResolveError>> {
        requests
            .par_iter()
            .map(|request| {
                self.resolve(
                    &request.reference,
                    &request.branch,
                    request.expected_hash.as_deref(),
                )
            })
            .collect()
    }

    /// Available versions of a tracked source, newest first.
    pub fn versions(&self, tracked: &TrackedSource) -> Result<Vec<Version>, ResolveError> {
        let updater = self.registry.updater(updater_name(tracked))?;
        let reference = tracked.name();
        self.retrying(&reference, || versions_descending(updater.list_versions(tracked)))
            .map_err(|source| ResolveError::Update { reference, source })
    }

    /// Pins `version` of a tracked source through its updater.
    pub fn get_version(
        &self,
        tracked: &TrackedSource,
        version: &Version,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        let updater = self.registry.updater(updater_name(tracked))?;
        let fetcher = self.fetcher_for(tracked)?;
        let reference = tracked.name();
        self.retrying(&reference, || {
            updater.get_version(tracked, version, fetcher.as_ref())
        })
        .map_err(|source| ResolveError::Update { reference, source })
    }

    /// Refreshes a tracked source.
    ///
    /// With an updater or an explicit `target`, pins `target` (or the newest
    /// version). Otherwise follows the tracked branch, or re-hashes the URL.
    pub fn update(
        &self,
        tracked: &TrackedSource,
        target: Option<&Version>,
    ) -> Result<ResolvedDescriptor, ResolveError> {
        if tracked.updater.is_none() && target.is_none() {
            let branch = tracked.branch.as_deref().unwrap_or(DEFAULT_BRANCH);
            let locator = match &tracked.locator {
                SourceLocator::Repository { owner, repo, .. } => {
                    SourceLocator::repository(owner.clone(), repo.clone())
                }
                url @ SourceLocator::Url { .. } => url.clone(),
            };
            let fetcher = self.fetcher_for(tracked)?;
            return self.resolve_with(locator, fetcher, branch, None);
        }

        let version = match target {
            Some(version) => version.clone(),
            None => {
                let updater = self.registry.updater(updater_name(tracked))?;
                let reference = tracked.name();
                self.retrying(&reference, || select_latest(updater.as_ref(), tracked))
                    .map_err(|source| ResolveError::Update { reference, source })?
            }
        };
        debug!(source = %tracked.name(), %version, "selected version");
        self.get_version(tracked, &version)
    }

    /// Updates every tracked source in parallel, one result per source, in order.
    pub fn update_many(
        &self,
        tracked: &[TrackedSource],
        target: Option<&Version>,
    ) -> Vec<Result<ResolvedDescriptor, ResolveError>> {
        tracked
            .par_iter()
            .map(|source| self.update(source, target))
            .collect()
    }

    /// The tracked `fetcher` key when set, else the default for the shape.
    fn fetcher_for(&self, tracked: &TrackedSource) -> Result<Arc<dyn Fetcher>, RegistryError> {
        match &tracked.fetcher {
            Some(name) => self.registry.fetcher(name),
            None => self.registry.fetcher_for(&tracked.locator),
        }
    }

    fn retrying<T, E: Retryable + std::fmt::Display>(
        &self,
        reference: &str,
        mut attempt: impl FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let mut failures = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && failures < self.retries => {
                    failures += 1;
                    warn!(%reference, error = %err, attempt = failures, "retrying after network failure");
                    thread::sleep(self.retry_delay * failures);
                }
                result => return result,
            }
        }
    }
}

/// Failures worth another attempt.
trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        FetchError::is_retryable(self)
    }
}

impl Retryable for UpdateError {
    fn is_retryable(&self) -> bool {
        UpdateError::is_retryable(self)
    }
}

/// Repositories default to their tags, URL sources to the release table.
fn updater_name(tracked: &TrackedSource) -> &str {
    match (&tracked.updater, &tracked.locator) {
        (Some(name), _) => name.as_str(),
        (None, SourceLocator::Repository { .. }) => GITHUB_BACKEND,
        (None, SourceLocator::Url { .. }) => CUSTOM_BACKEND,
    }
}
