//! The backend registry: backend names mapped to their implementations.
//!
//! Built once at startup and never mutated afterwards; every lookup of an
//! unknown name is a configuration error.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{HashStrategy, ResolverConfig};
use crate::error::{BackendKind, RegistryError};
use crate::fetch::{
    BuiltinPrefetcher, Fetcher, GithubFetcher, NixPrefetchUrl, Prefetcher, UrlFetcher,
};
use crate::remote::github::GithubApi;
use crate::remote::{HttpTransport, Transport};
use crate::revision::{GithubRevisionResolver, RevisionResolver};
use crate::source::{SourceLocator, GITHUB_BACKEND, URL_BACKEND};
use crate::update::{CustomUpdater, GithubUpdater, Updater};

/// Backend name of the hand-maintained release table updater.
pub const CUSTOM_BACKEND: &str = "custom";

/// Immutable name-to-backend tables.
#[derive(Clone)]
pub struct BackendRegistry {
    fetchers: BTreeMap<String, Arc<dyn Fetcher>>,
    updaters: BTreeMap<String, Arc<dyn Updater>>,
    revision_resolvers: BTreeMap<String, Arc<dyn RevisionResolver>>,
}

impl BackendRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The standard backends talking to real remotes.
    pub fn standard(config: &ResolverConfig) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.timeout));
        Self::with_transport(config, transport)
    }

    /// The standard backends on top of a caller-supplied transport.
    pub fn with_transport(config: &ResolverConfig, transport: Arc<dyn Transport>) -> Self {
        let prefetcher: Arc<dyn Prefetcher> = match config.hash_strategy {
            HashStrategy::Builtin => Arc::new(BuiltinPrefetcher::new(transport.clone())),
            HashStrategy::NixPrefetchUrl => {
                Arc::new(NixPrefetchUrl::default().with_timeout(config.timeout))
            }
        };
        let api = GithubApi::new(transport, &config.api_url, &config.archive_url);

        Self::builder()
            .fetcher(
                GITHUB_BACKEND,
                GithubFetcher::new(api.clone(), prefetcher.clone()),
            )
            .fetcher(URL_BACKEND, UrlFetcher::new(prefetcher))
            .revision_resolver(GITHUB_BACKEND, GithubRevisionResolver::new(api.clone()))
            .updater(GITHUB_BACKEND, GithubUpdater::new(api))
            .updater(CUSTOM_BACKEND, CustomUpdater)
            .build()
    }

    pub fn fetcher(&self, name: &str) -> Result<Arc<dyn Fetcher>, RegistryError> {
        lookup(&self.fetchers, BackendKind::Fetcher, name)
    }

    /// The fetcher serving `locator`'s shape.
    pub fn fetcher_for(&self, locator: &SourceLocator) -> Result<Arc<dyn Fetcher>, RegistryError> {
        self.fetcher(locator.backend())
    }

    pub fn updater(&self, name: &str) -> Result<Arc<dyn Updater>, RegistryError> {
        lookup(&self.updaters, BackendKind::Updater, name)
    }

    pub fn revision_resolver_for(
        &self,
        locator: &SourceLocator,
    ) -> Result<Arc<dyn RevisionResolver>, RegistryError> {
        lookup(
            &self.revision_resolvers,
            BackendKind::RevisionResolver,
            locator.backend(),
        )
    }
}

fn lookup<T: ?Sized>(
    table: &BTreeMap<String, Arc<T>>,
    kind: BackendKind,
    name: &str,
) -> Result<Arc<T>, RegistryError> {
    table
        .get(name)
        .cloned()
        .ok_or_else(|| RegistryError::UnknownBackend {
            kind,
            name: name.to_string(),
            known: table.keys().cloned().collect::<Vec<_>>().join(", "),
        })
}

/// Collects backends before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    fetchers: BTreeMap<String, Arc<dyn Fetcher>>,
    updaters: BTreeMap<String, Arc<dyn Updater>>,
    revision_resolvers: BTreeMap<String, Arc<dyn RevisionResolver>>,
}

impl RegistryBuilder {
    pub fn fetcher(mut self, name: &str, fetcher: impl Fetcher + 'static) -> Self {
        self.fetchers.insert(name.to_string(), Arc::new(fetcher));
        self
    }

    pub fn updater(mut self, name: &str, updater: impl Updater + 'static) -> Self {
        self.updaters.insert(name.to_string(), Arc::new(updater));
        self
    }

    pub fn revision_resolver(
        mut self,
        name: &str,
        resolver: impl RevisionResolver + 'static,
    ) -> Self {
        self.revision_resolvers
            .insert(name.to_string(), Arc::new(resolver));
        self
    }

    pub fn build(self) -> BackendRegistry {
        BackendRegistry {
            fetchers: self.fetchers,
            updaters: self.updaters,
            revision_resolvers: self.revision_resolvers,
        }
    }
}
