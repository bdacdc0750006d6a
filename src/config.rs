//! Resolver configuration.
//!
//! The CLI fills this from flags with environment fallbacks; library users
//! start from [`ResolverConfig::default`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::remote::github::{DEFAULT_API_BASE, DEFAULT_ARCHIVE_BASE};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_BRANCH: &str = "master";

/// How content hashes are computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashStrategy {
    /// Download and hash in-process.
    #[default]
    Builtin,
    /// Run `nix-prefetch-url`, which also populates the local store.
    NixPrefetchUrl,
}

impl HashStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            HashStrategy::Builtin => "builtin",
            HashStrategy::NixPrefetchUrl => "nix-prefetch-url",
        }
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(HashStrategy::Builtin),
            "nix-prefetch-url" => Ok(HashStrategy::NixPrefetchUrl),
            other => Err(format!(
                "unknown hasher '{other}' (supported: builtin, nix-prefetch-url)"
            )),
        }
    }
}

/// Settings shared by every resolution in a process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// GitHub REST API base.
    pub api_url: String,
    /// Host serving `/{owner}/{repo}/archive/{rev}` downloads.
    pub archive_url: String,
    /// Deadline for a single HTTP request.
    pub timeout: Duration,
    /// Extra attempts after a network failure.
    pub retries: u32,
    pub hash_strategy: HashStrategy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_BASE.to_string(),
            archive_url: DEFAULT_ARCHIVE_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            hash_strategy: HashStrategy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_github() {
        let config = ResolverConfig::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.archive_url, "https://github.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.hash_strategy, HashStrategy::Builtin);
    }

    #[test]
    fn hash_strategy_names_round_trip() {
        for strategy in [HashStrategy::Builtin, HashStrategy::NixPrefetchUrl] {
            assert_eq!(strategy.name().parse::<HashStrategy>(), Ok(strategy));
        }
        assert!("md5".parse::<HashStrategy>().is_err());
    }
}
