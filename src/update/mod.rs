//! Updater backends: enumerate upstream versions and pin one of them.
//!
//! - [`GithubUpdater`]: versions are repository tags (`v1.2.3` or `1.2.3`).
//! - [`CustomUpdater`]: versions come from the tracked file's `releases` table.

pub mod custom;
pub mod github;

pub use custom::CustomUpdater;
pub use github::GithubUpdater;

use crate::error::UpdateError;
use crate::fetch::Fetcher;
use crate::source::{ResolvedDescriptor, SourceLocator};
use crate::tracked::TrackedSource;
use crate::version::{sort_descending, Version};

/// Lazily produced versions. Calling `list_versions` again takes a fresh snapshot.
pub type VersionStream<'a> = Box<dyn Iterator<Item = Result<Version, UpdateError>> + 'a>;

/// A backend that knows which versions of a source exist.
pub trait Updater: Send + Sync {
    /// Available versions, in whatever order the backend reports them.
    fn list_versions<'a>(&'a self, source: &'a TrackedSource) -> VersionStream<'a>;

    /// Maps `target` to a fetchable locator with its revision set.
    fn pin_version(
        &self,
        source: &TrackedSource,
        target: &Version,
    ) -> Result<SourceLocator, UpdateError>;

    /// Pins `target` and hashes it with `fetcher`.
    fn get_version(
        &self,
        source: &TrackedSource,
        target: &Version,
        fetcher: &dyn Fetcher,
    ) -> Result<ResolvedDescriptor, UpdateError> {
        let locator = self.pin_version(source, target)?;
        let revision = locator
            .revision()
            .map(str::to_string)
            .unwrap_or_else(|| locator.to_string());
        let outcome = fetcher.fetch(&locator, &revision)?;
        Ok(ResolvedDescriptor::new(
            locator,
            revision,
            outcome.content_hash,
        )?)
    }
}

/// Collects a version stream, newest first.
pub fn versions_descending(stream: VersionStream<'_>) -> Result<Vec<Version>, UpdateError> {
    let mut versions = stream.collect::<Result<Vec<_>, _>>()?;
    sort_descending(&mut versions);
    Ok(versions)
}

/// Picks the newest version of `source`.
///
/// # Errors
/// [`UpdateError::NoVersions`] when the backend lists nothing.
pub fn select_latest(updater: &dyn Updater, source: &TrackedSource) -> Result<Version, UpdateError> {
    versions_descending(updater.list_versions(source))?
        .into_iter()
        .next()
        .ok_or_else(|| UpdateError::NoVersions {
            source_name: source.name(),
        })
}

/// Returns the best match for `target` among `candidates`.
///
/// An exact match (metadata included) wins over one that only shares the
/// numeric triple; among equal candidates the first one listed wins.
pub(crate) fn best_match<T>(
    candidates: impl IntoIterator<Item = Result<(Version, T), UpdateError>>,
    target: &Version,
) -> Result<Option<T>, UpdateError> {
    let mut fallback = None;
    for candidate in candidates {
        let (version, value) = candidate?;
        if version != *target {
            continue;
        }
        if version.metadata == target.metadata {
            return Ok(Some(value));
        }
        if fallback.is_none() {
            fallback = Some(value);
        }
    }
    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(items: &[&str]) -> Vec<Result<(Version, String), UpdateError>> {
        items
            .iter()
            .map(|text| Ok((Version::parse(text).expect("version"), text.to_string())))
            .collect()
    }

    #[test]
    fn best_match_prefers_exact_metadata() {
        let found = best_match(
            candidates(&["1.0.0+a", "1.0.0+b", "2.0.0"]),
            &Version::parse("1.0.0+b").expect("version"),
        )
        .expect("match");
        assert_eq!(found.as_deref(), Some("1.0.0+b"));
    }

    #[test]
    fn best_match_falls_back_to_triple() {
        let found = best_match(
            candidates(&["1.0.0+a", "1.0.0+b"]),
            &Version::new(1, 0, 0),
        )
        .expect("match");
        assert_eq!(found.as_deref(), Some("1.0.0+a"));
    }

    #[test]
    fn best_match_none_when_absent() {
        let found = best_match(candidates(&["1.0.0", "1.2.0"]), &Version::new(9, 9, 9))
            .expect("match");
        assert_eq!(found, None);
    }
}
