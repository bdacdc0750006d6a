use crate::error::{ParseError, UpdateError};
use crate::source::{parse_reference, SourceLocator};
use crate::tracked::TrackedSource;
use crate::version::Version;

use super::{best_match, Updater, VersionStream};

/// Releases listed by hand in the tracked file.
///
/// Each `releases` entry maps a version to a revision for repository
/// sources, or to a download URL for URL sources.
#[derive(Clone, Copy, Debug, Default)]
pub struct CustomUpdater;

impl CustomUpdater {
    fn releases<'a>(
        source: &'a TrackedSource,
    ) -> impl Iterator<Item = Result<(Version, &'a str), UpdateError>> + 'a {
        source
            .releases
            .iter()
            .map(|(version, target)| -> Result<(Version, &'a str), UpdateError> {
                Ok((Version::parse(version)?, target.as_str()))
            })
    }
}

impl Updater for CustomUpdater {
    fn list_versions<'a>(&'a self, source: &'a TrackedSource) -> VersionStream<'a> {
        Box::new(Self::releases(source).map(|item| item.map(|(version, _)| version)))
    }

    fn pin_version(
        &self,
        source: &TrackedSource,
        target: &Version,
    ) -> Result<SourceLocator, UpdateError> {
        let release = best_match(Self::releases(source), target)?.ok_or_else(|| {
            UpdateError::UnknownVersion {
                source_name: source.name(),
                version: target.to_string(),
            }
        })?;

        match &source.locator {
            SourceLocator::Repository { .. } => {
                Ok(source.locator.clone().with_revision(release))
            }
            SourceLocator::Url { .. } => match parse_reference(release)? {
                url @ SourceLocator::Url { .. } => Ok(url),
                SourceLocator::Repository { .. } => Err(ParseError::Malformed {
                    text: release.to_string(),
                }
                .into()),
            },
        }
    }
}
