//! Tracked sources: `*.src.json` files kept next to build descriptions.
//!
//! The file is the json descriptor document plus optional keys telling the
//! `update` command how to refresh it: `branch`, `fetcher`, `updater` and
//! `releases`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::NixSrcError;
use crate::source::{parse_reference, ResolvedDescriptor, SourceLocator};

const SRC_JSON_SUFFIX: &str = ".src.json";
const DEFAULT_SRC_JSON: &str = "default.src.json";

/// A source whose pin is kept up to date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedSource {
    /// Carries the currently pinned revision, if any.
    pub locator: SourceLocator,
    pub branch: Option<String>,
    /// Fetcher backend name; `None` picks the default for the locator's shape.
    pub fetcher: Option<String>,
    /// Updater backend name; `None` means "follow the branch" (or re-hash the URL).
    pub updater: Option<String>,
    /// Version to revision (or URL) table for the custom updater.
    pub releases: BTreeMap<String, String>,
    /// Hash recorded at the last pin, verbatim.
    pub content_hash: Option<String>,
}

/// On-disk layout. Fields are declared in key order so output stays sorted.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TrackedFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetcher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    releases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updater: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl TrackedSource {
    pub fn new(locator: SourceLocator) -> Self {
        Self {
            locator,
            branch: None,
            fetcher: None,
            updater: None,
            releases: BTreeMap::new(),
            content_hash: None,
        }
    }

    /// `owner/repo` or the URL.
    pub fn name(&self) -> String {
        self.locator.display_name()
    }

    /// Reads a tracked source from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let file: TrackedFile = serde_json::from_str(json).map_err(|source| source.to_string())?;

        let locator = match (&file.owner, &file.repo, &file.url) {
            (Some(owner), Some(repo), None) => {
                let locator = parse_reference(&format!("{owner}/{repo}"))
                    .map_err(|source| source.to_string())?;
                match &file.rev {
                    Some(rev) => locator.with_revision(rev.clone()),
                    None => locator,
                }
            }
            (None, None, Some(url)) => match parse_reference(url) {
                Ok(locator @ SourceLocator::Url { .. }) => locator,
                _ => return Err(format!("'{url}' is not a well-formed URL")),
            },
            _ => {
                return Err("expected either owner and repo, or url".to_string());
            }
        };

        Ok(Self {
            locator,
            branch: file.branch,
            fetcher: file.fetcher,
            updater: file.updater,
            releases: file.releases,
            content_hash: file.sha256,
        })
    }

    /// Reads a tracked source from `path`.
    pub fn load(path: &Path) -> Result<Self, NixSrcError> {
        let json = fs::read_to_string(path).map_err(|source| NixSrcError::TrackedSource {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;
        Self::from_json_str(&json).map_err(|message| NixSrcError::TrackedSource {
            path: path.to_path_buf(),
            message,
        })
    }

    /// This source re-pinned to `descriptor`, keeping the tracking keys.
    pub fn repinned(&self, descriptor: &ResolvedDescriptor) -> Self {
        let locator = match descriptor.locator() {
            SourceLocator::Repository { .. } => descriptor
                .locator()
                .clone()
                .with_revision(descriptor.revision()),
            url @ SourceLocator::Url { .. } => url.clone(),
        };
        Self {
            locator,
            content_hash: Some(descriptor.content_hash().to_string()),
            ..self.clone()
        }
    }

    /// Pretty JSON with sorted keys and two-space indentation.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        let mut file = TrackedFile {
            branch: self.branch.clone(),
            fetcher: self.fetcher.clone(),
            releases: self.releases.clone(),
            sha256: self.content_hash.clone(),
            updater: self.updater.clone(),
            ..TrackedFile::default()
        };
        match &self.locator {
            SourceLocator::Repository {
                owner,
                repo,
                revision,
            } => {
                file.owner = Some(owner.clone());
                file.repo = Some(repo.clone());
                file.rev = revision.clone();
            }
            SourceLocator::Url { url } => file.url = Some(url.clone()),
        }

        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');
        Ok(json)
    }

    /// Writes this source to `path`.
    pub fn store(&self, path: &Path) -> Result<(), NixSrcError> {
        let json = self
            .to_json_string()
            .map_err(|source| NixSrcError::TrackedSource {
                path: path.to_path_buf(),
                message: source.to_string(),
            })?;
        fs::write(path, json).map_err(|source| NixSrcError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fuzz-only entrypoint: parse raw bytes and re-render whatever parses.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_tracked(data: &[u8]) -> Result<String, String> {
    let json = std::str::from_utf8(data).map_err(|source| source.to_string())?;
    let tracked = TrackedSource::from_json_str(json)?;
    tracked.to_json_string().map_err(|source| source.to_string())
}

/// Finds the `.src.json` that belongs to `path`.
///
/// - `foo.src.json` is used as is.
/// - `foo.nix` maps to `foo.src.json`.
/// - anything else is treated as a directory holding `default.src.json`.
pub fn path_to_src_json(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text.ends_with(SRC_JSON_SUFFIX) {
        return path.to_path_buf();
    }
    if let Some(stem) = text.strip_suffix(".nix") {
        return PathBuf::from(format!("{stem}{SRC_JSON_SUFFIX}"));
    }
    path.join(DEFAULT_SRC_JSON)
}
