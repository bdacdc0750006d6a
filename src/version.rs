//! Semantic-version-like values used to rank upstream releases.
//!
//! Ordering and equality look at `(major, minor, patch)` only. Two versions
//! that differ just in build metadata compare equal; that is a deliberate
//! simplification, metadata is carried for display and tie-breaking only.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ParseError;

/// `MAJOR.MINOR.PATCH[+METADATA]`.
#[derive(Clone, Debug)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub metadata: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Parses `MAJOR.MINOR.PATCH[+METADATA]`.
    ///
    /// Components are plain base-10 digits; signs, missing components and an
    /// empty metadata suffix are rejected.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidVersion {
            text: text.to_string(),
        };

        let (triple, metadata) = match text.split_once('+') {
            Some((_, "")) => return Err(invalid()),
            Some((triple, metadata)) => (triple, Some(metadata.to_string())),
            None => (text, None),
        };

        let mut parts = triple.split('.');
        let mut next = || -> Result<u64, ParseError> {
            let part = parts.next().ok_or_else(invalid)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            patch,
            metadata,
        })
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Rank used when picking the latest release.
    ///
    /// Equal triples fall back to the longer metadata string, then to plain
    /// lexicographic order.
    pub fn cmp_for_selection(&self, other: &Self) -> Ordering {
        self.cmp(other).then_with(|| {
            let left = self.metadata.as_deref().unwrap_or_default();
            let right = other.metadata.as_deref().unwrap_or_default();
            left.len().cmp(&right.len()).then_with(|| left.cmp(right))
        })
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(metadata) = &self.metadata {
            write!(f, "+{metadata}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

/// Sorts newest first, using [`Version::cmp_for_selection`].
pub fn sort_descending(versions: &mut [Version]) {
    versions.sort_by(|a, b| b.cmp_for_selection(a));
}
