use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A user input that could not be understood.
///
/// Parse errors are never retried: the same input will always fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed source reference '{text}' (expected owner/repo[@rev] or a URL)")]
    Malformed { text: String },

    #[error("invalid version '{text}' (expected MAJOR.MINOR.PATCH[+METADATA])")]
    InvalidVersion { text: String },

    #[error("invalid content hash '{text}'")]
    InvalidHash { text: String },

    #[error("a resolved descriptor needs a non-empty revision")]
    EmptyRevision,
}

/// Failure while talking to a remote backend or hashing what it served.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("network failure while fetching {url}: {message}")]
    NetworkFailure { url: String, message: String },

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("prefetch with '{program}' failed: {message}")]
    Prefetch { program: String, message: String },
}

impl FetchError {
    /// Only transient transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::NetworkFailure { .. })
    }
}

/// Failure of an updater backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("version {version} is not available for {source_name}")]
    UnknownVersion {
        source_name: String,
        version: String,
    },

    #[error("no versions available for {source_name}")]
    NoVersions { source_name: String },

    #[error("updater '{updater}' cannot track {source_name}: {reason}")]
    UnsupportedSource {
        updater: String,
        source_name: String,
        reason: String,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl UpdateError {
    /// Retryable only when an underlying fetch hit a network failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UpdateError::Fetch(source) if source.is_retryable())
    }
}

/// A backend name that the registry does not know about.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown {kind} backend '{name}' (known: {known})")]
    UnknownBackend {
        kind: BackendKind,
        name: String,
        known: String,
    },
}

/// Which half of the registry a lookup went to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Fetcher,
    Updater,
    RevisionResolver,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Fetcher => write!(f, "fetcher"),
            BackendKind::Updater => write!(f, "updater"),
            BackendKind::RevisionResolver => write!(f, "revision resolver"),
        }
    }
}

/// Stage of a resolution at which it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Lookup,
    BranchHead,
    Fetch,
    Update,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Lookup => "backend lookup",
            Stage::BranchHead => "branch head resolution",
            Stage::Fetch => "fetch",
            Stage::Update => "update",
        };
        f.write_str(name)
    }
}

/// The first failing stage of a resolution, with the reference it was working on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lookup(#[from] RegistryError),

    #[error("could not resolve branch '{branch}' of {reference}: {source}")]
    BranchHead {
        reference: String,
        branch: String,
        #[source]
        source: FetchError,
    },

    #[error("could not fetch {reference}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("could not update {reference}: {source}")]
    Update {
        reference: String,
        #[source]
        source: UpdateError,
    },
}

impl ResolveError {
    pub fn stage(&self) -> Stage {
        match self {
            ResolveError::Parse(_) => Stage::Parse,
            ResolveError::Lookup(_) => Stage::Lookup,
            ResolveError::BranchHead { .. } => Stage::BranchHead,
            ResolveError::Fetch { .. } => Stage::Fetch,
            ResolveError::Update { .. } => Stage::Update,
        }
    }

    /// The underlying fetch failure, if the failing stage talked to a remote.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            ResolveError::BranchHead { source, .. } | ResolveError::Fetch { source, .. } => {
                Some(source)
            }
            ResolveError::Update {
                source: UpdateError::Fetch(source),
                ..
            } => Some(source),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.fetch_error().is_some_and(FetchError::is_retryable)
    }
}

/// The main error type for nix-src operations.
#[derive(Debug, Error)]
pub enum NixSrcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to read tracked source {path}: {message}")]
    TrackedSource { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{failed} of {total} update(s) failed")]
    UpdatesFailed { failed: usize, total: usize },
}
