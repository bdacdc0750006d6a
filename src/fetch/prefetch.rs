use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::archive;
use crate::error::FetchError;
use crate::hash::ContentHash;
use crate::remote::Transport;

const NIX_PREFETCH_URL: &str = "nix-prefetch-url";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What is hashed: the downloaded bytes, or the tree they unpack to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unpack {
    /// `fetchurl` semantics.
    Flat,
    /// `fetchzip` / `fetchFromGitHub` semantics.
    Tree,
}

/// Downloads a URL and produces its Nix content hash.
pub trait Prefetcher: Send + Sync {
    fn prefetch(&self, url: &str, unpack: Unpack) -> Result<ContentHash, FetchError>;
}

/// Downloads over HTTP and hashes in-process.
///
/// Tree hashing expects a zip archive.
pub struct BuiltinPrefetcher {
    transport: Arc<dyn Transport>,
}

impl BuiltinPrefetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Prefetcher for BuiltinPrefetcher {
    fn prefetch(&self, url: &str, unpack: Unpack) -> Result<ContentHash, FetchError> {
        let bytes = self.transport.get_bytes(url)?;
        match unpack {
            Unpack::Flat => Ok(ContentHash::of_bytes(&bytes)),
            Unpack::Tree => {
                let tree = archive::unpack_zip(&bytes).map_err(|message| {
                    FetchError::UnexpectedResponse {
                        url: url.to_string(),
                        message,
                    }
                })?;
                Ok(tree.nar_hash())
            }
        }
    }
}

/// Shells out to `nix-prefetch-url`, which also adds the result to the store.
///
/// With a timeout, a run that outlives it is killed and reported as a
/// network failure.
#[derive(Clone, Debug)]
pub struct NixPrefetchUrl {
    program: String,
    timeout: Option<Duration>,
}

impl Default for NixPrefetchUrl {
    fn default() -> Self {
        Self::with_program(NIX_PREFETCH_URL)
    }
}

impl NixPrefetchUrl {
    /// Uses a specific executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bounds the whole run, download included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn spawn_error(&self, source: std::io::Error) -> FetchError {
        FetchError::Prefetch {
            program: self.program.clone(),
            message: source.to_string(),
        }
    }

    fn wait(&self, child: &mut Child, url: &str) -> Result<ExitStatus, FetchError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(|source| self.spawn_error(source));
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(|source| self.spawn_error(source))? {
                return Ok(status);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::NetworkFailure {
                    url: url.to_string(),
                    message: format!("{} timed out after {:?}", self.program, timeout),
                });
            }
            thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }
}

impl Prefetcher for NixPrefetchUrl {
    fn prefetch(&self, url: &str, unpack: Unpack) -> Result<ContentHash, FetchError> {
        let mut command = Command::new(&self.program);
        if unpack == Unpack::Tree {
            command.arg("--unpack");
        }
        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(program = %self.program, url, ?unpack, "running prefetch");

        let mut child = command.spawn().map_err(|source| self.spawn_error(source))?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = self.wait(&mut child, url)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&collect(stderr)).trim().to_string();
            return Err(classify_failure(url, stderr));
        }

        let stdout = collect(stdout);
        let stdout = String::from_utf8_lossy(&stdout);
        let printed = stdout.lines().last().unwrap_or_default().trim();
        ContentHash::parse(printed).map_err(|_| FetchError::Prefetch {
            program: self.program.clone(),
            message: format!("unexpected output '{printed}'"),
        })
    }
}

/// Reads a child pipe to the end on its own thread so the child never
/// blocks on a full pipe while we poll it.
fn drain(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// `nix-prefetch-url` only tells us what went wrong through its stderr.
fn classify_failure(url: &str, stderr: String) -> FetchError {
    if stderr.contains("404") || stderr.contains("Not Found") {
        FetchError::NotFound {
            what: url.to_string(),
        }
    } else {
        FetchError::NetworkFailure {
            url: url.to_string(),
            message: stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct Bytes(Vec<u8>);

    impl Transport for Bytes {
        fn get_json(&self, url: &str) -> Result<Value, FetchError> {
            Err(FetchError::NotFound {
                what: url.to_string(),
            })
        }

        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn flat_prefetch_hashes_raw_bytes() {
        let prefetcher = BuiltinPrefetcher::new(Arc::new(Bytes(b"payload".to_vec())));
        let hash = prefetcher
            .prefetch("https://example.org/p", Unpack::Flat)
            .expect("prefetch");
        assert_eq!(hash, ContentHash::of_bytes(b"payload"));
    }

    #[test]
    fn tree_prefetch_rejects_non_archives() {
        let prefetcher = BuiltinPrefetcher::new(Arc::new(Bytes(b"not a zip".to_vec())));
        let err = prefetcher
            .prefetch("https://example.org/p.zip", Unpack::Tree)
            .expect_err("should fail");
        assert!(matches!(err, FetchError::UnexpectedResponse { .. }));
    }

    #[test]
    fn missing_program_is_a_prefetch_error() {
        let prefetcher = NixPrefetchUrl::with_program("nix-src-test-no-such-program");
        let err = prefetcher
            .prefetch("https://example.org/p", Unpack::Flat)
            .expect_err("should fail");
        assert!(matches!(err, FetchError::Prefetch { .. }));
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-prefetch");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[test]
    fn last_printed_line_is_the_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let expected = ContentHash::of_bytes(b"payload");
        let program = script(
            dir.path(),
            &format!("echo path is /nix/store/x-p >&2\necho {}", expected.to_hex()),
        );

        let hash = NixPrefetchUrl::with_program(program)
            .with_timeout(Duration::from_secs(30))
            .prefetch("https://example.org/p", Unpack::Flat)
            .expect("prefetch");
        assert_eq!(hash, expected);
    }

    #[cfg(unix)]
    #[test]
    fn hung_prefetch_is_killed_at_the_timeout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let program = script(dir.path(), "exec sleep 30");

        let start = Instant::now();
        let err = NixPrefetchUrl::with_program(program)
            .with_timeout(Duration::from_millis(200))
            .prefetch("https://example.org/p", Unpack::Tree)
            .expect_err("should time out");

        assert!(matches!(err, FetchError::NetworkFailure { .. }));
        assert!(err.is_retryable());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn prefetch_stderr_classification() {
        assert!(matches!(
            classify_failure("u", "error: unable to download 'u': HTTP error 404".to_string()),
            FetchError::NotFound { .. }
        ));
        assert!(classify_failure("u", "Could not resolve host".to_string()).is_retryable());
    }
}
