#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use nix_src::config::ResolverConfig;
use nix_src::error::FetchError;
use nix_src::registry::BackendRegistry;
use nix_src::remote::Transport;
use nix_src::Resolver;
use serde_json::Value;
use zip::write::SimpleFileOptions;

pub const API: &str = "https://api.test";
pub const ARCHIVES: &str = "https://archive.test";

/// An in-memory remote that records every request it serves.
#[derive(Default)]
pub struct FakeRemote {
    json: HashMap<String, Value>,
    bytes: HashMap<String, Vec<u8>>,
    flaky: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, url: impl Into<String>, body: Value) -> Self {
        self.json.insert(url.into(), body);
        self
    }

    pub fn with_bytes(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.bytes.insert(url.into(), body);
        self
    }

    /// The next `failures` requests to `url` fail with a network error.
    pub fn flaky(self, url: impl Into<String>, failures: u32) -> Self {
        self.flaky
            .lock()
            .expect("flaky lock")
            .insert(url.into(), failures);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests().iter().filter(|seen| *seen == url).count()
    }

    fn record(&self, url: &str) -> Result<(), FetchError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_string());
        let mut flaky = self.flaky.lock().expect("flaky lock");
        if let Some(remaining) = flaky.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::NetworkFailure {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Transport for FakeRemote {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.record(url)?;
        self.json.get(url).cloned().ok_or_else(|| FetchError::NotFound {
            what: url.to_string(),
        })
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.record(url)?;
        self.bytes.get(url).cloned().ok_or_else(|| FetchError::NotFound {
            what: url.to_string(),
        })
    }
}

pub fn test_config() -> ResolverConfig {
    ResolverConfig {
        api_url: API.to_string(),
        archive_url: ARCHIVES.to_string(),
        ..ResolverConfig::default()
    }
}

/// A resolver using the standard backends on top of `remote`.
pub fn resolver(remote: &Arc<FakeRemote>) -> Resolver {
    let transport: Arc<dyn Transport> = remote.clone();
    Resolver::new(BackendRegistry::with_transport(&test_config(), transport))
}

pub fn refs_url(owner: &str, repo: &str, branch: &str) -> String {
    format!("{API}/repos/{owner}/{repo}/git/refs/heads/{branch}")
}

pub fn tags_url(owner: &str, repo: &str, page: usize) -> String {
    format!("{API}/repos/{owner}/{repo}/tags?per_page=100&page={page}")
}

pub fn zipball_url(owner: &str, repo: &str, revision: &str) -> String {
    format!("{ARCHIVES}/{owner}/{repo}/archive/{revision}.zip")
}

pub fn branch_ref(branch: &str, sha: &str) -> Value {
    serde_json::json!({
        "ref": format!("refs/heads/{branch}"),
        "object": { "sha": sha, "type": "commit" }
    })
}

pub fn tag_listing(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .enumerate()
            .map(|(idx, name)| serde_json::json!({ "name": name, "commit": { "sha": format!("c{idx}") } }))
            .collect(),
    )
}

/// A GitHub-style source archive: every file below one `{repo}-{rev}/` directory.
pub fn source_zip(top: &str, files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().unix_permissions(0o644);
    writer
        .add_directory(format!("{top}/"), options)
        .expect("add top-level dir");
    for (name, contents) in files {
        writer
            .start_file(format!("{top}/{name}"), options)
            .expect("start file");
        writer.write_all(contents).expect("write file");
    }
    writer.finish().expect("finish zip").into_inner()
}
