//! Rendering resolved descriptors for consumption by build descriptions.
//!
//! Two formats are supported:
//! - `json`: a document with sorted keys and two-space indentation
//!   (`owner`, `repo`, `rev`, `sha256`, or `sha256`, `url` for URL sources).
//! - `nix`: a `fetchFromGitHub { ... }` / `fetchurl { ... }` expression.
//!
//! Both are pure and total over valid descriptors.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::NixSrcError;
use crate::source::{ResolvedDescriptor, SourceLocator};

/// Output format selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    #[default]
    Nix,
}

impl Format {
    /// Human-readable name for the format.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Nix => "nix",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = NixSrcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "nix" => Ok(Format::Nix),
            other => Err(NixSrcError::UnsupportedFormat(format!(
                "'{}' (supported: json, nix)",
                other
            ))),
        }
    }
}

/// Renders `descriptor` in `format`.
pub fn serialize(descriptor: &ResolvedDescriptor, format: Format) -> Vec<u8> {
    match format {
        Format::Json => to_json_string(descriptor).into_bytes(),
        Format::Nix => to_nix_string(descriptor).into_bytes(),
    }
}

/// The json document as a string, with a trailing newline.
pub fn to_json_string(descriptor: &ResolvedDescriptor) -> String {
    let mut document = Map::new();
    let hash = Value::String(descriptor.content_hash().to_string());

    // Inserted in key order so the output is sorted whichever map backs `Map`.
    match descriptor.locator() {
        SourceLocator::Repository { owner, repo, .. } => {
            document.insert("owner".to_string(), Value::String(owner.clone()));
            document.insert("repo".to_string(), Value::String(repo.clone()));
            document.insert(
                "rev".to_string(),
                Value::String(descriptor.revision().to_string()),
            );
            document.insert("sha256".to_string(), hash);
        }
        SourceLocator::Url { url } => {
            document.insert("sha256".to_string(), hash);
            document.insert("url".to_string(), Value::String(url.clone()));
        }
    }

    format!("{:#}\n", Value::Object(document))
}

/// The Nix expression snippet.
pub fn to_nix_string(descriptor: &ResolvedDescriptor) -> String {
    let hash = nix_string(&descriptor.content_hash().to_string());
    match descriptor.locator() {
        SourceLocator::Repository { owner, repo, .. } => format!(
            "fetchFromGitHub {{\n  owner  = {};\n  repo   = {};\n  rev    = {};\n  sha256 = {};\n}}\n",
            nix_string(owner),
            nix_string(repo),
            nix_string(descriptor.revision()),
            hash,
        ),
        SourceLocator::Url { url } => format!(
            "fetchurl {{\n  url    = {};\n  sha256 = {};\n}}\n",
            nix_string(url),
            hash,
        ),
    }
}

/// Quotes `value` as a Nix string literal.
///
/// Backslashes, quotes and `${` are escaped so nothing is interpolated.
fn nix_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ContentHash;

    const EMPTY_SRI: &str = "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

    fn repo_descriptor(rev: &str) -> ResolvedDescriptor {
        ResolvedDescriptor::new(
            SourceLocator::repository("NixOS", "nixpkgs"),
            rev,
            ContentHash::of_bytes(b""),
        )
        .expect("descriptor")
    }

    #[test]
    fn json_for_repository() {
        let json = to_json_string(&repo_descriptor("abc123"));
        assert_eq!(
            json,
            format!(
                "{{\n  \"owner\": \"NixOS\",\n  \"repo\": \"nixpkgs\",\n  \"rev\": \"abc123\",\n  \"sha256\": \"{EMPTY_SRI}\"\n}}\n"
            )
        );
    }

    #[test]
    fn json_for_url() {
        let descriptor = ResolvedDescriptor::new(
            SourceLocator::url("https://example.org/a.tar.gz"),
            "https://example.org/a.tar.gz",
            ContentHash::of_bytes(b""),
        )
        .expect("descriptor");
        let value: Value =
            serde_json::from_slice(&serialize(&descriptor, Format::Json)).expect("valid json");
        assert_eq!(value["url"], "https://example.org/a.tar.gz");
        assert_eq!(value["sha256"], EMPTY_SRI);
        assert_eq!(value.as_object().map(Map::len), Some(2));
    }

    #[test]
    fn nix_for_repository() {
        let nix = to_nix_string(&repo_descriptor("abc123"));
        assert_eq!(
            nix,
            format!(
                "fetchFromGitHub {{\n  owner  = \"NixOS\";\n  repo   = \"nixpkgs\";\n  rev    = \"abc123\";\n  sha256 = \"{EMPTY_SRI}\";\n}}\n"
            )
        );
    }

    #[test]
    fn nix_strings_are_escaped() {
        assert_eq!(nix_string(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(nix_string("${evil}"), r#""\${evil}""#);
        assert_eq!(nix_string("$HOME"), r#""$HOME""#);
        assert_eq!(nix_string("line\nbreak"), r#""line\nbreak""#);
    }

    #[test]
    fn json_escapes_revision() {
        let json = to_json_string(&repo_descriptor("tag\"with\\quote"));
        let value: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["rev"], "tag\"with\\quote");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("json".parse::<Format>().expect("json"), Format::Json);
        assert_eq!("nix".parse::<Format>().expect("nix"), Format::Nix);
        assert!("yaml".parse::<Format>().is_err());
    }
}
