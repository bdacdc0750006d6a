//! Unpacked source trees and their Nix archive (NAR) hash.
//!
//! `fetchFromGitHub` pins the hash of the *unpacked* tree, not of the
//! downloaded archive. This module rebuilds that tree from a zip archive in
//! memory and hashes its NAR serialization.

pub mod nar;

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use crate::hash::{ContentHash, ContentHasher};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;
const S_IXUSR: u32 = 0o100;

/// A file system node as NAR sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    File { executable: bool, contents: Vec<u8> },
    Symlink { target: String },
    Directory(BTreeMap<String, Node>),
}

impl Node {
    pub fn empty_dir() -> Self {
        Node::Directory(BTreeMap::new())
    }

    /// Hash of the NAR serialization of this node.
    pub fn nar_hash(&self) -> ContentHash {
        let mut hasher = ContentHasher::new();
        // Writing into a hasher cannot fail.
        let _ = nar::write_nar(&mut hasher, self);
        hasher.finish()
    }

    fn insert(&mut self, components: &[&str], leaf: Node) -> Result<(), String> {
        let Node::Directory(entries) = self else {
            return Err("path descends through a non-directory".to_string());
        };

        match components {
            [] => Err("empty path".to_string()),
            [name] => {
                match entries.get(*name) {
                    // Zips may list a directory after some of its children.
                    Some(Node::Directory(_)) if matches!(leaf, Node::Directory(_)) => {}
                    _ => {
                        entries.insert((*name).to_string(), leaf);
                    }
                }
                Ok(())
            }
            [name, rest @ ..] => entries
                .entry((*name).to_string())
                .or_insert_with(Node::empty_dir)
                .insert(rest, leaf),
        }
    }
}

/// Unpacks a zip archive the way `fetchzip` does.
///
/// The archive must contain exactly one top-level directory; its contents
/// become the root of the returned tree.
pub fn unpack_zip(bytes: &[u8]) -> Result<Node, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|source| source.to_string())?;
    let mut root = Node::empty_dir();

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|source| source.to_string())?;
        let name = file.name().to_string();
        let components: Vec<&str> = name
            .split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .collect();
        if components.is_empty() {
            continue;
        }
        if components.contains(&"..") {
            return Err(format!("archive entry '{name}' escapes the archive root"));
        }

        let mode = file.unix_mode().unwrap_or(0);
        let node = if file.is_dir() {
            Node::empty_dir()
        } else {
            let mut contents = Vec::with_capacity(capacity_hint(file.size(), bytes.len()));
            file.read_to_end(&mut contents)
                .map_err(|source| format!("failed reading '{name}': {source}"))?;
            if mode & S_IFMT == S_IFLNK {
                let target = String::from_utf8(contents)
                    .map_err(|_| format!("symlink '{name}' has a non UTF-8 target"))?;
                Node::Symlink { target }
            } else {
                Node::File {
                    executable: mode & S_IXUSR != 0,
                    contents,
                }
            }
        };

        root.insert(&components, node)
            .map_err(|message| format!("archive entry '{name}': {message}"))?;
    }

    strip_single_top_level(root)
}

/// Preallocation for an entry: its declared size, capped at the archive size.
fn capacity_hint(declared: u64, archive_len: usize) -> usize {
    usize::try_from(declared).map_or(archive_len, |size| size.min(archive_len))
}

fn strip_single_top_level(root: Node) -> Result<Node, String> {
    let Node::Directory(mut entries) = root else {
        return Err("archive root is not a directory".to_string());
    };
    if entries.len() != 1 {
        return Err(format!(
            "expected a single top-level directory in archive, found {} entries",
            entries.len()
        ));
    }

    match entries.pop_first() {
        Some((_, dir @ Node::Directory(_))) => Ok(dir),
        _ => Err("archive top-level entry is not a directory".to_string()),
    }
}
