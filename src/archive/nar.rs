//! NAR serialization.
//!
//! Every token is a length-prefixed string: little-endian `u64` length, the
//! bytes, then zero padding up to a multiple of eight. Directory entries are
//! written in byte order of their names, which `BTreeMap<String, _>` gives us.

use std::io::{self, Write};

use super::Node;

const MAGIC: &str = "nix-archive-1";

/// Writes `node` as a complete NAR.
pub fn write_nar<W: Write>(out: &mut W, node: &Node) -> io::Result<()> {
    write_str(out, MAGIC.as_bytes())?;
    write_node(out, node)
}

fn write_node<W: Write>(out: &mut W, node: &Node) -> io::Result<()> {
    write_str(out, b"(")?;
    match node {
        Node::File {
            executable,
            contents,
        } => {
            write_str(out, b"type")?;
            write_str(out, b"regular")?;
            if *executable {
                write_str(out, b"executable")?;
                write_str(out, b"")?;
            }
            write_str(out, b"contents")?;
            write_str(out, contents)?;
        }
        Node::Symlink { target } => {
            write_str(out, b"type")?;
            write_str(out, b"symlink")?;
            write_str(out, b"target")?;
            write_str(out, target.as_bytes())?;
        }
        Node::Directory(entries) => {
            write_str(out, b"type")?;
            write_str(out, b"directory")?;
            for (name, child) in entries {
                write_str(out, b"entry")?;
                write_str(out, b"(")?;
                write_str(out, b"name")?;
                write_str(out, name.as_bytes())?;
                write_str(out, b"node")?;
                write_node(out, child)?;
                write_str(out, b")")?;
            }
        }
    }
    write_str(out, b")")
}

fn write_str<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(&(bytes.len() as u64).to_le_bytes())?;
    out.write_all(bytes)?;
    let padding = (8 - bytes.len() % 8) % 8;
    out.write_all(&[0u8; 8][..padding])
}
