//! sha256 content hashes and the encodings Nix accepts for them.
//!
//! Hashes are compared by digest, so `sha256-<base64>`, 52-character Nix
//! base-32 and 64-character hex spellings of the same digest are equal.
//! Rendering always uses the SRI form.

use std::fmt;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::ParseError;

const DIGEST_LEN: usize = 32;
const NIX_BASE32_ALPHABET: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";
const SRI_PREFIX: &str = "sha256-";

/// A sha256 digest of some content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; DIGEST_LEN]);

impl ContentHash {
    pub fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(digest)
    }

    /// Hashes a byte slice in one go.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Parses any of the supported spellings.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let trimmed = text.trim();
        let invalid = || ParseError::InvalidHash {
            text: text.to_string(),
        };

        if let Some(encoded) = trimmed.strip_prefix(SRI_PREFIX) {
            let bytes = STANDARD.decode(encoded).map_err(|_| invalid())?;
            let digest: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| invalid())?;
            return Ok(Self(digest));
        }

        let bare = trimmed.strip_prefix("sha256:").unwrap_or(trimmed);
        match bare.len() {
            52 => nix_base32_decode(bare).map(Self).ok_or_else(invalid),
            64 => {
                let mut digest = [0u8; DIGEST_LEN];
                hex::decode_to_slice(bare, &mut digest).map_err(|_| invalid())?;
                Ok(Self(digest))
            }
            _ => Err(invalid()),
        }
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// `sha256-<base64>`, as used in `hash = ...` attributes.
    pub fn to_sri(&self) -> String {
        format!("{SRI_PREFIX}{}", STANDARD.encode(self.0))
    }

    /// The 52-character form printed by `nix-prefetch-url`.
    pub fn to_nix_base32(&self) -> String {
        nix_base32_encode(&self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sri())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_sri())
    }
}

/// Incremental hasher that can sit behind any `io::Write`.
#[derive(Default)]
pub struct ContentHasher(Sha256);

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> ContentHash {
        ContentHash(self.0.finalize().into())
    }
}

impl Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Nix's base-32: custom alphabet, least significant bits printed last.
fn nix_base32_encode(bytes: &[u8]) -> String {
    let len = (bytes.len() * 8).div_ceil(5);
    let mut out = String::with_capacity(len);

    for n in (0..len).rev() {
        let b = n * 5;
        let i = b / 8;
        let j = b % 8;
        let low = u16::from(bytes[i]) >> j;
        let high = bytes
            .get(i + 1)
            .map_or(0, |next| u16::from(*next) << (8 - j));
        let c = ((low | high) & 0x1f) as usize;
        out.push(NIX_BASE32_ALPHABET[c] as char);
    }

    out
}

fn nix_base32_decode(text: &str) -> Option<[u8; DIGEST_LEN]> {
    let chars = text.as_bytes();
    if chars.len() != (DIGEST_LEN * 8).div_ceil(5) {
        return None;
    }

    let mut out = [0u8; DIGEST_LEN];
    for n in 0..chars.len() {
        let c = chars[chars.len() - n - 1];
        let digit = NIX_BASE32_ALPHABET.iter().position(|&a| a == c)? as u16;
        let b = n * 5;
        let i = b / 8;
        let j = b % 8;
        out[i] |= (digit << j) as u8;
        let carry = digit >> (8 - j);
        if i + 1 < DIGEST_LEN {
            out[i + 1] |= carry as u8;
        } else if carry != 0 {
            return None;
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_HEX: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const EMPTY_SRI: &str = "sha256-47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";
    const EMPTY_BASE32: &str = "0mdqa9w1p6cmli6976v4wi0sw9r4p5prkj7lzfd1877wk11c9c73";

    #[test]
    fn empty_input_encodings() {
        let hash = ContentHash::of_bytes(b"");
        assert_eq!(hash.to_hex(), EMPTY_HEX);
        assert_eq!(hash.to_sri(), EMPTY_SRI);
        assert_eq!(hash.to_nix_base32(), EMPTY_BASE32);
    }

    #[test]
    fn all_spellings_parse_to_the_same_digest() {
        let expected = ContentHash::of_bytes(b"");
        for text in [
            EMPTY_HEX,
            EMPTY_SRI,
            EMPTY_BASE32,
            "sha256:0mdqa9w1p6cmli6976v4wi0sw9r4p5prkj7lzfd1877wk11c9c73",
        ] {
            assert_eq!(ContentHash::parse(text).expect(text), expected);
        }
    }

    #[test]
    fn base32_decode_inverts_encode() {
        let hash = ContentHash::of_bytes(b"nix-src");
        let decoded = ContentHash::parse(&hash.to_nix_base32()).expect("parse");
        assert_eq!(decoded, hash);
    }

    #[test]
    fn streaming_hasher_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        hasher.write_all(b"hello ").expect("write");
        hasher.write_all(b"world").expect("write");
        assert_eq!(hasher.finish(), ContentHash::of_bytes(b"hello world"));
    }

    #[test]
    fn hex_accepts_either_case_and_rejects_non_hex() {
        let expected = ContentHash::of_bytes(b"");
        let upper = EMPTY_HEX.to_uppercase();
        assert_eq!(ContentHash::parse(&upper).expect("uppercase hex"), expected);
        assert!(ContentHash::parse(&format!("{}zz", &EMPTY_HEX[..62])).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        for text in ["", "sha256-WRONG", "sha256-", "zz", &"e".repeat(52)] {
            assert!(ContentHash::parse(text).is_err(), "{text}");
        }
    }
}
