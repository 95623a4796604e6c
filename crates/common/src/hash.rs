//! Identifier hashing.
//!
//! An identifier is trimmed and hashed with SHA-256. The short digest that goes
//! into a filename is always a prefix of the full digest kept in the tracking
//! store, never a separately computed shorter hash.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const FULL_DIGEST_LEN: usize = 64;

/// Default number of hex characters substituted into a filename.
pub const DEFAULT_NUM_CHARS: usize = 16;

/// Full and short forms of an identifier digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    /// Complete hex-encoded digest.
    pub full: String,
    /// Prefix of `full` used in filenames.
    pub short: String,
}

/// Compute SHA256 hash of bytes.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Hash an identifier into its full and short digests.
///
/// Surrounding whitespace is not part of the identifier, so `" SHS-00-12345 "`
/// and `"SHS-00-12345"` produce the same digest.
pub fn encode(identifier: &str, num_chars: usize) -> Result<Digest> {
    check_num_chars(num_chars)?;

    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!(
            "identifier must be non-empty text, got {:?}",
            identifier
        )));
    }

    let full = sha256_str(trimmed);
    let short = full[..num_chars].to_string();
    Ok(Digest { full, short })
}

/// Hash an identifier given as raw bytes, rejecting anything that is not UTF-8 text.
pub fn encode_bytes(raw: &[u8], num_chars: usize) -> Result<Digest> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        Error::InvalidInput(format!("identifier is not valid UTF-8 text: {}", e))
    })?;
    encode(text, num_chars)
}

/// Validate a short digest length.
pub fn check_num_chars(num_chars: usize) -> Result<()> {
    if num_chars == 0 || num_chars > FULL_DIGEST_LEN {
        return Err(Error::InvalidInput(format!(
            "short digest length must be between 1 and {}, got {}",
            FULL_DIGEST_LEN, num_chars
        )));
    }
    Ok(())
}
