//! Hashing utilities

use std::fs::File;
use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};

/// Algorithm tag prefixed to every stable id
pub const STABLE_ID_ALGORITHM: &str = "sha1";

/// Hex digest of a byte slice
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Hex digest of a whole file, streamed from disk
pub fn sha1_file_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Create the stable id of a bundle file
///
/// The id only depends on the bundle bytes, so it survives renames and rescans.
///
/// # Returns
/// `"sha1:"` followed by 40 lowercase hex characters
pub fn create_stable_id(bundle: &Path) -> io::Result<String> {
    let digest = sha1_file_hex(bundle)?;
    Ok(format!("{}:{}", STABLE_ID_ALGORITHM, digest))
}
