//! Content digests for post-copy verification.
//!
//! Digests are an integrity check between a source file and its archived
//! copy, not a security boundary.

use std::path::Path;

use blake3::Hasher;

use agevault_core::{ArchiveError, Digest};

/// Compute the BLAKE3 digest of a file's full contents.
///
/// Large files are memory-mapped; small ones are read directly.
pub fn digest(path: impl AsRef<Path>) -> Result<Digest, ArchiveError> {
    let path = path.as_ref();
    let mut hasher = Hasher::new();
    hasher
        .update_mmap(path)
        .map_err(|e| ArchiveError::io(path, e))?;
    Ok(Digest::new(*hasher.finalize().as_bytes()))
}

/// Check whether two files currently hold identical contents.
pub fn equal(a: impl AsRef<Path>, b: impl AsRef<Path>) -> Result<bool, ArchiveError> {
    Ok(digest(a)?.to_hex() == digest(b)?.to_hex())
}
