//! Values produced while walking and archiving a tree.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// BLAKE3 fingerprint of a file's bytes at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Create a new Digest from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the digest as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One directory visited by a walk, with its filtered children.
///
/// Names are sorted and already stripped of excluded entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalEntry {
    /// Directory being visited.
    pub path: PathBuf,
    /// Names of subdirectories (including symlinks to directories).
    pub dirs: Vec<OsString>,
    /// Names of everything else.
    pub files: Vec<OsString>,
}

impl TraversalEntry {
    /// Create an entry with no children.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dirs: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Full paths of the subdirectories.
    pub fn dir_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs.iter().map(|name| self.path.join(name))
    }

    /// Full paths of the files.
    pub fn file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|name| self.path.join(name))
    }

    /// Check whether the directory had no visible children.
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }
}

/// A source path and its mirrored archive path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPair {
    pub source: PathBuf,
    pub archive: PathBuf,
}

impl PathPair {
    /// Pair for a child name of both sides.
    pub fn child(&self, name: impl AsRef<Path>) -> Self {
        Self {
            source: self.source.join(name.as_ref()),
            archive: self.archive.join(name.as_ref()),
        }
    }
}
