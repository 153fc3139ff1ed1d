//! Exclusion rules consulted while walking and pruning.

use std::ffi::OsStr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ArchiveError;

/// Marker found in the names of DFS replication metadata folders.
pub const DEFAULT_PROTECTED_MARKER: &str = "DfsrPrivate";

/// Explorer thumbnail cache, never archived.
pub const DEFAULT_EXCLUDED_FILE: &str = "thumbs.db";

/// Name and path predicates that keep entries out of a run.
///
/// Matching is case-sensitive. Directories are excluded when their path
/// contains any protected marker; files are excluded when their name is
/// exactly one of the excluded file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionSet {
    /// Substrings identifying protected system-replication folders.
    #[serde(default = "default_markers")]
    pub protected_markers: Vec<String>,

    /// Literal file names that are never archived.
    #[serde(default = "default_file_names")]
    pub excluded_file_names: Vec<String>,
}

fn default_markers() -> Vec<String> {
    vec![DEFAULT_PROTECTED_MARKER.to_string()]
}

fn default_file_names() -> Vec<String> {
    vec![DEFAULT_EXCLUDED_FILE.to_string()]
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self {
            protected_markers: default_markers(),
            excluded_file_names: default_file_names(),
        }
    }
}

impl ExclusionSet {
    /// An exclusion set that excludes nothing.
    pub fn empty() -> Self {
        Self {
            protected_markers: Vec::new(),
            excluded_file_names: Vec::new(),
        }
    }

    /// Add a protected marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.protected_markers.push(marker.into());
        self
    }

    /// Add an excluded file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.excluded_file_names.push(name.into());
        self
    }

    /// Parse an exclusion set from TOML.
    ///
    /// ```toml
    /// protected_markers = ["DfsrPrivate"]
    /// excluded_file_names = ["thumbs.db", "desktop.ini"]
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Load an exclusion set from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ArchiveError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source).map_err(|e| ArchiveError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check whether a path lies in a protected system-replication folder.
    pub fn is_protected(&self, path: &Path) -> bool {
        if self.protected_markers.is_empty() {
            return false;
        }
        let text = path.to_string_lossy();
        self.protected_markers
            .iter()
            .any(|marker| !marker.is_empty() && text.contains(marker.as_str()))
    }

    /// Check whether a directory (and its whole subtree) must be skipped.
    pub fn excludes_dir(&self, path: &Path) -> bool {
        self.is_protected(path)
    }

    /// Check whether a file name is excluded from archival.
    pub fn excludes_file(&self, name: &OsStr) -> bool {
        self.excluded_file_names
            .iter()
            .any(|excluded| OsStr::new(excluded.as_str()) == name)
    }
}
