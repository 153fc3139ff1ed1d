//! Error types for archival operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while archiving a tree.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path vanished between being listed and being acted on.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Creation target already exists.
    #[error("Already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A path cannot be mapped into the archive.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// An exclusion file could not be read or parsed.
    #[error("Bad configuration file {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

impl ArchiveError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Path the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::AlreadyExists { path }
            | Self::Io { path, .. }
            | Self::InvalidPath { path, .. }
            | Self::ConfigFile { path, .. } => Some(path),
            Self::InvalidConfig { .. } => None,
        }
    }

    /// True if the path disappeared mid-run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True if access to the path was denied.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// True if a creation target was already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
