//! Core types and configuration for agevault.
//!
//! This crate provides the pieces shared by every stage of an archival run:
//! the run configuration, exclusion rules, the error type, and the pure
//! mapping from source paths to their mirrored archive paths.

mod config;
mod entry;
mod error;
mod exclude;
mod paths;

pub use config::{ArchiveConfig, ArchiveConfigBuilder, DEFAULT_PROBLEMS_FILE, SECONDS_PER_DAY};
pub use entry::{Digest, PathPair, TraversalEntry};
pub use error::ArchiveError;
pub use exclude::{DEFAULT_EXCLUDED_FILE, DEFAULT_PROTECTED_MARKER, ExclusionSet};
pub use paths::{PathMapper, UNPRINTABLE_PATH, absolute_root, archive_path, normalize_root, printable};
