//! Directory walking for agevault.
//!
//! `agevault-scan` visits a tree one directory at a time and hands each
//! visit to the caller as a [`TraversalEntry`]: the directory path plus the
//! sorted names of its subdirectories and files.
//!
//! - **Top-down** order drives migration, so a mirrored parent exists
//!   before its children are created.
//! - **Bottom-up** order drives pruning, so leaves are removed before the
//!   directories that contain them.
//! - **Exclusions** are applied while listing, before recursion.
//!
//! # Example
//!
//! ```rust,no_run
//! use agevault_scan::{ExclusionSet, TreeWalker};
//!
//! for entry in TreeWalker::new("/path/to/share", ExclusionSet::default()) {
//!     let entry = entry.unwrap();
//!     println!("{}: {} files", entry.path.display(), entry.files.len());
//! }
//! ```

mod walker;

pub use walker::{TreeWalker, WalkOrder};

// Re-export core types for convenience
pub use agevault_core::{ArchiveError, ExclusionSet, TraversalEntry};
