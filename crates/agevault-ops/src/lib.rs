//! Archival operations for agevault.
//!
//! This crate moves aged files from a source tree into a mirrored tree under
//! an archive store. A run is single-threaded and synchronous:
//!
//! - [`MigrationEngine`] walks the source, mirrors directories, copies
//!   eligible files and verifies every copy by digest before deleting
//!   anything.
//! - [`prune_empty_dirs`] removes directories a destructive run emptied.
//! - [`ProblemList`] collects paths that could not be processed and writes
//!   them to `problems.txt`.
//! - [`FileCopier`] is the copy strategy seam; [`select_copier`] picks the
//!   ACL-preserving copier where the platform has ACLs.
//!
//! ```rust,no_run
//! use agevault_core::ArchiveConfig;
//! use agevault_ops::MigrationEngine;
//!
//! let config = ArchiveConfig::builder()
//!     .source_root("/data/share")
//!     .archive_store("/mnt/archive")
//!     .age_days(365.0)
//!     .build()
//!     .unwrap();
//!
//! let report = MigrationEngine::new(config).run().unwrap();
//! println!("{}", report.stats.summary());
//! ```

mod copy;
mod engine;
mod problems;
mod progress;
mod prune;

pub use copy::{AclCopier, FileCopier, PlainCopier, select_copier};
pub use engine::{DirOutcome, MigrationEngine, MigrationReport, ensure_dir};
pub use problems::{Problem, ProblemKind, ProblemList};
pub use progress::{FileOutcome, MigrationStats};
pub use prune::{PruneReport, prune_empty_dirs};
