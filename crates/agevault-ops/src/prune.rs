//! Bottom-up removal of directories left empty by a migration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use agevault_core::{ExclusionSet, printable};
use agevault_scan::TreeWalker;

/// What a pruning pass did under one root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Root that was pruned.
    pub root: PathBuf,
    /// Directories removed.
    pub removed: Vec<PathBuf>,
    /// Directories that could not be removed (not empty, in use).
    pub retained: Vec<PathBuf>,
    /// Protected root left alone. Protected subdirectories are never listed.
    pub protected: Vec<PathBuf>,
}

impl PruneReport {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }
}

/// Remove every empty directory under `root`, leaves first.
///
/// The root itself is removed too if it ends up empty. Protected
/// directories and their subtrees are never touched, and failing to remove
/// a directory is an expected outcome rather than an error.
pub fn prune_empty_dirs(root: impl AsRef<Path>, exclusions: &ExclusionSet) -> PruneReport {
    let root = root.as_ref();
    let mut report = PruneReport::new(root);

    if exclusions.is_protected(root) {
        debug!(root = %printable(root), "Root is protected, not pruning");
        report.protected.push(root.to_path_buf());
        return report;
    }

    info!(root = %printable(root), "Cleaning empty directories");

    for entry in TreeWalker::bottom_up(root, exclusions.clone()) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "Unable to list directory");
                continue;
            }
        };

        match fs::remove_dir(&entry.path) {
            Ok(()) => {
                info!(path = %printable(&entry.path), "Removed");
                report.removed.push(entry.path);
            }
            Err(err) => {
                debug!(path = %printable(&entry.path), error = %err, "Unable to remove");
                report.retained.push(entry.path);
            }
        }
    }

    report
}
