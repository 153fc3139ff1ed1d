//! Per-file outcomes and run statistics.

use serde::{Deserialize, Serialize};

/// What happened to one file during migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOutcome {
    /// Not a regular file (socket, device, dangling link).
    NotRegular,
    /// Modified too recently.
    TooYoung,
    /// Copied and verified; the source was kept.
    Archived { bytes: u64 },
    /// Copied, verified and the source removed.
    Moved { bytes: u64 },
    /// Copied, but the archived bytes differ from the source.
    VerificationFailed,
    /// Not copied: the archive path resolves to the source file.
    SameFile,
}

/// Counters for a migration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStats {
    /// Directories listed by the walk.
    pub dirs_visited: u64,
    /// Mirror directories newly created in the archive.
    pub dirs_created: u64,
    /// Files looked at.
    pub files_examined: u64,
    /// Files copied and verified (including moved ones).
    pub files_archived: u64,
    /// Files whose source was removed after verification.
    pub files_moved: u64,
    /// Bytes copied into the archive.
    pub bytes_copied: u64,
    /// Copies that failed verification.
    pub verification_failures: u64,
    /// Entries skipped because access was denied.
    pub permission_skips: u64,
}

impl MigrationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file outcome into the counters.
    pub fn record(&mut self, outcome: FileOutcome) {
        self.files_examined += 1;
        match outcome {
            FileOutcome::NotRegular | FileOutcome::TooYoung | FileOutcome::SameFile => {}
            FileOutcome::Archived { bytes } => {
                self.files_archived += 1;
                self.bytes_copied += bytes;
            }
            FileOutcome::Moved { bytes } => {
                self.files_archived += 1;
                self.files_moved += 1;
                self.bytes_copied += bytes;
            }
            FileOutcome::VerificationFailed => self.verification_failures += 1,
        }
    }

    /// Count a file that failed before an outcome was reached.
    pub fn record_failure(&mut self) {
        self.files_examined += 1;
    }

    /// Count an entry skipped on a permission error.
    pub fn record_permission_skip(&mut self) {
        self.permission_skips += 1;
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        if self.files_moved > 0 {
            format!(
                "Archived {} of {} files, {} moved",
                self.files_archived, self.files_examined, self.files_moved
            )
        } else {
            format!(
                "Archived {} of {} files",
                self.files_archived, self.files_examined
            )
        }
    }
}
