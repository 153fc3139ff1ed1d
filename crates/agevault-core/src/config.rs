//! Archive run configuration.

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{ArchiveError, ExclusionSet};

/// Default name of the problems report, relative to the working directory.
pub const DEFAULT_PROBLEMS_FILE: &str = "problems.txt";

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Configuration for one archival run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ArchiveConfig {
    /// Root of the tree to archive.
    pub source_root: PathBuf,

    /// Directory that receives the mirrored tree.
    pub archive_store: PathBuf,

    /// Minimum age, in days, of a file's last modification.
    pub age_days: f64,

    /// Non-destructive mode: never delete sources, never prune.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub safe_mode: bool,

    /// Directories and file names kept out of the run.
    #[builder(default)]
    #[serde(default)]
    pub exclusions: ExclusionSet,

    /// Where the problems report is written (None = not written).
    #[builder(default = "Some(PathBuf::from(DEFAULT_PROBLEMS_FILE))")]
    #[serde(default = "default_problems_file")]
    pub problems_file: Option<PathBuf>,

    /// Carry access-control metadata over when the platform allows it.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub preserve_acl: bool,
}

fn default_true() -> bool {
    true
}

fn default_problems_file() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_PROBLEMS_FILE))
}

impl ArchiveConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.source_root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Source directory cannot be empty".to_string());
            }
            None => return Err("Source directory is required".to_string()),
            _ => {}
        }
        match self.archive_store {
            Some(ref store) if store.as_os_str().is_empty() => {
                return Err("Archive store cannot be empty".to_string());
            }
            None => return Err("Archive store is required".to_string()),
            _ => {}
        }
        match self.age_days {
            Some(days) if !days.is_finite() || days < 0.0 => {
                Err(format!("Age must be a non-negative number of days, got {days}"))
            }
            None => Err("Age in days is required".to_string()),
            _ => Ok(()),
        }
    }
}

impl ArchiveConfig {
    /// Create a new config builder.
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::default()
    }

    /// Create a config with default options (safe mode on).
    pub fn new(source_root: impl Into<PathBuf>, archive_store: impl Into<PathBuf>, age_days: f64) -> Self {
        Self {
            source_root: source_root.into(),
            archive_store: archive_store.into(),
            age_days,
            safe_mode: true,
            exclusions: ExclusionSet::default(),
            problems_file: default_problems_file(),
            preserve_acl: true,
        }
    }

    /// Minimum age of an eligible file.
    ///
    /// Fails when `age_days` is negative, not finite, or too large for a
    /// `Duration` (the fields are public, so the builder check can be bypassed).
    pub fn threshold(&self) -> Result<Duration, ArchiveError> {
        let seconds = SECONDS_PER_DAY * self.age_days;
        Duration::try_from_secs_f64(seconds).map_err(|e| ArchiveError::InvalidConfig {
            message: format!("invalid age threshold of {} days: {e}", self.age_days),
        })
    }

    /// Check whether destructive steps (deletion, pruning) are allowed.
    pub fn is_destructive(&self) -> bool {
        !self.safe_mode
    }
}
