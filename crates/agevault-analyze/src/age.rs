//! Age-based archival eligibility.
//!
//! A file is eligible once the time since its last modification reaches the
//! configured threshold. Ages are measured against a single reference time
//! captured when the policy is built, so every file in a run is judged
//! against the same clock reading.

use std::fs::Metadata;
use std::path::Path;
use std::time::{Duration, SystemTime};

use agevault_core::{ArchiveError, SECONDS_PER_DAY};

/// Convert a (possibly fractional) day count to seconds.
pub fn days_to_seconds(days: f64) -> f64 {
    SECONDS_PER_DAY * days
}

/// Check eligibility of `path` against a threshold in seconds, measured from now.
pub fn is_eligible(threshold_seconds: f64, path: impl AsRef<Path>) -> Result<bool, ArchiveError> {
    AgePolicy::from_seconds(threshold_seconds)?.is_eligible(path)
}

/// Decides whether a file is old enough to archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgePolicy {
    threshold: Duration,
    reference_time: SystemTime,
}

impl AgePolicy {
    /// Create a policy measuring ages from now.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            reference_time: SystemTime::now(),
        }
    }

    /// Create a policy from a threshold in seconds.
    pub fn from_seconds(threshold_seconds: f64) -> Result<Self, ArchiveError> {
        let threshold = Duration::try_from_secs_f64(threshold_seconds).map_err(|e| {
            ArchiveError::InvalidConfig {
                message: format!("invalid age threshold {threshold_seconds}s: {e}"),
            }
        })?;
        Ok(Self::new(threshold))
    }

    /// Create a policy from a threshold in days.
    pub fn from_days(days: f64) -> Result<Self, ArchiveError> {
        Self::from_seconds(days_to_seconds(days))
    }

    /// Measure ages from a fixed point in time instead of now.
    pub fn with_reference_time(mut self, reference_time: SystemTime) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Minimum age of an eligible file.
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Time ages are measured from.
    pub fn reference_time(&self) -> SystemTime {
        self.reference_time
    }

    /// Age of something last modified at `modified`.
    ///
    /// Modification times in the future count as age zero.
    pub fn age_of(&self, modified: SystemTime) -> Duration {
        self.reference_time
            .duration_since(modified)
            .unwrap_or(Duration::ZERO)
    }

    /// Check a modification time against the threshold.
    pub fn is_old_enough(&self, modified: SystemTime) -> bool {
        self.age_of(modified) >= self.threshold
    }

    /// Check already-fetched metadata.
    pub fn is_eligible_metadata(&self, path: &Path, metadata: &Metadata) -> Result<bool, ArchiveError> {
        let modified = metadata.modified().map_err(|e| ArchiveError::io(path, e))?;
        Ok(self.is_old_enough(modified))
    }

    /// Check a path, following symlinks.
    ///
    /// Fails with [`ArchiveError::NotFound`] when the path has vanished.
    pub fn is_eligible(&self, path: impl AsRef<Path>) -> Result<bool, ArchiveError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| ArchiveError::io(path, e))?;
        self.is_eligible_metadata(path, &metadata)
    }
}

/// Format an age as at most two adjacent units, e.g. `400d`, `1d 12h`, `1m 30s`.
pub fn format_age(duration: Duration) -> String {
    const UNITS: [(&str, u64); 4] = [("d", 86400), ("h", 3600), ("m", 60), ("s", 1)];

    let mut secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }

    let mut parts = Vec::with_capacity(2);
    for (suffix, size) in UNITS {
        if secs >= size {
            parts.push(format!("{}{suffix}", secs / size));
            secs %= size;
        } else if !parts.is_empty() {
            break;
        }
        if parts.len() == 2 {
            break;
        }
    }
    parts.join(" ")
}
