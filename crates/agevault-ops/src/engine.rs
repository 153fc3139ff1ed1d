//! The archival run: mirror the tree, move aged files, clean up.
//!
//! A run goes through these phases in order:
//!
//! 1. Resolve the archive root (`<store>/<source name>`), refuse it if it
//!    overlaps the source tree, then create it.
//! 2. Walk the source top-down. For each directory, create the mirrored
//!    subdirectories, then copy every eligible file, verify the copy by
//!    digest and, outside safe mode, delete the source.
//! 3. Outside safe mode, prune empty directories under the archive root and
//!    then under the source root.
//! 4. Write the problems report.
//!
//! Per-entry failures never abort the walk. A vanished path is recorded as a
//! problem, a permission error is skipped silently, and a source is only ever
//! deleted after the bytes read back from the archive match it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use agevault_analyze::{AgePolicy, format_age, hash};
use agevault_core::{ArchiveConfig, ArchiveError, PathMapper, PathPair, TraversalEntry, printable};
use agevault_scan::TreeWalker;

use crate::copy::{FileCopier, select_copier};
use crate::problems::{ProblemKind, ProblemList};
use crate::progress::{FileOutcome, MigrationStats};
use crate::prune::{PruneReport, prune_empty_dirs};

/// Result of creating a directory that may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirOutcome {
    Created,
    AlreadyExists,
}

/// Create one directory, treating an existing one as success.
pub fn ensure_dir(path: &Path) -> Result<DirOutcome, ArchiveError> {
    match fs::create_dir(path) {
        Ok(()) => Ok(DirOutcome::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(DirOutcome::AlreadyExists),
        Err(e) => Err(ArchiveError::io(path, e)),
    }
}

/// Resolve symlinks in `path`, or in its parent when `path` does not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Refuse an archive root that overlaps the source root in either direction.
fn check_disjoint(mapper: &PathMapper) -> Result<(), ArchiveError> {
    let source = resolve(mapper.source_root());
    let archive = resolve(mapper.archive_root());

    if archive.starts_with(&source) || source.starts_with(&archive) {
        return Err(ArchiveError::invalid_path(
            mapper.archive_root(),
            format!(
                "archive root overlaps the source tree {}",
                printable(mapper.source_root())
            ),
        ));
    }
    Ok(())
}

/// True when both paths exist and resolve to the same file.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub source_root: PathBuf,
    pub archive_root: PathBuf,
    pub safe_mode: bool,
    pub stats: MigrationStats,
    pub problems: ProblemList,
    /// Archive-side pass first, then source-side. Empty in safe mode.
    pub pruned: Vec<PruneReport>,
}

/// Drives one archival run.
pub struct MigrationEngine {
    config: ArchiveConfig,
    copier: Box<dyn FileCopier>,
}

impl MigrationEngine {
    /// Create an engine using the best copy strategy for this platform.
    pub fn new(config: ArchiveConfig) -> Self {
        let copier = select_copier(config.preserve_acl);
        Self { config, copier }
    }

    /// Replace the copy strategy.
    pub fn with_copier(mut self, copier: impl FileCopier + 'static) -> Self {
        self.copier = Box::new(copier);
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Run with ages measured from now.
    pub fn run(&self) -> Result<MigrationReport, ArchiveError> {
        let policy = AgePolicy::new(self.config.threshold()?);
        self.run_with_policy(policy)
    }

    /// Run with an explicit age policy.
    pub fn run_with_policy(&self, policy: AgePolicy) -> Result<MigrationReport, ArchiveError> {
        let mapper = PathMapper::new(&self.config.archive_store, &self.config.source_root)?;

        info!(
            source_parent = %printable(mapper.source_parent()),
            source_root = %printable(mapper.source_root()),
            archive_store = %printable(mapper.archive_store()),
            archive_root = %printable(mapper.archive_root()),
            threshold = %format_age(policy.threshold()),
            copier = self.copier.name(),
            safe_mode = self.config.safe_mode,
            "Starting archive run"
        );

        check_disjoint(&mapper)?;

        let mut run = Run {
            engine: self,
            mapper: &mapper,
            policy,
            stats: MigrationStats::new(),
            problems: ProblemList::new(),
        };

        if self.config.exclusions.excludes_dir(mapper.source_root()) {
            warn!(
                source_root = %printable(mapper.source_root()),
                "Source root is protected, nothing to archive"
            );
        } else {
            match ensure_dir(mapper.archive_root())? {
                DirOutcome::Created => debug!("Created archive root"),
                DirOutcome::AlreadyExists => debug!("Archive root already exists"),
            }
            run.walk();
        }

        let Run {
            stats, problems, ..
        } = run;

        let pruned = if self.config.is_destructive() {
            vec![
                prune_empty_dirs(mapper.archive_root(), &self.config.exclusions),
                prune_empty_dirs(mapper.source_root(), &self.config.exclusions),
            ]
        } else {
            Vec::new()
        };

        if let Some(destination) = &self.config.problems_file {
            problems.flush(destination)?;
            debug!(path = %printable(destination), count = problems.len(), "Wrote problems report");
        }

        info!(summary = %stats.summary(), problems = problems.len(), "Archive run finished");

        Ok(MigrationReport {
            source_root: mapper.source_root().to_path_buf(),
            archive_root: mapper.archive_root().to_path_buf(),
            safe_mode: self.config.safe_mode,
            stats,
            problems,
            pruned,
        })
    }
}

/// Mutable state of one walk.
struct Run<'a> {
    engine: &'a MigrationEngine,
    mapper: &'a PathMapper,
    policy: AgePolicy,
    stats: MigrationStats,
    problems: ProblemList,
}

impl Run<'_> {
    fn walk(&mut self) {
        let walker = TreeWalker::new(
            self.mapper.source_root(),
            self.engine.config.exclusions.clone(),
        );

        for entry in walker {
            match entry {
                Ok(entry) => self.visit(&entry),
                Err(err) => {
                    let path = err
                        .path()
                        .unwrap_or_else(|| self.mapper.source_root())
                        .to_path_buf();
                    self.absorb(&path, &err);
                }
            }
        }
    }

    fn visit(&mut self, entry: &TraversalEntry) {
        self.stats.dirs_visited += 1;
        debug!(dir = %printable(&entry.path), "Visiting");

        let pair = match self.mapper.map(&entry.path) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "Cannot map directory into the archive");
                self.problems.record(&entry.path, ProblemKind::Io);
                return;
            }
        };

        for name in &entry.dirs {
            let mirror = pair.archive.join(name);
            match ensure_dir(&mirror) {
                Ok(DirOutcome::Created) => self.stats.dirs_created += 1,
                Ok(DirOutcome::AlreadyExists) => {}
                Err(err) if err.is_not_found() => {
                    warn!(dir = %printable(&entry.path), "Mirror parent missing");
                    self.problems
                        .record(&entry.path, ProblemKind::MissingMirrorParent);
                }
                Err(err) => self.absorb(&pair.source.join(name), &err),
            }
        }

        for name in &entry.files {
            let file = pair.child(name);
            match self.migrate(&file) {
                Ok(outcome) => self.stats.record(outcome),
                Err(err) => {
                    self.stats.record_failure();
                    self.absorb(&file.source, &err);
                }
            }
        }
    }

    fn migrate(&mut self, file: &PathPair) -> Result<FileOutcome, ArchiveError> {
        let metadata = fs::metadata(&file.source).map_err(|e| ArchiveError::io(&file.source, e))?;
        if !metadata.is_file() {
            return Ok(FileOutcome::NotRegular);
        }
        if !self.policy.is_eligible_metadata(&file.source, &metadata)? {
            if let Ok(modified) = metadata.modified() {
                trace!(
                    path = %printable(&file.source),
                    age = %format_age(self.policy.age_of(modified)),
                    "Too young"
                );
            }
            return Ok(FileOutcome::TooYoung);
        }

        if is_same_file(&file.source, &file.archive) {
            warn!(
                source = %printable(&file.source),
                archive = %printable(&file.archive),
                "Archive path resolves to the source file, skipping"
            );
            self.problems.record(&file.source, ProblemKind::SameFile);
            return Ok(FileOutcome::SameFile);
        }

        let bytes = self
            .engine
            .copier
            .copy(&file.source, &file.archive)
            .map_err(|e| ArchiveError::io(&file.source, e))?;

        // Read both sides back from disk; never trust the copy's own account.
        let source_digest = hash::digest(&file.source)?;
        let archive_digest = hash::digest(&file.archive)?;

        if source_digest.to_hex() != archive_digest.to_hex() {
            warn!(
                source = %printable(&file.source),
                archive = %printable(&file.archive),
                "Archived copy does not match source, keeping source"
            );
            self.problems
                .record(&file.source, ProblemKind::VerificationFailed);
            return Ok(FileOutcome::VerificationFailed);
        }

        if self.engine.config.safe_mode {
            info!(path = %printable(&file.source), "Archived");
            return Ok(FileOutcome::Archived { bytes });
        }

        if let Err(e) = fs::remove_file(&file.source) {
            self.absorb(&file.source, &ArchiveError::io(&file.source, e));
            return Ok(FileOutcome::Archived { bytes });
        }

        info!(path = %printable(&file.source), "Moved");
        Ok(FileOutcome::Moved { bytes })
    }

    /// Record or skip a per-entry failure.
    fn absorb(&mut self, path: &Path, err: &ArchiveError) {
        if err.is_permission_denied() {
            debug!(path = %printable(path), "Permission denied, skipping");
            self.stats.record_permission_skip();
        } else if err.is_not_found() {
            warn!(path = %printable(path), "Vanished during the run");
            self.problems.record(path, ProblemKind::Vanished);
        } else {
            warn!(path = %printable(path), error = %err, "Failed to archive");
            self.problems.record(path, ProblemKind::Io);
        }
    }
}
