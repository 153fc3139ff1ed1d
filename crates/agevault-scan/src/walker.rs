//! Level-by-level directory walker with exclusion filtering.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use agevault_core::{ArchiveError, ExclusionSet, TraversalEntry, printable};

/// Order in which directories are yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkOrder {
    /// Parents before children (pre-order).
    #[default]
    TopDown,
    /// Children before parents (post-order).
    BottomUp,
}

/// A directory listed but not yet yielded, with the children still to visit.
struct Frame {
    entry: TraversalEntry,
    descend: Vec<PathBuf>,
    next: usize,
}

/// Walks a directory tree one directory at a time.
///
/// Exclusions are applied while a directory is listed, so an excluded
/// subdirectory is never read and an excluded file never shows up in a
/// [`TraversalEntry`]. Symlinks to directories are reported among the
/// subdirectories but never followed.
///
/// A directory that cannot be read yields an `Err` and the walk carries on
/// with its siblings. A root that is itself excluded yields nothing.
pub struct TreeWalker {
    exclusions: ExclusionSet,
    order: WalkOrder,
    root: Option<PathBuf>,
    pending: Vec<PathBuf>,
    frames: Vec<Frame>,
}

impl TreeWalker {
    /// Create a top-down walker rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, exclusions: ExclusionSet) -> Self {
        Self {
            exclusions,
            order: WalkOrder::TopDown,
            root: Some(root.into()),
            pending: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Set the traversal order.
    pub fn order(mut self, order: WalkOrder) -> Self {
        self.order = order;
        self
    }

    /// Create a bottom-up walker rooted at `root`.
    pub fn bottom_up(root: impl Into<PathBuf>, exclusions: ExclusionSet) -> Self {
        Self::new(root, exclusions).order(WalkOrder::BottomUp)
    }

    /// List one directory, returning its entry and the subdirectories to
    /// descend into.
    fn read_level(&self, dir: &Path) -> Result<(TraversalEntry, Vec<PathBuf>), ArchiveError> {
        let read_dir = fs::read_dir(dir).map_err(|e| ArchiveError::io(dir, e))?;

        let mut dirs: Vec<OsString> = Vec::new();
        let mut files: Vec<OsString> = Vec::new();
        let mut descend: Vec<PathBuf> = Vec::new();

        for item in read_dir {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    debug!(dir = %printable(dir), error = %err, "Skipping unreadable entry");
                    continue;
                }
            };

            let name = item.file_name();
            let path = item.path();
            let file_type = match item.file_type() {
                Ok(ft) => ft,
                Err(err) => {
                    debug!(path = %printable(&path), error = %err, "Skipping entry without type");
                    continue;
                }
            };

            let (is_dir, follow) = if file_type.is_dir() {
                (true, true)
            } else if file_type.is_symlink() {
                let target_is_dir = fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);
                (target_is_dir, false)
            } else {
                (false, false)
            };

            if is_dir {
                if self.exclusions.excludes_dir(&path) {
                    trace!(path = %printable(&path), "Excluded directory");
                    continue;
                }
                if follow {
                    descend.push(path);
                }
                dirs.push(name);
            } else {
                if self.exclusions.excludes_file(&name) {
                    trace!(path = %printable(&path), "Excluded file");
                    continue;
                }
                files.push(name);
            }
        }

        dirs.sort();
        files.sort();
        descend.sort();

        Ok((
            TraversalEntry {
                path: dir.to_path_buf(),
                dirs,
                files,
            },
            descend,
        ))
    }

    fn next_top_down(&mut self) -> Option<Result<TraversalEntry, ArchiveError>> {
        if let Some(root) = self.take_root() {
            self.pending.push(root);
        }

        let dir = self.pending.pop()?;
        match self.read_level(&dir) {
            Ok((entry, descend)) => {
                // Reversed so the stack pops children in name order.
                self.pending.extend(descend.into_iter().rev());
                Some(Ok(entry))
            }
            Err(err) => Some(Err(err)),
        }
    }

    fn next_bottom_up(&mut self) -> Option<Result<TraversalEntry, ArchiveError>> {
        if let Some(root) = self.take_root() {
            if let Err(err) = self.push_frame(&root) {
                return Some(Err(err));
            }
        }

        loop {
            let frame = self.frames.last_mut()?;
            if frame.next < frame.descend.len() {
                let child = frame.descend[frame.next].clone();
                frame.next += 1;
                if let Err(err) = self.push_frame(&child) {
                    return Some(Err(err));
                }
            } else {
                let frame = self.frames.pop()?;
                return Some(Ok(frame.entry));
            }
        }
    }

    /// Hand out the root once, unless it is itself excluded.
    fn take_root(&mut self) -> Option<PathBuf> {
        let root = self.root.take()?;
        if self.exclusions.excludes_dir(&root) {
            debug!(root = %printable(&root), "Walk root is protected, nothing to visit");
            return None;
        }
        Some(root)
    }

    fn push_frame(&mut self, dir: &Path) -> Result<(), ArchiveError> {
        let (entry, descend) = self.read_level(dir)?;
        self.frames.push(Frame {
            entry,
            descend,
            next: 0,
        });
        Ok(())
    }
}

impl Iterator for TreeWalker {
    type Item = Result<TraversalEntry, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.order {
            WalkOrder::TopDown => self.next_top_down(),
            WalkOrder::BottomUp => self.next_bottom_up(),
        }
    }
}
