//! Mapping between source paths and their archive counterparts.

use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::{ArchiveError, PathPair};

/// Shown instead of a path that cannot be rendered as UTF-8.
pub const UNPRINTABLE_PATH: &str = "Unicode character not supported by your console.";

/// Strip trailing separators from a root path.
///
/// The filesystem root itself is left untouched, and normalizing an
/// already-normalized path returns it unchanged.
pub fn normalize_root(path: impl AsRef<Path>) -> PathBuf {
    path.as_ref().components().collect()
}

/// Make a root absolute without resolving symlinks, so a linked directory is
/// archived under the name it was given.
///
/// A trailing `.` or `..` leaves no name to mirror under and is resolved.
pub fn absolute_root(path: impl AsRef<Path>) -> Result<PathBuf, ArchiveError> {
    let path = path.as_ref();
    let absolute = std::path::absolute(path).map_err(|e| ArchiveError::io(path, e))?;

    match absolute.components().next_back() {
        Some(Component::Normal(_)) => Ok(absolute),
        _ => fs::canonicalize(&absolute).map_err(|e| ArchiveError::io(&absolute, e)),
    }
}

/// Map `path` under `source_parent` onto the same relative location under
/// `archive_store`.
///
/// `path` must lie strictly below `source_parent`; anything else is a caller
/// error.
pub fn archive_path(
    archive_store: impl AsRef<Path>,
    source_parent: impl AsRef<Path>,
    path: impl AsRef<Path>,
) -> Result<PathBuf, ArchiveError> {
    let path = path.as_ref();
    let relative = path
        .strip_prefix(source_parent.as_ref())
        .map_err(|_| ArchiveError::invalid_path(path, "not below the source parent"))?;

    if relative.as_os_str().is_empty() {
        return Err(ArchiveError::invalid_path(
            path,
            "equal to the source parent",
        ));
    }

    Ok(normalize_root(archive_store.as_ref().join(relative)))
}

/// Render a path for console output, substituting a placeholder when it is
/// not valid UTF-8.
pub fn printable(path: &Path) -> Cow<'_, str> {
    match path.to_str() {
        Some(text) => Cow::Borrowed(text),
        None => Cow::Borrowed(UNPRINTABLE_PATH),
    }
}

/// Pure mapping from one source tree into an archive store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    archive_store: PathBuf,
    source_root: PathBuf,
    source_parent: PathBuf,
    archive_root: PathBuf,
}

impl PathMapper {
    /// Create a mapper archiving `source_root` into `archive_store`.
    ///
    /// The archive root is `archive_store/<last component of source_root>`.
    pub fn new(
        archive_store: impl AsRef<Path>,
        source_root: impl AsRef<Path>,
    ) -> Result<Self, ArchiveError> {
        let archive_store = normalize_root(archive_store);
        let source_root = normalize_root(source_root);

        let name = source_root
            .file_name()
            .ok_or_else(|| ArchiveError::invalid_path(&source_root, "source root has no name"))?;
        let source_parent = source_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let archive_root = archive_store.join(name);

        Ok(Self {
            archive_store,
            source_root,
            source_parent,
            archive_root,
        })
    }

    /// Normalized archive store.
    pub fn archive_store(&self) -> &Path {
        &self.archive_store
    }

    /// Normalized root of the tree being archived.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Directory containing the source root.
    pub fn source_parent(&self) -> &Path {
        &self.source_parent
    }

    /// Mirror of the source root inside the archive store.
    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// Archive-side counterpart of a source path.
    pub fn archive_path(&self, path: &Path) -> Result<PathBuf, ArchiveError> {
        archive_path(&self.archive_store, &self.source_parent, path)
    }

    /// Pair a source path with its archive counterpart.
    pub fn map(&self, path: &Path) -> Result<PathPair, ArchiveError> {
        Ok(PathPair {
            source: path.to_path_buf(),
            archive: self.archive_path(path)?,
        })
    }
}
