//! Paths that could not be archived during a run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agevault_core::ArchiveError;

/// Why a path was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemKind {
    /// The path disappeared between listing and processing.
    Vanished,
    /// The archive-side parent of a mirrored directory was missing.
    MissingMirrorParent,
    /// The archived copy did not match the source.
    VerificationFailed,
    /// The archive path resolves to the source file itself.
    SameFile,
    /// Any other I/O failure.
    Io,
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vanished => write!(f, "vanished"),
            Self::MissingMirrorParent => write!(f, "missing mirror parent"),
            Self::VerificationFailed => write!(f, "verification failed"),
            Self::SameFile => write!(f, "archive path is the source file"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

/// A recorded problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub path: PathBuf,
    pub kind: ProblemKind,
}

/// Append-only list of problem paths, in the order they were hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemList {
    problems: Vec<Problem>,
}

impl ProblemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path.
    pub fn record(&mut self, path: impl Into<PathBuf>, kind: ProblemKind) {
        self.problems.push(Problem {
            path: path.into(),
            kind,
        });
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    /// Count problems of one kind.
    pub fn count(&self, kind: ProblemKind) -> usize {
        self.problems.iter().filter(|p| p.kind == kind).count()
    }

    /// Write one path per line.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for problem in &self.problems {
            writeln!(writer, "{}", problem.path.to_string_lossy())?;
        }
        writer.flush()
    }

    /// Replace `destination` with the report.
    pub fn flush(&self, destination: &Path) -> Result<(), ArchiveError> {
        let file = File::create(destination).map_err(|e| ArchiveError::io(destination, e))?;
        self.write_to(BufWriter::new(file))
            .map_err(|e| ArchiveError::io(destination, e))
    }
}

impl<'a> IntoIterator for &'a ProblemList {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_path_per_line() {
        let mut problems = ProblemList::new();
        problems.record("/src/a/gone.txt", ProblemKind::Vanished);
        problems.record("/src/b", ProblemKind::MissingMirrorParent);

        let mut out = Vec::new();
        problems.write_to(&mut out).unwrap();

        // Each line holds exactly one path, never the whole list.
        assert_eq!(String::from_utf8(out).unwrap(), "/src/a/gone.txt\n/src/b\n");
    }

    #[test]
    fn test_flush_truncates_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("problems.txt");
        std::fs::write(&report, "left over\nfrom last run\n").unwrap();

        let mut problems = ProblemList::new();
        problems.record("/src/x", ProblemKind::Io);
        problems.flush(&report).unwrap();
        assert_eq!(std::fs::read_to_string(&report).unwrap(), "/src/x\n");

        ProblemList::new().flush(&report).unwrap();
        assert_eq!(std::fs::read_to_string(&report).unwrap(), "");
    }

    #[test]
    fn test_counts_by_kind() {
        let mut problems = ProblemList::new();
        problems.record("/a", ProblemKind::Vanished);
        problems.record("/b", ProblemKind::Vanished);
        problems.record("/c", ProblemKind::VerificationFailed);

        assert_eq!(problems.len(), 3);
        assert_eq!(problems.count(ProblemKind::Vanished), 2);
        assert_eq!(problems.count(ProblemKind::Io), 0);
        assert_eq!(problems.iter().next().unwrap().path, PathBuf::from("/a"));
    }
}
