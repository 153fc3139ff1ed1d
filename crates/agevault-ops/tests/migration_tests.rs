use agevault_core::{ArchiveConfig, ArchiveError};
use agevault_ops::{FileCopier, MigrationEngine, MigrationReport, PlainCopier, ProblemKind};
use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const DAY: Duration = Duration::from_secs(86400);

/// A workspace holding `src/` (the tree to archive) and `arch/` (the store).
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("arch")).unwrap();
        Self { dir }
    }

    fn src(&self, rel: &str) -> PathBuf {
        self.dir.path().join("src").join(rel)
    }

    fn arch(&self, rel: &str) -> PathBuf {
        self.dir.path().join("arch/src").join(rel)
    }

    fn problems_file(&self) -> PathBuf {
        self.dir.path().join("problems.txt")
    }

    fn write(&self, rel: &str, contents: &[u8], age: Duration) -> PathBuf {
        let path = self.src(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        set_file_mtime(&path, FileTime::from_system_time(SystemTime::now() - age)).unwrap();
        path
    }

    fn config(&self, safe_mode: bool) -> ArchiveConfig {
        ArchiveConfig::builder()
            .source_root(self.dir.path().join("src"))
            .archive_store(self.dir.path().join("arch"))
            .age_days(365.0)
            .safe_mode(safe_mode)
            .problems_file(Some(self.problems_file()))
            .build()
            .unwrap()
    }

    fn run(&self, safe_mode: bool) -> MigrationReport {
        MigrationEngine::new(self.config(safe_mode)).run().unwrap()
    }

    fn run_with(&self, safe_mode: bool, copier: impl FileCopier + 'static) -> MigrationReport {
        MigrationEngine::new(self.config(safe_mode))
            .with_copier(copier)
            .run()
            .unwrap()
    }

    /// Every file under the archive root with its contents, sorted.
    fn archive_snapshot(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut out = Vec::new();
        collect(&self.dir.path().join("arch"), &mut out);
        out.sort();
        out
    }
}

fn collect(dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            out.push((path.clone(), Vec::new()));
            collect(&path, out);
        } else {
            out.push((path.clone(), fs::read(&path).unwrap()));
        }
    }
}

/// Writes bytes that differ from the source.
struct CorruptingCopier;

impl FileCopier for CorruptingCopier {
    fn name(&self) -> &'static str {
        "corrupting"
    }

    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        let mut bytes = fs::read(source)?;
        bytes.push(b'!');
        fs::write(dest, &bytes)?;
        Ok(bytes.len() as u64)
    }
}

/// Deletes the source just before copying, as if another process raced us.
struct VanishingCopier;

impl FileCopier for VanishingCopier {
    fn name(&self) -> &'static str {
        "vanishing"
    }

    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        fs::remove_file(source)?;
        PlainCopier.copy(source, dest)
    }
}

/// Refuses every copy with a permission error.
struct DenyingCopier;

impl FileCopier for DenyingCopier {
    fn name(&self) -> &'static str {
        "denying"
    }

    fn copy(&self, _source: &Path, _dest: &Path) -> io::Result<u64> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

/// Removes the archive-side `a` mirror next to each destination before copying.
struct MirrorRemovingCopier;

impl FileCopier for MirrorRemovingCopier {
    fn name(&self) -> &'static str {
        "mirror-removing"
    }

    fn copy(&self, source: &Path, dest: &Path) -> io::Result<u64> {
        if let Some(mirror) = dest.parent().map(|p| p.join("a")) {
            if mirror.is_dir() {
                fs::remove_dir_all(&mirror)?;
            }
        }
        PlainCopier.copy(source, dest)
    }
}

fn aged_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
    set_file_mtime(path, FileTime::from_system_time(SystemTime::now() - DAY * 400)).unwrap();
}

fn config_for(source: &Path, store: &Path, safe_mode: bool) -> ArchiveConfig {
    ArchiveConfig::builder()
        .source_root(source)
        .archive_store(store)
        .age_days(365.0)
        .safe_mode(safe_mode)
        .problems_file(None::<PathBuf>)
        .build()
        .unwrap()
}

#[test]
fn test_old_file_moved_new_file_untouched() {
    let fx = Fixture::new();
    fx.write("a/old.txt", b"old contents", DAY * 400);
    fx.write("a/new.txt", b"new contents", Duration::ZERO);

    let report = fx.run(false);

    assert_eq!(fs::read(fx.arch("a/old.txt")).unwrap(), b"old contents");
    assert!(!fx.src("a/old.txt").exists());
    assert_eq!(fs::read(fx.src("a/new.txt")).unwrap(), b"new contents");
    assert!(!fx.arch("a/new.txt").exists());

    assert_eq!(report.stats.files_examined, 2);
    assert_eq!(report.stats.files_moved, 1);
    assert!(report.problems.is_empty());
    assert_eq!(fs::read_to_string(fx.problems_file()).unwrap(), "");
}

#[test]
fn test_archived_copy_keeps_mtime() {
    let fx = Fixture::new();
    let old = fx.write("old.txt", b"x", DAY * 400);
    let before = FileTime::from_last_modification_time(&fs::metadata(&old).unwrap());

    fx.run(false);

    let after = FileTime::from_last_modification_time(&fs::metadata(fx.arch("old.txt")).unwrap());
    assert_eq!(before.unix_seconds(), after.unix_seconds());
}

#[test]
fn test_safe_mode_copies_without_deleting_or_pruning() {
    let fx = Fixture::new();
    fx.write("a/old.txt", b"old", DAY * 400);
    fs::create_dir_all(fx.src("empty")).unwrap();

    let report = fx.run(true);

    assert!(report.safe_mode);
    assert!(fx.src("a/old.txt").exists());
    assert_eq!(fs::read(fx.arch("a/old.txt")).unwrap(), b"old");
    assert!(fx.src("empty").is_dir());
    assert!(fx.arch("empty").is_dir());
    assert!(report.pruned.is_empty());
    assert_eq!(report.stats.files_archived, 1);
    assert_eq!(report.stats.files_moved, 0);
}

#[test]
fn test_young_files_untouched_in_both_modes() {
    for safe_mode in [true, false] {
        let fx = Fixture::new();
        fx.write("keep/young.txt", b"young", DAY * 10);

        fx.run(safe_mode);

        assert!(fx.src("keep/young.txt").exists());
        assert!(!fx.arch("keep/young.txt").exists());
    }
}

#[test]
fn test_excluded_names_and_protected_folders() {
    let fx = Fixture::new();
    fx.write("pics/thumbs.db", b"cache", DAY * 400);
    fx.write("pics/photo.jpg", b"jpeg", DAY * 400);
    fx.write("DfsrPrivate/Staging/blob.bin", b"blob", DAY * 400);
    fs::create_dir_all(fx.src("DfsrPrivate/Empty")).unwrap();

    fx.run(false);

    assert!(fx.src("pics/thumbs.db").exists());
    assert!(!fx.arch("pics/thumbs.db").exists());
    assert!(fx.arch("pics/photo.jpg").exists());

    assert!(fx.src("DfsrPrivate/Staging/blob.bin").exists());
    assert!(fx.src("DfsrPrivate/Empty").is_dir());
    assert!(!fx.arch("DfsrPrivate").exists());
}

#[test]
fn test_digest_mismatch_keeps_source() {
    let fx = Fixture::new();
    let old = fx.write("a/old.txt", b"precious", DAY * 400);

    let report = fx.run_with(false, CorruptingCopier);

    assert_eq!(fs::read(&old).unwrap(), b"precious");
    assert_eq!(report.stats.verification_failures, 1);
    assert_eq!(report.stats.files_moved, 0);
    assert_eq!(report.problems.count(ProblemKind::VerificationFailed), 1);
    assert_eq!(
        fs::read_to_string(fx.problems_file()).unwrap(),
        format!("{}\n", old.display())
    );
}

#[test]
fn test_vanished_source_recorded() {
    let fx = Fixture::new();
    let first = fx.write("a/first.txt", b"1", DAY * 400);
    let second = fx.write("a/second.txt", b"2", DAY * 400);

    let report = fx.run_with(false, VanishingCopier);

    assert_eq!(report.problems.count(ProblemKind::Vanished), 2);
    let lines: Vec<String> = fs::read_to_string(fx.problems_file())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(
        lines,
        vec![first.display().to_string(), second.display().to_string()]
    );
}

#[test]
fn test_permission_denied_skipped_silently() {
    let fx = Fixture::new();
    let old = fx.write("a/old.txt", b"locked", DAY * 400);

    let report = fx.run_with(false, DenyingCopier);

    assert!(old.exists());
    assert!(report.problems.is_empty());
    assert_eq!(report.stats.permission_skips, 1);
    assert!(!fx.arch("a/old.txt").exists());
}

#[test]
fn test_second_run_changes_nothing() {
    let fx = Fixture::new();
    fx.write("a/old.txt", b"old", DAY * 400);
    fx.write("a/new.txt", b"new", Duration::ZERO);
    fx.write("b/only-new.txt", b"new", Duration::ZERO);
    fx.write("c/d/old.txt", b"deep", DAY * 500);

    let first = fx.run(false);
    assert!(first.problems.is_empty());
    let snapshot = fx.archive_snapshot();

    let second = fx.run(false);
    assert!(second.problems.is_empty());
    assert_eq!(second.stats.files_archived, 0);
    assert_eq!(fx.archive_snapshot(), snapshot);
}

#[test]
fn test_rerun_after_partial_copy_overwrites() {
    let fx = Fixture::new();
    fx.write("a/old.txt", b"complete contents", DAY * 400);
    fs::create_dir_all(fx.arch("a")).unwrap();
    fs::write(fx.arch("a/old.txt"), b"trunc").unwrap();

    let report = fx.run(false);

    assert!(report.problems.is_empty());
    assert_eq!(fs::read(fx.arch("a/old.txt")).unwrap(), b"complete contents");
    assert!(!fx.src("a/old.txt").exists());
}

#[test]
fn test_pruning_cleans_both_sides() {
    let fx = Fixture::new();
    fx.write("x/y/old.txt", b"old", DAY * 400);
    fx.write("keep/new.txt", b"new", Duration::ZERO);
    fs::create_dir_all(fx.src("DfsrPrivate")).unwrap();

    let report = fx.run(false);

    // Source: emptied directories go, protected and populated ones stay.
    assert!(!fx.src("x").exists());
    assert!(fx.src("keep/new.txt").exists());
    assert!(fx.src("DfsrPrivate").is_dir());

    // Archive: the moved file keeps its branch, the empty mirror is pruned.
    assert!(fx.arch("x/y/old.txt").exists());
    assert!(!fx.arch("keep").exists());

    assert_eq!(report.pruned.len(), 2);
    assert_eq!(report.pruned[0].root, fx.dir.path().join("arch/src"));
    assert!(report.pruned[0].removed.contains(&fx.arch("keep")));
    assert!(report.pruned[1].removed.contains(&fx.src("x/y")));
}

#[test]
fn test_trailing_separator_on_roots() {
    let fx = Fixture::new();
    fx.write("old.txt", b"old", DAY * 400);

    let mut config = fx.config(true);
    config.source_root = PathBuf::from(format!("{}/", fx.dir.path().join("src").display()));
    config.archive_store = PathBuf::from(format!("{}/", fx.dir.path().join("arch").display()));

    let report = MigrationEngine::new(config).run().unwrap();
    assert_eq!(report.archive_root, fx.dir.path().join("arch/src"));
    assert!(fx.arch("old.txt").exists());
}

#[test]
fn test_store_at_source_parent_is_refused() {
    for safe_mode in [true, false] {
        let dir = TempDir::new().unwrap();
        let share = dir.path().join("share");
        let precious = share.join("precious.txt");
        aged_file(&precious, b"precious data");

        let err = MigrationEngine::new(config_for(&share, dir.path(), safe_mode))
            .run()
            .unwrap_err();

        assert!(matches!(err, ArchiveError::InvalidPath { .. }));
        assert_eq!(fs::read(&precious).unwrap(), b"precious data");
    }
}

#[test]
fn test_store_inside_source_is_refused() {
    let dir = TempDir::new().unwrap();
    let share = dir.path().join("share");
    aged_file(&share.join("old.txt"), b"old");
    fs::create_dir_all(share.join("arch")).unwrap();

    let err = MigrationEngine::new(config_for(&share, &share.join("arch"), true))
        .run()
        .unwrap_err();

    assert!(matches!(err, ArchiveError::InvalidPath { .. }));
    assert!(!share.join("arch/share").exists());
    assert_eq!(fs::read_dir(share.join("arch")).unwrap().count(), 0);
}

#[test]
fn test_source_inside_archive_root_is_refused() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("x/x");
    aged_file(&nested.join("old.txt"), b"old");

    let err = MigrationEngine::new(config_for(&nested, dir.path(), false))
        .run()
        .unwrap_err();

    assert!(matches!(err, ArchiveError::InvalidPath { .. }));
    assert!(nested.join("old.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_mirror_linked_back_to_source_is_skipped() {
    let fx = Fixture::new();
    let old = fx.write("a/old.txt", b"keep me", DAY * 400);
    fs::create_dir_all(fx.arch("")).unwrap();
    std::os::unix::fs::symlink(fx.src("a"), fx.arch("a")).unwrap();

    let report = fx.run(false);

    assert_eq!(fs::read(&old).unwrap(), b"keep me");
    assert_eq!(report.problems.count(ProblemKind::SameFile), 1);
    assert_eq!(report.stats.files_archived, 0);
    assert_eq!(report.stats.files_moved, 0);
}

#[test]
fn test_protected_source_root_untouched() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("DfsrPrivate");
    let store = dir.path().join("arch");
    let staging = source.join("staging.bin");
    aged_file(&staging, b"blob");
    fs::create_dir_all(&store).unwrap();

    let report = MigrationEngine::new(config_for(&source, &store, false))
        .run()
        .unwrap();

    assert_eq!(fs::read(&staging).unwrap(), b"blob");
    assert_eq!(report.stats.files_examined, 0);
    assert_eq!(report.stats.dirs_visited, 0);
    assert!(!store.join("DfsrPrivate").exists());
}

#[test]
fn test_missing_mirror_parent_recorded_and_walk_continues() {
    let fx = Fixture::new();
    fx.write("old.txt", b"root", DAY * 400);
    fs::create_dir_all(fx.src("a/b")).unwrap();
    fx.write("c/later.txt", b"later", DAY * 400);

    let report = fx.run_with(true, MirrorRemovingCopier);

    assert_eq!(report.problems.count(ProblemKind::MissingMirrorParent), 1);
    let problem = report.problems.iter().next().unwrap();
    assert_eq!(problem.path, fx.src("a"));
    assert_eq!(problem.kind, ProblemKind::MissingMirrorParent);

    assert!(fx.arch("old.txt").exists());
    assert_eq!(fs::read(fx.arch("c/later.txt")).unwrap(), b"later");
    assert_eq!(report.stats.files_archived, 2);
}
