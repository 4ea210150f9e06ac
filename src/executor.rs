//! Preview, confirmation and execution of suggested moves.
//!
//! All user-facing lines go to the supplied writer. Failures of individual
//! moves are reported and counted, never returned.

use crate::{
    error::{Error, Result},
    suggester::Move,
};
use serde::Serialize;
use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Outcome counts of [`apply_moves`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Files moved into their target folder
    pub moved: usize,

    /// Moves skipped (missing source, root target, existing destination)
    pub skipped: usize,

    /// Moves that failed with an OS error
    pub failed: usize,
}

/// Prints each move and where it would go. Touches nothing on disk.
///
/// # Errors
///
/// Returns an error only if writing to `out` fails.
pub fn dry_run(moves: &[Move], out: &mut impl Write) -> Result<()> {
    let output_err = |e| Error::io("<output>", e);

    writeln!(out, "Dry run - would move:").map_err(output_err)?;
    for m in moves {
        let destination = if m.is_root() {
            "(keep at root)".to_string()
        } else {
            format!("{}/", m.target_folder)
        };
        writeln!(out, "  {}  ->  {}", m.path, destination).map_err(output_err)?;
    }
    Ok(())
}

/// Asks whether to apply the moves. Only "y" or "yes" count as consent.
///
/// A closed input stream, or any read failure, is a decline.
pub fn confirm(input: &mut impl BufRead, out: &mut impl Write) -> bool {
    if write!(out, "Apply these moves? [y/N] ")
        .and_then(|()| out.flush())
        .is_err()
    {
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
    }
}

/// Moves files below `root` into their target folders.
///
/// Never overwrites an existing file. Each failure is reported on `out` and
/// the remaining moves still run.
pub fn apply_moves(root: &Path, moves: &[Move], out: &mut impl Write) -> ApplyReport {
    let mut report = ApplyReport::default();

    for m in moves {
        let outcome = apply_one(root, m);
        let line = match &outcome {
            Outcome::Moved => {
                report.moved += 1;
                format!("  Moved: {} -> {}/", m.path, m.target_folder)
            }
            Outcome::NotAFile => {
                report.skipped += 1;
                format!("  Skip (not a file): {}", m.path)
            }
            Outcome::KeepAtRoot => {
                report.skipped += 1;
                format!("  Keep at root: {}", m.path)
            }
            Outcome::AlreadyInPlace => {
                report.skipped += 1;
                format!("  Already in place: {}", m.path)
            }
            Outcome::DestinationExists(dest) => {
                report.skipped += 1;
                format!("  Skip (destination exists): {} -> {}", m.path, dest)
            }
            Outcome::Failed(e) => {
                report.failed += 1;
                warn!("Failed to move {}: {}", m.path, e);
                format!("  Error moving {}: {}", m.path, e)
            }
        };

        if let Err(e) = writeln!(out, "{line}") {
            debug!("Could not report move result: {}", e);
        }
    }

    debug!(
        "Applied moves: {} moved, {} skipped, {} failed",
        report.moved, report.skipped, report.failed
    );
    report
}

enum Outcome {
    Moved,
    NotAFile,
    KeepAtRoot,
    AlreadyInPlace,
    DestinationExists(String),
    Failed(Error),
}

fn apply_one(root: &Path, m: &Move) -> Outcome {
    let source = join_relative(root, &m.path);
    if !source.is_file() {
        return Outcome::NotAFile;
    }
    if m.is_root() {
        return Outcome::KeepAtRoot;
    }

    let Some(file_name) = source.file_name() else {
        return Outcome::NotAFile;
    };
    let target_dir = join_relative(root, &m.target_folder);
    let destination = target_dir.join(file_name);

    if destination.exists() {
        if same_file(&source, &destination) {
            return Outcome::AlreadyInPlace;
        }
        let shown = pathdiff::diff_paths(&destination, root).unwrap_or(destination);
        return Outcome::DestinationExists(shown.display().to_string());
    }

    if let Err(e) = fs::create_dir_all(&target_dir) {
        return Outcome::Failed(Error::io(&target_dir, e));
    }

    match move_file(&source, &destination) {
        Ok(()) => Outcome::Moved,
        Err(e) => Outcome::Failed(e),
    }
}

/// Renames `source` to `destination`, copying across filesystems if needed.
///
/// On failure the file stays at `source` only.
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            debug!(
                "Rename of {} crosses devices, falling back to copy",
                source.display()
            );
            copy_then_remove(source, destination)
        }
        Err(e) => Err(Error::io(source, e)),
    }
}

fn crosses_devices(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

fn copy_then_remove(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).map_err(|e| {
        let _ = fs::remove_file(destination);
        Error::io(destination, e)
    })?;

    fs::remove_file(source).map_err(|e| {
        if let Err(cleanup) = fs::remove_file(destination) {
            warn!("Could not remove copy {}: {}", destination.display(), cleanup);
        }
        Error::io(source, e)
    })
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Cursor;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_dry_run_lists_moves_without_touching_disk() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();

        let moves = vec![Move::new("a.txt", "docs"), Move::new("b.png", ".")];
        let mut out = Vec::new();
        dry_run(&moves, &mut out).unwrap();

        let text = output(out);
        assert!(text.starts_with("Dry run - would move:\n"));
        assert!(text.contains("  a.txt  ->  docs/\n"));
        assert!(text.contains("  b.png  ->  (keep at root)\n"));
        assert!(temp.child("a.txt").exists());
        assert!(!temp.child("docs").exists());
    }

    #[test]
    fn test_confirm_accepts_only_yes() {
        for (answer, expected) in [
            ("y\n", true),
            ("YES\n", true),
            ("  Yes  \n", true),
            ("n\n", false),
            ("yep\n", false),
            ("\n", false),
            ("", false),
        ] {
            let mut out = Vec::new();
            let consent = confirm(&mut Cursor::new(answer), &mut out);
            assert_eq!(consent, expected, "answer {answer:?}");
            assert_eq!(output(out), "Apply these moves? [y/N] ");
        }
    }

    #[test]
    fn test_apply_moves_file_into_new_folder() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("hello").unwrap();
        temp.child("sub/b.md").write_str("b").unwrap();

        let moves = vec![
            Move::new("a.txt", "docs/text"),
            Move::new("sub/b.md", "notes"),
        ];
        let mut out = Vec::new();
        let report = apply_moves(temp.path(), &moves, &mut out);

        assert_eq!(report.moved, 2);
        assert!(!temp.child("a.txt").exists());
        temp.child("docs/text/a.txt").assert("hello");
        temp.child("notes/b.md").assert("b");
        assert!(output(out).contains("  Moved: a.txt -> docs/text/"));
    }

    #[test]
    fn test_existing_destination_leaves_both_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("new").unwrap();
        temp.child("docs/a.txt").write_str("old").unwrap();

        let mut out = Vec::new();
        let report = apply_moves(temp.path(), &[Move::new("a.txt", "docs")], &mut out);

        assert_eq!(report, ApplyReport { moved: 0, skipped: 1, failed: 0 });
        temp.child("a.txt").assert("new");
        temp.child("docs/a.txt").assert("old");
        assert!(output(out).contains("Skip (destination exists): a.txt -> docs/a.txt"));
    }

    #[test]
    fn test_missing_source_and_root_target_are_skipped() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("keep.txt").write_str("k").unwrap();
        temp.child("folder").create_dir_all().unwrap();

        let moves = vec![
            Move::new("gone.txt", "docs"),
            Move::new("folder", "docs"),
            Move::new("keep.txt", "."),
        ];
        let mut out = Vec::new();
        let report = apply_moves(temp.path(), &moves, &mut out);

        assert_eq!(report, ApplyReport { moved: 0, skipped: 3, failed: 0 });
        assert!(temp.child("keep.txt").exists());
        assert!(!temp.child("docs").exists());
        let text = output(out);
        assert!(text.contains("Skip (not a file): gone.txt"));
        assert!(text.contains("Skip (not a file): folder"));
    }

    #[test]
    fn test_move_to_current_folder_is_noop() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("docs/a.txt").write_str("a").unwrap();

        let mut out = Vec::new();
        let report = apply_moves(temp.path(), &[Move::new("docs/a.txt", "docs")], &mut out);

        assert_eq!(report.skipped, 1);
        temp.child("docs/a.txt").assert("a");
        assert!(output(out).contains("Already in place: docs/a.txt"));
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();
        temp.child("b.txt").write_str("b").unwrap();
        // A regular file where the target folder should be.
        temp.child("blocked").write_str("x").unwrap();

        let moves = vec![Move::new("a.txt", "blocked"), Move::new("b.txt", "ok")];
        let mut out = Vec::new();
        let report = apply_moves(temp.path(), &moves, &mut out);

        assert_eq!(report, ApplyReport { moved: 1, skipped: 0, failed: 1 });
        temp.child("a.txt").assert("a");
        temp.child("ok/b.txt").assert("b");
        assert!(output(out).contains("Error moving a.txt"));
    }

    #[test]
    fn test_only_cross_device_errors_fall_back_to_copy() {
        assert!(crosses_devices(&io::Error::from(io::ErrorKind::CrossesDevices)));
        assert!(!crosses_devices(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!crosses_devices(&io::Error::from(io::ErrorKind::NotFound)));
    }

    #[test]
    fn test_failed_rename_leaves_no_copy() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();
        // A non-empty directory at the destination makes the rename fail.
        temp.child("dest/inner.txt").write_str("x").unwrap();

        let err = move_file(temp.child("a.txt").path(), temp.child("dest").path()).unwrap_err();

        assert!(err.is_io());
        temp.child("a.txt").assert("a");
        temp.child("dest/inner.txt").assert("x");
        assert!(!temp.child("dest/a.txt").exists());
    }

    #[test]
    fn test_copy_then_remove_moves_contents() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("hello").unwrap();
        temp.child("docs").create_dir_all().unwrap();

        copy_then_remove(temp.child("a.txt").path(), temp.child("docs/a.txt").path()).unwrap();

        assert!(!temp.child("a.txt").exists());
        temp.child("docs/a.txt").assert("hello");
    }

    #[test]
    fn test_failed_copy_keeps_source_only() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();

        let err = copy_then_remove(temp.child("a.txt").path(), temp.child("missing/a.txt").path())
            .unwrap_err();

        assert!(err.is_io());
        temp.child("a.txt").assert("a");
        assert!(!temp.child("missing").exists());
    }
}
