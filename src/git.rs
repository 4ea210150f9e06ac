//! Commit history access through the `git` command line.

use crate::{
    changelog::CommitRecord,
    error::{Error, Result},
};
use chrono::DateTime;
use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tracing::{debug, instrument, trace};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%cI%x1f%B%x1e";

/// Something that can list commits, newest first.
pub trait CommitSource {
    /// Returns commits reachable from `HEAD`, newest first.
    ///
    /// With `since_tag`, only commits not reachable from that tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTag`] for an unknown tag and [`Error::Git`]
    /// for any other history failure.
    fn commits(&self, since_tag: Option<&str>) -> Result<Vec<CommitRecord>>;
}

/// A repository read by invoking the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    work_tree: PathBuf,
}

impl GitCli {
    /// Finds the repository containing `dir`, searching parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if `git` cannot be run or `dir` is not inside a
    /// repository.
    pub fn discover(dir: &Path) -> Result<Self> {
        let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
        if !output.status.success() {
            debug!("rev-parse failed: {}", stderr_text(&output));
            return Err(Error::git(format!(
                "Not a git repository (or any parent): {}",
                dir.display()
            )));
        }

        let work_tree = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!("Using repository at {}", work_tree.display());
        Ok(Self { work_tree })
    }

    /// Root of the working tree.
    #[must_use]
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn verify_tag(&self, tag: &str) -> Result<()> {
        let spec = format!("{tag}^{{commit}}");
        let output = run_git(&self.work_tree, &["rev-parse", "--verify", "--quiet", &spec])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(Error::invalid_tag(tag, "no such tag or commit"))
        }
    }
}

impl CommitSource for GitCli {
    #[instrument(skip(self), fields(repo = %self.work_tree.display()))]
    fn commits(&self, since_tag: Option<&str>) -> Result<Vec<CommitRecord>> {
        let range = match since_tag {
            Some(tag) => {
                self.verify_tag(tag)?;
                format!("{tag}..HEAD")
            }
            None => "HEAD".to_string(),
        };

        let output = run_git(&self.work_tree, &["log", LOG_FORMAT, &range, "--"])?;
        if !output.status.success() {
            let message = stderr_text(&output);
            return Err(match since_tag {
                Some(tag) => Error::invalid_tag(tag, message),
                None => Error::git(format!("Failed to read history: {message}")),
            });
        }

        let records = parse_log(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Read {} commits", records.len());
        Ok(records)
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Output> {
    trace!("git -C {} {}", dir.display(), args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| Error::git(format!("Failed to run git: {e}")))
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Parses `git log` output written with [`LOG_FORMAT`].
fn parse_log(raw: &str) -> Result<Vec<CommitRecord>> {
    raw.split(RECORD_SEP)
        .map(|record| record.trim_start_matches(['\n', '\r']))
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitRecord> {
    let mut fields = record.splitn(3, FIELD_SEP);
    let (Some(hash), Some(date), Some(message)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(Error::git(format!("Unexpected git log record: {record:?}")));
    };

    let committed_at = DateTime::parse_from_rfc3339(date.trim())
        .map_err(|e| Error::git(format!("Invalid commit date '{date}': {e}")))?;

    Ok(CommitRecord {
        hash: hash.trim().to_string(),
        committed_at,
        message: message.trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|o| o.status.success())
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .env("GIT_COMMITTER_DATE", "2024-06-01T12:00:00+02:00")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn commit(dir: &Path, message: &str) {
        git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
    }

    fn repo_with_history() -> assert_fs::TempDir {
        let temp = assert_fs::TempDir::new().unwrap();
        git(temp.path(), &["init", "-q"]);
        commit(temp.path(), "feat: first");
        git(temp.path(), &["tag", "v1.0.0"]);
        commit(temp.path(), "fix: second");
        commit(temp.path(), "chore(deps): third\n\nbody line");
        temp
    }

    #[test]
    fn test_parse_log_records() {
        let raw = "abc123\u{1f}2024-03-05T23:30:00-05:00\u{1f}feat: x\n\nbody\n\u{1e}\n\
                   def456\u{1f}2024-03-04T10:00:00+00:00\u{1f}fix: y\n\u{1e}\n";

        let records = parse_log(raw).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hash, "abc123");
        assert_eq!(records[0].message, "feat: x\n\nbody");
        assert_eq!(records[0].committed_at.format("%Y-%m-%d").to_string(), "2024-03-05");
        assert_eq!(records[1].hash, "def456");
    }

    #[test]
    fn test_parse_log_rejects_garbage() {
        assert!(parse_log("not a record").is_err());
        assert!(parse_log("").unwrap().is_empty());
    }

    #[test]
    fn test_full_history_newest_first() {
        if !git_available() {
            return;
        }
        let temp = repo_with_history();

        let repo = GitCli::discover(temp.path()).unwrap();
        let commits = repo.commits(None).unwrap();

        let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["chore(deps): third\n\nbody line", "fix: second", "feat: first"]
        );
        assert_eq!(commits[0].hash.len(), 40);
        assert_eq!(
            commits[0].committed_at.to_rfc3339(),
            "2024-06-01T12:00:00+02:00"
        );
    }

    #[test]
    fn test_since_tag_excludes_tagged_history() {
        if !git_available() {
            return;
        }
        let temp = repo_with_history();

        let repo = GitCli::discover(temp.path()).unwrap();
        let commits = repo.commits(Some("v1.0.0")).unwrap();

        assert_eq!(commits.len(), 2);
        assert!(commits.iter().all(|c| !c.message.starts_with("feat: first")));
    }

    #[test]
    fn test_unknown_tag_is_invalid_tag_error() {
        if !git_available() {
            return;
        }
        let temp = repo_with_history();

        let repo = GitCli::discover(temp.path()).unwrap();
        let err = repo.commits(Some("v9.9.9")).unwrap_err();

        assert!(matches!(err, Error::InvalidTag { ref tag, .. } if tag == "v9.9.9"));
        assert!(err.to_string().starts_with("Invalid or missing tag 'v9.9.9'"));
    }

    #[test]
    fn test_discover_from_subdirectory() {
        if !git_available() {
            return;
        }
        let temp = repo_with_history();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let repo = GitCli::discover(&nested).unwrap();

        assert_eq!(
            repo.work_tree().canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_discover_outside_repository() {
        if !git_available() {
            return;
        }
        let temp = assert_fs::TempDir::new().unwrap();
        // Skipped when the temp directory itself sits inside a repository.
        let status = Command::new("git")
            .arg("-C")
            .arg(temp.path())
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .unwrap();
        if status.status.success() {
            return;
        }

        let err = GitCli::discover(temp.path()).unwrap_err();
        assert!(err.to_string().starts_with("Not a git repository"));
    }

    #[test]
    fn test_empty_repository_is_an_error() {
        if !git_available() {
            return;
        }
        let temp = assert_fs::TempDir::new().unwrap();
        git(temp.path(), &["init", "-q"]);

        let repo = GitCli::discover(temp.path()).unwrap();
        assert!(repo.commits(None).is_err());
    }
}
