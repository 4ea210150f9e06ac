use crate::error::{Error, Result};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info};

/// Writes a document to disk without ever leaving it half written.
pub struct ChangelogWriter {
    output_path: PathBuf,
    backup_existing: bool,
}

impl ChangelogWriter {
    /// Creates a writer targeting `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            backup_existing: false,
        }
    }

    /// Keeps a timestamped copy of an existing file before replacing it.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Target path.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Writes `content` to the target path.
    ///
    /// Returns the backup path when one was made.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup, the temporary file or the final
    /// rename fails.
    pub fn write(&self, content: &str) -> Result<Option<PathBuf>> {
        let backup = if self.backup_existing && self.output_path.is_file() {
            Some(backup_file(&self.output_path)?)
        } else {
            None
        };

        write_file_atomic(&self.output_path, content)?;
        info!("Wrote {} bytes to {}", content.len(), self.output_path.display());
        Ok(backup)
    }
}

/// Writes to a sibling temporary file, syncs it, then renames over `path`.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_path_for(path)?;
    let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

    let written = temp_file
        .write_all(content.as_bytes())
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, e)
    })
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_path(path, "not a file path"))?
        .to_string_lossy();
    Ok(path.with_file_name(format!(".{file_name}.tmp")))
}

/// Copies `path` to `<name>.backup.<nanos>` next to it.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::invalid_path(path, "not a file path"))?
        .to_string_lossy();
    let backup_path = path.with_file_name(format!("{file_name}.backup.{timestamp}"));

    fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

    debug!("Created backup: {}", backup_path.display());
    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn entry_names(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_writes_new_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("CHANGELOG.md");

        let backup = ChangelogWriter::new(output.path()).write("# Changelog\n").unwrap();

        assert!(backup.is_none());
        output.assert("# Changelog\n");
        assert_eq!(entry_names(temp.path()), vec!["CHANGELOG.md"]);
    }

    #[test]
    fn test_replaces_existing_without_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("CHANGELOG.md");
        output.write_str("old").unwrap();

        ChangelogWriter::new(output.path()).write("new\n").unwrap();

        output.assert("new\n");
        assert!(!entry_names(temp.path()).iter().any(|n| n.contains(".backup.")));
    }

    #[test]
    fn test_creates_backup() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("CHANGELOG.md");
        output.write_str("old content").unwrap();

        let backup = ChangelogWriter::new(output.path())
            .backup_existing(true)
            .write("new content\n")
            .unwrap()
            .unwrap();

        output.assert("new content\n");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old content");
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("CHANGELOG.md.backup.")
        );
    }

    #[test]
    fn test_missing_parent_directory_fails() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("missing/dir/CHANGELOG.md");

        let err = ChangelogWriter::new(output.path()).write("x").unwrap_err();
        assert!(err.is_io());
    }
}
