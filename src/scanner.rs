use crate::{
    config::SortConfig,
    error::{Error, Result},
    file::{has_preview_extension, FileEntry},
    preview::{content_preview, CONTENT_PREVIEW_LENGTH},
};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during scanning.
#[derive(Debug, Default, Clone)]
pub(crate) struct ScanStats {
    /// Files listed
    pub total_files: usize,

    /// Files that produced a preview
    pub previewed_files: usize,

    /// Walk errors encountered
    pub errors: usize,
}

/// Lists files below a root directory up to a folder depth.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    max_depth: usize,
    preview_limit: usize,
}

impl Scanner {
    /// Creates a new scanner from configuration.
    pub(crate) fn new(config: &SortConfig) -> Self {
        Self {
            root_dir: config.root_dir.clone(),
            max_depth: config.max_depth,
            preview_limit: config.preview_limit,
        }
    }

    /// Walks the root and returns one entry per file, sorted by path.
    ///
    /// Files directly in the root are at depth 0; directories nested deeper
    /// than `max_depth` are not entered.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory.
    pub(crate) fn scan(&self) -> Result<Vec<FileEntry>> {
        let root = self
            .root_dir
            .canonicalize()
            .map_err(|e| Error::io(&self.root_dir, e))?;
        if !root.is_dir() {
            return Err(Error::invalid_path(&self.root_dir, "not a directory"));
        }

        debug!(
            "Scanning {} (max depth {})",
            root.display(),
            self.max_depth
        );

        let mut stats = ScanStats::default();
        let mut files = Vec::new();

        // WalkDir counts the root itself as depth 0, so root files sit at 1.
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(self.max_depth.saturating_add(1))
            .follow_links(false)
            .sort_by_file_name();

        for result in walker {
            match result {
                Ok(entry) if is_listed_file(&entry) => {
                    if let Some(file_entry) = self.process_entry(&entry, &root) {
                        stats.total_files += 1;
                        if file_entry.content_preview.is_some() {
                            stats.previewed_files += 1;
                        }
                        files.push(file_entry);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Walk error: {}", e);
                    stats.errors += 1;
                }
            }
        }

        debug!(
            "Scan complete: {} files, {} with previews, {} errors",
            stats.total_files, stats.previewed_files, stats.errors
        );

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn process_entry(&self, entry: &DirEntry, root: &Path) -> Option<FileEntry> {
        let path = entry.path();
        trace!("Processing file: {}", path.display());

        let Some(relative) = pathdiff::diff_paths(path, root) else {
            warn!("Could not get relative path for: {}", path.display());
            return None;
        };
        let relative_path = to_forward_slashes(&relative);

        let preview = if has_preview_extension(path) {
            content_preview(path, self.preview_limit)
        } else {
            None
        };

        Some(FileEntry::new(relative_path).with_preview(preview))
    }
}

/// Lists files below `root` up to `max_depth` folder levels with default previews.
///
/// # Errors
///
/// Returns an error if `root` does not exist or is not a directory.
///
/// # Examples
///
/// ```no_run
/// let files = sortai::list_files(std::path::Path::new("./downloads"), 1)?;
/// for file in &files {
///     println!("{}", file.path);
/// }
/// # Ok::<(), sortai::Error>(())
/// ```
pub fn list_files(root: &Path, max_depth: usize) -> Result<Vec<FileEntry>> {
    Scanner {
        root_dir: root.to_path_buf(),
        max_depth,
        preview_limit: CONTENT_PREVIEW_LENGTH,
    }
    .scan()
}

fn is_listed_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
