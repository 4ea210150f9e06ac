use serde::Serialize;
use std::path::Path;

/// One file in a directory manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// Path relative to the listed root, `/` separated
    pub path: String,

    /// File name without directories
    pub name: String,

    /// Leading text of the file, when the type supports it
    pub content_preview: Option<String>,
}

impl FileEntry {
    /// Creates an entry without a preview, deriving the name from the path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            path,
            name,
            content_preview: None,
        }
    }

    /// Attaches a content preview.
    #[must_use]
    pub fn with_preview(mut self, preview: Option<String>) -> Self {
        self.content_preview = preview;
        self
    }

    /// Number of `/` separated segments in the path, file name included.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.path.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// How a file's preview is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    /// Plain UTF-8 text (txt, md, csv)
    Text,
    /// First page of a PDF
    Pdf,
    /// Paragraph text of a Word document
    Docx,
}

impl PreviewKind {
    /// Picks the extractor for `path` by its lowercased extension.
    #[must_use]
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = lowercase_extension(path)?;
        match ext.as_str() {
            "txt" | "md" | "csv" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

/// Checks if a file extension is on the preview allow-list.
#[must_use]
pub(crate) fn has_preview_extension(path: &Path) -> bool {
    PreviewKind::for_path(path).is_some()
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
