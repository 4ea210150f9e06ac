//! Best-effort text excerpts for the file types the model can learn from.
//!
//! Every extractor returns `None` on failure; a missing preview only means the
//! model sees the file name alone.

use crate::file::PreviewKind;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, trace};

/// Default number of characters kept per preview.
pub const CONTENT_PREVIEW_LENGTH: usize = 500;

/// Returns at most `limit` characters of representative text from `path`.
///
/// Returns `None` for unsupported types, empty documents and any read or
/// parse failure.
#[must_use]
pub fn content_preview(path: &Path, limit: usize) -> Option<String> {
    let kind = PreviewKind::for_path(path)?;
    trace!("Extracting {:?} preview from {}", kind, path.display());

    let preview = match kind {
        PreviewKind::Text => read_text_preview(path, limit),
        PreviewKind::Pdf => read_pdf_preview(path, limit),
        PreviewKind::Docx => read_docx_preview(path, limit),
    };

    if preview.is_none() {
        debug!("No preview for {}", path.display());
    }
    preview
}

fn read_text_preview(path: &Path, limit: usize) -> Option<String> {
    // A UTF-8 character is at most four bytes.
    let max_bytes = u64::try_from(limit.saturating_mul(4)).unwrap_or(u64::MAX);

    let file = File::open(path).ok()?;
    let mut bytes = Vec::new();
    file.take(max_bytes).read_to_end(&mut bytes).ok()?;

    non_empty(truncate_chars(&String::from_utf8_lossy(&bytes), limit))
}

fn read_pdf_preview(path: &Path, limit: usize) -> Option<String> {
    let doc = match lopdf::Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Failed to load PDF {}: {}", path.display(), e);
            return None;
        }
    };

    let first_page = doc.get_pages().keys().next().copied()?;
    let text = doc.extract_text(&[first_page]).ok()?;

    non_empty(truncate_chars(&text, limit))
}

fn read_docx_preview(path: &Path, limit: usize) -> Option<String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let bytes = fs::read(path).ok()?;
    let docx = match docx_rs::read_docx(&bytes) {
        Ok(docx) => docx,
        Err(e) => {
            debug!("DOCX parsing failed for {}: {}", path.display(), e);
            return None;
        }
    };

    let mut parts: Vec<String> = Vec::new();
    let mut collected = 0;

    for child in &docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };

        let mut text = String::new();
        for paragraph_child in &paragraph.children {
            if let ParagraphChild::Run(run) = paragraph_child {
                for run_child in &run.children {
                    if let RunChild::Text(t) = run_child {
                        text.push_str(&t.text);
                    }
                }
            }
        }

        if text.is_empty() {
            continue;
        }
        collected += text.chars().count();
        parts.push(text);
        if collected >= limit {
            break;
        }
    }

    non_empty(truncate_chars(&parts.join(" "), limit))
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
