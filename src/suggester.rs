use crate::{
    client::TextGenerator,
    error::{Error, Result},
    file::FileEntry,
    template::TemplateEngine,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("fence pattern is valid")
});

/// Target folder meaning "leave the file where it is".
pub const ROOT_FOLDER: &str = ".";

/// A proposed relocation of one file into a folder below the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Move {
    /// Source path as listed in the manifest
    pub path: String,

    /// Destination folder, `"."` for the root
    pub target_folder: String,
}

impl Move {
    /// Creates a move.
    #[must_use]
    pub fn new(path: impl Into<String>, target_folder: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target_folder: target_folder.into(),
        }
    }

    /// Returns true if the file stays at the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.target_folder == ROOT_FOLDER
    }

    /// Number of folder segments in the target (0 for the root).
    #[must_use]
    pub fn target_depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.target_folder.split('/').count()
        }
    }
}

/// Asks a model for a folder layout and turns its reply into validated moves.
pub struct MoveSuggester {
    generator: Box<dyn TextGenerator>,
    model: String,
    max_depth: usize,
    enforce_depth: bool,
    templates: TemplateEngine,
}

impl MoveSuggester {
    /// Creates a suggester that queries `model` through `generator`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt template cannot be loaded.
    pub fn new(
        generator: Box<dyn TextGenerator>,
        model: impl Into<String>,
        max_depth: usize,
    ) -> Result<Self> {
        Ok(Self {
            generator,
            model: model.into(),
            max_depth,
            enforce_depth: true,
            templates: TemplateEngine::new()?,
        })
    }

    /// Keeps or drops suggestions deeper than the maximum depth.
    #[must_use]
    pub fn enforce_depth(mut self, enabled: bool) -> Self {
        self.enforce_depth = enabled;
        self
    }

    /// Builds the prompt the model receives for `files`.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn build_prompt(&self, files: &[FileEntry]) -> Result<String> {
        self.templates.render_prompt(files, self.max_depth)
    }

    /// Returns validated moves for `files`.
    ///
    /// An unparseable reply yields no moves; service failures are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be reached or does not exist.
    #[instrument(skip(self, files), fields(model = %self.model, files = files.len()))]
    pub fn suggest(&self, files: &[FileEntry]) -> Result<Vec<Move>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = self.build_prompt(files)?;
        let reply = self.generate_with_fallback(&prompt)?;
        let moves = parse_moves(&reply, files);

        let moves = if self.enforce_depth {
            retain_within_depth(moves, self.max_depth)
        } else {
            moves
        };

        info!("Model suggested {} valid moves", moves.len());
        Ok(moves)
    }

    /// Tries each spelling of the model name; only "not found" moves on.
    fn generate_with_fallback(&self, prompt: &str) -> Result<String> {
        for candidate in model_candidates(&self.model) {
            match self.generator.generate(&candidate, prompt) {
                Ok(text) => return Ok(text.trim().to_string()),
                Err(e) if e.is_model_not_found() => {
                    debug!("Model '{}' not found, trying next spelling", candidate);
                }
                Err(e) => return Err(e),
            }
        }

        let available = self.generator.list_models().unwrap_or_else(|e| {
            debug!("Could not list models: {}", e);
            Vec::new()
        });
        Err(Error::ModelNotFound {
            model: self.model.clone(),
            available,
        })
    }
}

/// Spellings of `model` to try, in order.
///
/// A `models/` prefix addresses the same endpoint as the bare name, so the
/// two never appear as separate candidates.
#[must_use]
pub fn model_candidates(model: &str) -> Vec<String> {
    let requested = model.trim();
    let bare = requested.strip_prefix("models/").unwrap_or(requested);

    let mut candidates = vec![requested.to_string()];
    if !bare.ends_with("-latest") {
        candidates.push(format!("{bare}-latest"));
    }
    candidates
}

/// Extracts moves from a model reply, keeping only paths present in `files`.
///
/// The JSON may be wrapped in a fenced code block. Malformed JSON, or JSON
/// without a `moves` array, yields no moves.
#[must_use]
pub fn parse_moves(reply: &str, files: &[FileEntry]) -> Vec<Move> {
    let valid_paths: HashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();

    let text = reply.trim();
    let json_text = FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str().trim());

    let data: Value = match serde_json::from_str(json_text) {
        Ok(data) => data,
        Err(e) => {
            warn!("Model reply is not valid JSON: {}", e);
            return Vec::new();
        }
    };

    let Some(raw_moves) = data.get("moves").and_then(Value::as_array) else {
        warn!("Model reply has no \"moves\" array");
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut moves = Vec::new();

    for raw in raw_moves {
        let Some(entry) = raw.as_object() else {
            continue;
        };
        let Some(path) = entry.get("path").and_then(scalar_to_string) else {
            continue;
        };
        let path = path.trim();

        if !valid_paths.contains(path) {
            debug!("Dropping move for unknown path: {}", path);
            continue;
        }

        let raw_target = entry
            .get("target_folder")
            .and_then(scalar_to_string)
            .unwrap_or_default();
        let Some(target_folder) = normalize_target(&raw_target) else {
            warn!("Dropping move of {} to unsafe folder '{}'", path, raw_target);
            continue;
        };

        if !seen.insert(path.to_string()) {
            debug!("Ignoring repeated suggestion for {}", path);
            continue;
        }
        moves.push(Move::new(path, target_folder));
    }

    moves
}

/// Drops moves whose target has more folder segments than `max_depth`.
#[must_use]
pub fn retain_within_depth(moves: Vec<Move>, max_depth: usize) -> Vec<Move> {
    moves
        .into_iter()
        .filter(|m| {
            let within = m.target_depth() <= max_depth;
            if !within {
                warn!(
                    "Dropping move of {} to '{}': deeper than {} levels",
                    m.path, m.target_folder, max_depth
                );
            }
            within
        })
        .collect()
}

/// Normalizes a suggested folder to `/` separated segments below the root.
///
/// Returns `None` for absolute paths and paths that climb out with `..`.
fn normalize_target(raw: &str) -> Option<String> {
    let target = raw.trim().replace('\\', "/");

    if target.starts_with('/') || has_drive_prefix(&target) {
        return None;
    }

    let segments: Vec<&str> = target
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.contains(&"..") {
        return None;
    }

    if segments.is_empty() {
        Some(ROOT_FOLDER.to_string())
    } else {
        Some(segments.join("/"))
    }
}

fn has_drive_prefix(target: &str) -> bool {
    let bytes = target.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
