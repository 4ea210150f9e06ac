use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Page where a Gemini API key can be created.
pub const API_KEY_URL: &str = "https://aistudio.google.com/app/apikey";

/// Error types shared by the sorter and the changelog generator.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// The model API credential is not configured.
    #[error("{env_var} is not set. Get an API key at: {url}", url = API_KEY_URL)]
    MissingApiKey {
        /// Environment variable the credential is normally read from
        env_var: String,
    },

    /// A user supplied path is unusable.
    #[error("{reason}: {path}")]
    InvalidPath {
        /// Offending path
        path: PathBuf,
        /// Why the path was rejected
        reason: String,
    },

    /// The requested model does not exist for this API key.
    #[error("Model '{model}' not found{}", format_available(.available))]
    ModelNotFound {
        /// Model name that was requested
        model: String,
        /// Models the API reported as available, if they could be listed
        available: Vec<String>,
    },

    /// The model API answered with a non-success status.
    #[error("Model API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// The HTTP request itself failed.
    #[error("Request failed: {message}")]
    Http {
        /// Error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Git repository access failed.
    #[error("{message}")]
    Git {
        /// Error message
        message: String,
    },

    /// The `--since` tag does not resolve to a commit.
    #[error("Invalid or missing tag '{tag}': {message}")]
    InvalidTag {
        /// Tag that was requested
        tag: String,
        /// Underlying git message
        message: String,
    },
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available models: {}", available.join(", "))
    }
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a missing credential error.
    #[must_use]
    pub fn missing_api_key(env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            env_var: env_var.into(),
        }
    }

    /// Creates an invalid path error.
    #[must_use]
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a model-not-found error without suggestions.
    #[must_use]
    pub fn model_not_found(model: impl Into<String>) -> Self {
        Self::ModelNotFound {
            model: model.into(),
            available: Vec::new(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            template: template.into(),
            message: source.to_string(),
        }
    }

    /// Creates a git error.
    #[must_use]
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }

    /// Creates an invalid tag error.
    #[must_use]
    pub fn invalid_tag(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTag {
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the model could not be found.
    #[must_use]
    pub const fn is_model_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound { .. })
    }
}

impl From<tera::Error> for Error {
    fn from(e: tera::Error) -> Self {
        Self::Template {
            template: "unknown".to_string(),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http {
            message: e.to_string(),
        }
    }
}
