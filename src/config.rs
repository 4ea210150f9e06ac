use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable the CLI reads the Gemini credential from.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_MAX_DEPTH: usize = 1;
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PREVIEW_LIMIT: usize = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CHANGELOG_PATH: &str = "CHANGELOG.md";

/// Configuration for the folder-layout suggester.
///
/// Use [`SortConfig::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct SortConfig {
    /// Directory whose files should be organized
    pub root_dir: PathBuf,

    /// Maximum folder depth below the root (0 = root files only)
    pub max_depth: usize,

    /// Model name to ask for suggestions
    pub model: String,

    /// Model API credential
    pub api_key: Option<String>,

    /// Base URL of the model REST API
    pub api_base: String,

    /// Whether to move files after confirmation
    pub apply: bool,

    /// Maximum characters of content preview per file
    pub preview_limit: usize,

    /// HTTP timeout for model calls
    pub timeout: Duration,

    /// Drop suggested folders deeper than `max_depth`
    pub enforce_depth: bool,
}

impl SortConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sortai::SortConfig;
    ///
    /// let config = SortConfig::builder()
    ///     .root_dir("./downloads")
    ///     .max_depth(2)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> SortConfigBuilder {
        SortConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - Preview limit is zero
    /// - Model name is empty
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::invalid_path(&self.root_dir, "path does not exist"));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::invalid_path(&self.root_dir, "not a directory"));
        }

        if self.preview_limit == 0 {
            return Err(Error::config("preview_limit must be greater than 0"));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model name must not be empty"));
        }

        Ok(())
    }

    /// Returns the trimmed API key, failing before any network call if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingApiKey`] when no non-blank key is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::missing_api_key(API_KEY_ENV))
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            max_depth: DEFAULT_MAX_DEPTH,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            apply: false,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            enforce_depth: true,
        }
    }
}

/// Builder for creating a [`SortConfig`].
#[derive(Debug, Default)]
pub struct SortConfigBuilder {
    root_dir: Option<PathBuf>,
    max_depth: Option<usize>,
    model: Option<String>,
    api_key: Option<String>,
    api_base: Option<String>,
    apply: bool,
    preview_limit: Option<usize>,
    timeout: Option<Duration>,
    enforce_depth: Option<bool>,
}

impl SortConfigBuilder {
    /// Sets the directory to organize.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the maximum folder depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the model API credential.
    #[must_use]
    pub fn api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    /// Overrides the model REST API base URL.
    #[must_use]
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Enables moving files after confirmation.
    #[must_use]
    pub fn apply(mut self, enabled: bool) -> Self {
        self.apply = enabled;
        self
    }

    /// Sets the content preview length in characters.
    #[must_use]
    pub fn preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = Some(limit);
        self
    }

    /// Sets the HTTP timeout for model calls.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enables or disables dropping folders deeper than the maximum depth.
    #[must_use]
    pub fn enforce_depth(mut self, enabled: bool) -> Self {
        self.enforce_depth = Some(enabled);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<SortConfig> {
        let config = SortConfig {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            max_depth: self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: self.api_key,
            api_base: self
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            apply: self.apply,
            preview_limit: self.preview_limit.unwrap_or(DEFAULT_PREVIEW_LIMIT),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            enforce_depth: self.enforce_depth.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the changelog generator.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ChangelogConfig {
    /// Directory inside the git repository
    pub repo_dir: PathBuf,

    /// Only include commits after this tag
    pub since_tag: Option<String>,

    /// Where the changelog is written
    pub output_path: PathBuf,

    /// Print instead of writing a file
    pub dry_run: bool,

    /// Keep a timestamped copy of an existing output file
    pub backup_existing: bool,
}

impl ChangelogConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ChangelogConfigBuilder {
        ChangelogConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is blank or the output path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.since_tag.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(Error::config("since tag must not be empty"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("output path must not be empty"));
        }

        Ok(())
    }
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            since_tag: None,
            output_path: PathBuf::from(DEFAULT_CHANGELOG_PATH),
            dry_run: false,
            backup_existing: false,
        }
    }
}

/// Builder for creating a [`ChangelogConfig`].
#[derive(Debug, Default)]
pub struct ChangelogConfigBuilder {
    repo_dir: Option<PathBuf>,
    since_tag: Option<String>,
    output_path: Option<PathBuf>,
    dry_run: bool,
    backup_existing: bool,
}

impl ChangelogConfigBuilder {
    /// Sets the directory the repository is discovered from.
    #[must_use]
    pub fn repo_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.repo_dir = Some(path.into());
        self
    }

    /// Restricts history to commits after `tag`.
    #[must_use]
    pub fn since_tag(mut self, tag: Option<String>) -> Self {
        self.since_tag = tag;
        self
    }

    /// Sets the output file path.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Enables printing instead of writing.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables backup of an existing output file.
    #[must_use]
    pub fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<ChangelogConfig> {
        let config = ChangelogConfig {
            repo_dir: self.repo_dir.unwrap_or_else(|| PathBuf::from(".")),
            since_tag: self.since_tag,
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGELOG_PATH)),
            dry_run: self.dry_run,
            backup_existing: self.backup_existing,
        };

        config.validate()?;
        Ok(config)
    }
}
