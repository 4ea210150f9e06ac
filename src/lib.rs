//! # sortai
//!
//! Two small tools sharing one library:
//!
//! - **sortai** lists a directory, asks a Gemini model for a folder layout
//!   and, after confirmation, moves the files.
//! - **logcraft** turns conventional-commit history into a Markdown
//!   changelog.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sortai::{SortConfig, SortPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = SortConfig::builder()
//!     .root_dir("./downloads")
//!     .max_depth(1)
//!     .api_key(std::env::var("GEMINI_API_KEY").ok())
//!     .build()?;
//!
//! let stdin = std::io::stdin();
//! let stats = SortPipeline::new(config)?.run(&mut stdin.lock(), &mut std::io::stdout())?;
//! println!("{} moves suggested", stats.suggested_moves);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The sorter is a linear pipeline:
//! 1. **Scanner**: lists files up to a depth and extracts short previews
//! 2. **Suggester**: prompts the model and validates the moves it returns
//! 3. **Executor**: previews, confirms and applies the moves
//!
//! The changelog side reads history through [`CommitSource`], categorizes
//! commits with [`changelog`] and writes the result with [`ChangelogWriter`].

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod executor;
mod file;
mod git;
mod pipeline;
mod preview;
mod scanner;
mod suggester;
mod template;
mod writer;

pub mod changelog;

pub use client::{GeminiClient, TextGenerator};
pub use config::{
    ChangelogConfig, ChangelogConfigBuilder, SortConfig, SortConfigBuilder, API_KEY_ENV,
};
pub use error::{Error, Result, API_KEY_URL};
pub use executor::{apply_moves, confirm, dry_run, ApplyReport};
pub use file::{FileEntry, PreviewKind};
pub use git::{CommitSource, GitCli};
pub use pipeline::{ChangelogPipeline, ChangelogStats, SortOutcome, SortPipeline, SortStats};
pub use preview::{content_preview, CONTENT_PREVIEW_LENGTH};
pub use scanner::list_files;
pub use suggester::{
    model_candidates, parse_moves, retain_within_depth, Move, MoveSuggester, ROOT_FOLDER,
};
pub use writer::ChangelogWriter;

/// Runs the sorter against the terminal: confirmation from stdin, report to stdout.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid or no API key is set
/// - The root directory cannot be listed
/// - The model call fails
///
/// # Examples
///
/// ```no_run
/// use sortai::{SortConfig, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = SortConfig::builder()
///     .root_dir(".")
///     .api_key(Some("my-key".to_string()))
///     .build()?;
///
/// run(config)?;
/// # Ok(())
/// # }
/// ```
pub fn run(config: SortConfig) -> Result<SortStats> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout().lock();
    SortPipeline::new(config)?.run(&mut input, &mut out)
}

/// Generates the changelog for the repository in `config`, reporting to stdout.
///
/// # Errors
///
/// Returns an error if the repository or tag cannot be resolved, or the
/// output cannot be written.
pub fn generate_changelog(config: ChangelogConfig) -> Result<ChangelogStats> {
    let mut out = std::io::stdout().lock();
    ChangelogPipeline::new(config)?.run(&mut out)
}
