use crate::{
    changelog::{commits_to_entries, render_markdown},
    client::{GeminiClient, TextGenerator},
    config::{ChangelogConfig, SortConfig},
    error::{Error, Result},
    executor::{apply_moves, confirm, dry_run, ApplyReport},
    git::{CommitSource, GitCli},
    scanner::Scanner,
    suggester::MoveSuggester,
    writer::ChangelogWriter,
};
use serde::Serialize;
use std::{
    io::{BufRead, Write},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, instrument};

/// How a sort run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOutcome {
    /// The directory had no files within the depth limit
    NoFiles,
    /// The model proposed no usable moves
    NoMoves,
    /// Moves were shown but not applied
    Previewed,
    /// The user declined the confirmation
    Aborted,
    /// Moves were applied
    Applied,
}

/// Statistics collected during a sort run.
#[derive(Debug, Clone, Serialize)]
pub struct SortStats {
    /// Files listed below the root
    pub total_files: usize,

    /// Files sent with a content preview
    pub previewed_files: usize,

    /// Valid moves the model suggested
    pub suggested_moves: usize,

    /// Per-move results when moves were applied
    pub apply: ApplyReport,

    /// How the run ended
    pub outcome: SortOutcome,

    /// Total execution time
    pub duration: Duration,

    /// Time spent listing files
    pub scan_duration: Duration,

    /// Time spent waiting for the model
    pub suggest_duration: Duration,

    /// Time spent moving files
    pub apply_duration: Duration,
}

impl SortStats {
    fn new(outcome: SortOutcome) -> Self {
        Self {
            total_files: 0,
            previewed_files: 0,
            suggested_moves: 0,
            apply: ApplyReport::default(),
            outcome,
            duration: Duration::ZERO,
            scan_duration: Duration::ZERO,
            suggest_duration: Duration::ZERO,
            apply_duration: Duration::ZERO,
        }
    }

    /// Logs a one-line summary at info level.
    pub fn log_summary(&self) {
        info!(
            "{} files, {} suggested moves, {} moved, {} skipped, {} failed in {:.2}s",
            self.total_files,
            self.suggested_moves,
            self.apply.moved,
            self.apply.skipped,
            self.apply.failed,
            self.duration.as_secs_f64()
        );
    }
}

/// Lists a directory, asks the model for a layout and optionally applies it.
pub struct SortPipeline {
    config: SortConfig,
    scanner: Scanner,
    suggester: MoveSuggester,
}

impl SortPipeline {
    /// Creates a pipeline that talks to the Gemini API.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - No API key is configured
    /// - The HTTP client cannot be built
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.require_api_key()?;
        let client = GeminiClient::new(config.api_base.clone(), api_key, config.timeout)?;
        Self::with_generator(config, Box::new(client))
    }

    /// Creates a pipeline that uses `generator` for suggestions.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_generator(config: SortConfig, generator: Box<dyn TextGenerator>) -> Result<Self> {
        config.validate()?;

        let scanner = Scanner::new(&config);
        let suggester = MoveSuggester::new(generator, config.model.clone(), config.max_depth)?
            .enforce_depth(config.enforce_depth);

        Ok(Self {
            config,
            scanner,
            suggester,
        })
    }

    /// Executes the run, reading confirmation from `input` and reporting on `out`.
    ///
    /// # Process
    ///
    /// 1. **List**: files below the root up to the depth limit
    /// 2. **Suggest**: ask the model and validate its moves
    /// 3. **Preview**: print every move
    /// 4. **Apply**: with `apply` set and the user's consent, move the files
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails, the model call fails, or `out`
    /// cannot be written. Individual move failures are only counted.
    #[instrument(skip_all, fields(root_dir = %self.config.root_dir.display()))]
    pub fn run(self, input: &mut impl BufRead, out: &mut impl Write) -> Result<SortStats> {
        let start_time = Instant::now();

        let scan_start = Instant::now();
        let files = self.scanner.scan()?;
        let scan_duration = scan_start.elapsed();

        let mut stats = SortStats::new(SortOutcome::NoFiles);
        stats.total_files = files.len();
        stats.previewed_files = files.iter().filter(|f| f.content_preview.is_some()).count();
        stats.scan_duration = scan_duration;

        info!(
            "Listed {} files ({} with previews) in {:.2}s",
            stats.total_files,
            stats.previewed_files,
            scan_duration.as_secs_f64()
        );

        if files.is_empty() {
            say(out, "No files found to organize.")?;
            return Ok(finish(stats, start_time));
        }

        let suggest_start = Instant::now();
        let moves = self.suggester.suggest(&files)?;
        stats.suggest_duration = suggest_start.elapsed();
        stats.suggested_moves = moves.len();

        if moves.is_empty() {
            stats.outcome = SortOutcome::NoMoves;
            say(out, "No moves suggested.")?;
            return Ok(finish(stats, start_time));
        }

        dry_run(&moves, out)?;

        if !self.config.apply {
            stats.outcome = SortOutcome::Previewed;
            say(out, "Run with --apply to perform moves.")?;
            return Ok(finish(stats, start_time));
        }

        if !confirm(input, out) {
            stats.outcome = SortOutcome::Aborted;
            say(out, "Aborted.")?;
            return Ok(finish(stats, start_time));
        }

        let apply_start = Instant::now();
        let root = self
            .config
            .root_dir
            .canonicalize()
            .map_err(|e| Error::io(&self.config.root_dir, e))?;
        stats.apply = apply_moves(&root, &moves, out);
        stats.apply_duration = apply_start.elapsed();
        stats.outcome = SortOutcome::Applied;

        say(out, "Done.")?;
        Ok(finish(stats, start_time))
    }
}

/// Result of a changelog run.
#[derive(Debug, Clone, Serialize)]
pub struct ChangelogStats {
    /// Commits included in the document
    pub commits: usize,

    /// File written, `None` for a dry run
    pub written: Option<PathBuf>,

    /// Backup of the previous file, if one was made
    pub backup: Option<PathBuf>,
}

/// Reads commit history and renders it as a Markdown changelog.
pub struct ChangelogPipeline {
    config: ChangelogConfig,
    source: Box<dyn CommitSource>,
}

impl ChangelogPipeline {
    /// Creates a pipeline over the git repository containing `repo_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or no repository is found.
    pub fn new(config: ChangelogConfig) -> Result<Self> {
        config.validate()?;
        let repo = GitCli::discover(&config.repo_dir)?;
        Self::with_source(config, Box::new(repo))
    }

    /// Creates a pipeline reading commits from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation fails.
    pub fn with_source(config: ChangelogConfig, source: Box<dyn CommitSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, source })
    }

    /// Renders the changelog and writes it, or prints it for a dry run.
    ///
    /// Nothing is written unless history was read successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if history cannot be read, the tag is unknown,
    /// rendering fails or the output cannot be written.
    #[instrument(skip_all, fields(since = ?self.config.since_tag))]
    pub fn run(self, out: &mut impl Write) -> Result<ChangelogStats> {
        let commits = self.source.commits(self.config.since_tag.as_deref())?;
        let entries = commits_to_entries(&commits);
        let markdown = render_markdown(&entries)?;

        info!("Rendered {} commits", entries.len());

        if self.config.dry_run {
            out.write_all(markdown.as_bytes()).map_err(output_error)?;
            return Ok(ChangelogStats {
                commits: entries.len(),
                written: None,
                backup: None,
            });
        }

        let writer = ChangelogWriter::new(&self.config.output_path)
            .backup_existing(self.config.backup_existing);
        let backup = writer.write(&markdown)?;

        if let Some(backup) = &backup {
            say(out, &format!("Backed up {}", backup.display()))?;
        }
        say(out, &format!("Wrote {}", self.config.output_path.display()))?;

        Ok(ChangelogStats {
            commits: entries.len(),
            written: Some(self.config.output_path),
            backup,
        })
    }
}

fn finish(mut stats: SortStats, start_time: Instant) -> SortStats {
    stats.duration = start_time.elapsed();
    stats
}

fn say(out: &mut impl Write, line: &str) -> Result<()> {
    writeln!(out, "{line}").map_err(output_error)
}

fn output_error(e: std::io::Error) -> Error {
    Error::io("<output>", e)
}
