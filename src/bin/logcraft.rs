use anyhow::Context;
use clap::Parser;
use sortai::{ChangelogConfig, ChangelogPipeline};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "logcraft",
    version,
    about = "Craft CHANGELOG.md from git commit history",
    long_about = "Craft CHANGELOG.md from git commit history.\n\n\
    Commits are categorized by conventional prefixes: feat: -> Features, \
    fix: -> Bug Fixes, chore: -> Maintenance; anything else lands in Other.\n\n\
    USAGE EXAMPLES:\n  \
      # Whole history into CHANGELOG.md\n  \
      logcraft\n\n  \
      # Only commits after a release, printed instead of written\n  \
      logcraft --since v1.0.0 --dry-run"
)]
struct Cli {
    /// Only include commits since this tag (e.g. --since v1.0.0)
    #[arg(long, value_name = "TAG")]
    since: Option<String>,

    /// Output file path
    #[arg(short, long, default_value = "CHANGELOG.md", value_name = "FILE")]
    output: PathBuf,

    /// Print changelog to terminal instead of writing a file
    #[arg(long)]
    dry_run: bool,

    /// Run as if started in DIR
    #[arg(short = 'C', long = "repo", default_value = ".", value_name = "DIR")]
    repo: PathBuf,

    /// Keep a timestamped copy of an existing output file
    #[arg(long)]
    backup: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let config = ChangelogConfig::builder()
        .repo_dir(cli.repo)
        .since_tag(cli.since)
        .output_path(cli.output)
        .dry_run(cli.dry_run)
        .backup_existing(cli.backup)
        .build()?;

    let stats = ChangelogPipeline::new(config)?.run(&mut io::stdout().lock())?;
    tracing::info!("Included {} commits", stats.commits);

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(format!("sortai={level},logcraft={level}")))
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
