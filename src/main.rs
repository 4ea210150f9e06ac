use anyhow::Context;
use clap::Parser;
use sortai::{SortConfig, SortPipeline, API_KEY_ENV};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "sortai",
    version,
    about = "Organize files in a directory using Google Gemini",
    long_about = "Organize files in a directory using Google Gemini.\n\n\
    The model sees every file name (and a short preview of text, PDF and Word \
    documents) and proposes folders. Nothing is moved unless --apply is given \
    and the prompt is confirmed.\n\n\
    USAGE EXAMPLES:\n  \
      # Preview a layout for ~/Downloads\n  \
      sortai ~/Downloads\n\n  \
      # Sort two levels deep and apply after confirmation\n  \
      sortai ~/Downloads --depth 2 --apply"
)]
struct Cli {
    /// Directory to organize
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Actually move files after confirmation (default: dry-run only)
    #[arg(long)]
    apply: bool,

    /// Organize recursively up to N levels of subfolders
    #[arg(long, default_value_t = 1, value_name = "N")]
    depth: usize,

    /// Gemini model name
    #[arg(long, default_value = "gemini-1.5-flash")]
    model: String,

    /// Gemini API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let Some(path) = cli.path else {
        eprintln!("Error: PATH is required. Use --help for usage.");
        std::process::exit(1);
    };

    let config = SortConfig::builder()
        .root_dir(path)
        .max_depth(cli.depth)
        .model(cli.model)
        .api_key(cli.api_key)
        .apply(cli.apply)
        .build()?;

    let pipeline = SortPipeline::new(config)?;

    let stdin = io::stdin();
    let stats = pipeline
        .run(&mut stdin.lock(), &mut io::stdout().lock())
        .context("Failed to organize files")?;
    stats.log_summary();

    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("sortai=warn"),
        1 => EnvFilter::new("sortai=info"),
        2 => EnvFilter::new("sortai=debug"),
        _ => EnvFilter::new("sortai=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
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
