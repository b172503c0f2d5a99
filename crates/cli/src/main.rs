//! tagwatch CLI - Main Entry Point
//!
//! Runs scripted tag-management preview monitoring sessions: drives the
//! browser through the configured actions, records checkpoints, validates
//! them against the expected outcomes, and writes the reports.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};

use tagwatch_browser::{ArrowAnnotator, BrowserConfig, PlaywrightSession};
use tagwatch_core::{
    Annotator, Checkpoint, Report, Session, SessionConfig, CHECKPOINTS_FILENAME,
};

/// tagwatch - Tag-Management Preview Monitor
#[derive(Parser)]
#[command(name = "tagwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session from a config file, or every config in a
    /// directory
    Run(RunArgs),

    /// Parse a session config and print the expectation summary
    Check {
        /// Session config file
        config: PathBuf,
    },

    /// Rebuild the reports from a persisted checkpoint sequence
    Report(ReportArgs),

    /// Show version information
    Version,
}

#[derive(Args)]
struct RunArgs {
    /// Session config file or directory of configs
    config: PathBuf,

    /// Override the configured output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Skip screenshot annotation
    #[arg(long)]
    no_annotate: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// Session config file
    config: PathBuf,

    /// Checkpoint sequence from a previous run
    /// (defaults to <output_dir>/checkpoints.json)
    #[arg(long)]
    checkpoints: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await?,
        Commands::Check { config } => check(&config)?,
        Commands::Report(args) => rebuild_report(args)?,
        Commands::Version => {
            println!("tagwatch v{}", env!("CARGO_PKG_VERSION"));
            println!("Tag-management preview monitoring");
        }
    }

    Ok(())
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let configs = load_configs(&args.config)?;
    anyhow::ensure!(!configs.is_empty(), "no session configs under {}", args.config.display());

    let mut failures = 0usize;
    for mut config in configs {
        if let Some(dir) = &args.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()?;

        match run_session(config, &args).await {
            Ok(success) => {
                if !success {
                    failures += 1;
                }
            }
            Err(e) => {
                error!("{}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one session to completion or abort. Returns the report's overall
/// success flag; a capture abort still writes the partial report.
async fn run_session(config: SessionConfig, args: &RunArgs) -> anyhow::Result<bool> {
    let browser = PlaywrightSession::launch(BrowserConfig {
        headless: !args.headed,
        ..Default::default()
    })
    .await?;

    browser
        .open_preview(&config.container_id, &config.target_url)
        .await
        .context("could not open the preview session")?;

    let annotator = ArrowAnnotator;
    let annotator_ref: Option<&dyn Annotator> =
        if args.no_annotate { None } else { Some(&annotator) };

    let mut session = Session::new(config);
    let run_result = session.run(&browser, &browser, annotator_ref).await;
    let _ = browser.close().await;

    session.persist_checkpoints()?;
    let report = session.build_report()?;
    report.write(&session.config().output_dir)?;

    match run_result {
        Ok(()) => {
            if report.summary.success {
                println!(
                    "✅ {}: {} checkpoint(s), {} passed",
                    session.config().container_id,
                    report.summary.total_captures,
                    report.summary.validations_passed
                );
            } else {
                println!(
                    "❌ {}: {} validation(s) failed across {} checkpoint(s)",
                    session.config().container_id,
                    report.summary.validations_failed,
                    report.summary.total_captures
                );
            }
            Ok(report.summary.success)
        }
        Err(e) => {
            println!(
                "❌ {}: aborted after {} checkpoint(s): {}",
                session.config().container_id,
                session.checkpoints().len(),
                e
            );
            info!("Partial report written to {}", session.config().output_dir.display());
            Ok(false)
        }
    }
}

fn load_configs(path: &Path) -> anyhow::Result<Vec<SessionConfig>> {
    if path.is_dir() {
        Ok(SessionConfig::load_all(path)?)
    } else {
        Ok(vec![SessionConfig::from_file(path)?])
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = SessionConfig::from_file(path)
        .with_context(|| format!("could not parse {}", path.display()))?;
    config.validate()?;

    let expectations = &config.expectations;
    println!("✅ Config OK: {}", path.display());
    println!("  Container:   {}", config.container_id);
    println!("  Target URL:  {}", config.target_url);
    println!("  Output dir:  {}", config.output_dir.display());
    println!("  Actions:     {} ({} captures)", config.actions.len(), config.capture_count());
    println!(
        "  Expected:    {} tag(s), {} event(s), {} variable(s), {} consent signal(s)",
        expectations.tags.len(),
        expectations.events.len(),
        expectations.variables.len(),
        expectations.consent.len()
    );

    if config.capture_count() == 0 {
        warn!("No capture actions: a run will record zero checkpoints");
    }
    if expectations.is_empty() {
        warn!("Empty expectation set: every checkpoint validates trivially");
    }

    Ok(())
}

fn rebuild_report(args: ReportArgs) -> anyhow::Result<()> {
    let config = SessionConfig::from_file(&args.config)?;
    let checkpoints_path = args
        .checkpoints
        .unwrap_or_else(|| config.output_dir.join(CHECKPOINTS_FILENAME));

    let raw = std::fs::read_to_string(&checkpoints_path)
        .with_context(|| format!("could not read {}", checkpoints_path.display()))?;
    let checkpoints: Vec<Checkpoint> = serde_json::from_str(&raw)?;

    let report = Report::build(&config, &checkpoints)?;
    let paths = report.write(&config.output_dir)?;

    println!(
        "{} Rebuilt reports from {} checkpoint(s):",
        if report.summary.success { "✅" } else { "❌" },
        report.summary.total_captures
    );
    println!("  {}", paths.json.display());
    println!("  {}", paths.markdown.display());

    Ok(())
}
