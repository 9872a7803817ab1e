mod config;
mod detector;
mod error;
mod language;
mod mover;
mod provider;
mod renamer;
mod synthesizer;
mod utils;
mod walker;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, ProviderKind, RunOptions, Settings};
use language::TargetLanguage;
use log::{error, info};
use renamer::{BatchSummary, ScreenshotRenamer};
use std::env;
use std::path::PathBuf;
use walker::ScreenshotWalker;

/// Rename legacy screenshots after what they show
#[derive(Debug, Parser)]
#[command(name = "snapkeeper", version, about)]
struct Cli {
    /// Directory to scan recursively (defaults to the current directory)
    path: Option<PathBuf>,

    /// Language for the new names
    #[arg(long, value_enum, env = "RENAME_LANG")]
    lang: Option<TargetLanguage>,

    /// Description provider to use
    #[arg(long, value_enum, env = "SNAPKEEPER_PROVIDER")]
    provider: Option<ProviderKind>,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show intermediate descriptions and debug output
    #[arg(short, long)]
    verbose: bool,

    /// Work out the new names without renaming anything
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("Starting SnapKeeper - Screenshot Renamer");

    match run(cli) {
        Ok(summary) => info!(
            "Processing completed: {} found, {} renamed, {} would be renamed, {} skipped",
            summary.found, summary.renamed, summary.would_rename, summary.skipped
        ),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<BatchSummary> {
    let root = get_target_directory(cli.path)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let settings = Settings::resolve(
        &config,
        RunOptions {
            root,
            language: cli.lang,
            provider: cli.provider,
            verbose: cli.verbose,
            dry_run: cli.dry_run,
        },
    );
    if settings.verbose {
        info!("Settings: {:?}", settings);
    }

    info!("Target directory: {:?}", settings.root);
    if settings.dry_run {
        info!("Dry run: no files will be renamed");
    }

    let provider = provider::build_provider(&settings.provider, settings.language)
        .context("Failed to set up description provider")?;

    let files = ScreenshotWalker::new(settings.root.clone()).collect()?;
    let renamer = ScreenshotRenamer::new(provider, settings.dry_run);

    Ok(renamer.run(&files))
}

fn get_target_directory(arg: Option<PathBuf>) -> Result<PathBuf> {
    let path = match arg {
        Some(path) => path,
        None => env::current_dir().context("Could not determine current directory")?,
    };

    if path.is_dir() {
        Ok(path)
    } else {
        anyhow::bail!("Provided path is not a valid directory: {:?}", path);
    }
}
