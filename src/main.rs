//! reelcut - video editing and thumbnail capture on top of ffmpeg
//!
//! Command-line entry point. Media paths are resolved against the storage
//! root (`--root`, or `storage.root` in the configuration).

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use reelcut::cli::{edit_request, Args, Commands};
use reelcut::config::Config;
use reelcut::media::{SystemRunner, ToolCheck, ToolRunner};
use reelcut::storage::LocalStorage;
use reelcut::workflow::{discover_videos, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("reelcut.toml").exists() {
                info!("Found reelcut.toml in current directory, loading...");
                Config::from_file("reelcut.toml")?
            } else {
                Config::default()
            }
        }
    };
    if let Some(root) = &args.root {
        config.storage.root = root.clone();
    }

    let runner: Arc<dyn ToolRunner> = Arc::new(SystemRunner);

    match args.command {
        Commands::InitConfig { output } => {
            config.save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Check => {
            let check = ToolCheck::new(runner.as_ref(), &config.media);
            println!("{}", check.ffmpeg_version()?);
            println!("{}", check.ffprobe_version()?);
        }
        Commands::Probe { input } => {
            let workflow = build_workflow(config, runner)?;
            let metadata = workflow.probe(&input)?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Commands::Edit { input, output, start, end, crop, rotate, quality } => {
            let workflow = build_workflow(config, runner)?;
            let request = edit_request(start, end, crop, rotate, quality);

            match workflow.edit(&input, &output, &request)? {
                Some((location, metadata)) => {
                    println!("{}", location);
                    println!("{}", serde_json::to_string_pretty(&metadata)?);
                }
                None => println!("No edit needed for {}", input),
            }
        }
        Commands::Thumbnail { input, output, position } => {
            let workflow = build_workflow(config, runner)?;
            let location = workflow.thumbnail(&input, &output, position)?;
            println!("{}", location);
        }
        Commands::Timeline { input, output, count } => {
            let workflow = build_workflow(config, runner)?;
            for location in workflow.timeline(&input, &output, count)? {
                println!("{}", location);
            }
        }
        Commands::Batch { input_dir, output_dir } => {
            info!("Processing directory: {}", input_dir);
            let workflow = Arc::new(build_workflow(config, runner)?);
            let inputs = discover_videos(workflow.storage().root(), &input_dir)?;

            let summary = workflow.thumbnail_directory(inputs, &output_dir).await?;
            println!("{} thumbnails captured, {} failed", summary.succeeded, summary.failed);
        }
    }

    info!("reelcut completed successfully");
    Ok(())
}

fn build_workflow(config: Config, runner: Arc<dyn ToolRunner>) -> Result<Workflow<LocalStorage>> {
    let check = ToolCheck::new(runner.as_ref(), &config.media);
    check.check_availability()?;

    let storage = LocalStorage::new(&config.storage)?;
    Ok(Workflow::new(config, runner, storage))
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".reelcut").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "reelcut.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console output goes to stderr so stdout stays parseable
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("reelcut.log").display());

    Ok(())
}
