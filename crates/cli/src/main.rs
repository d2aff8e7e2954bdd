//! webreel command-line entry point.
//!
//! A thin caller of the core library: loads configuration, initializes
//! logging, and drives the orchestrator's `detect` / `start_transcode`
//! entry points, rendering progress and error events as log lines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webreel_core::{
    load_config, validate_config, Config, ProcessRunner, RunProgress, StartOutcome,
    TranscodeOrchestrator,
};

#[derive(Parser)]
#[command(name = "webreel", version, about = "Prepare a media library for web playback")]
struct Cli {
    /// Path to the TOML config file (defaults to $WEBREEL_CONFIG, then
    /// ./config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the source tree and print the detected catalog as JSON.
    Detect {
        /// Force a fresh scan instead of reusing a cached catalog.
        #[arg(long)]
        force: bool,
    },
    /// Detect assets and run the conversion pipeline over them.
    Run,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;
    validate_config(&config).context("Configuration validation failed")?;

    let orchestrator = TranscodeOrchestrator::new(config, Arc::new(ProcessRunner::new()));

    match cli.command {
        Command::Detect { force } => {
            let catalog = orchestrator.detect(force).await?;
            println!("{}", serde_json::to_string_pretty(catalog.as_ref())?);
        }
        Command::Run => {
            let catalog = orchestrator.detect(false).await?;
            info!(assets = catalog.len(), "starting conversion run");

            spawn_error_loggers(&orchestrator);
            let mut progress_rx = orchestrator.subscribe_progress();

            match orchestrator.start_transcode().await? {
                StartOutcome::Accepted => {}
                StartOutcome::Busy => anyhow::bail!("a conversion run is already active"),
                StartOutcome::DestinationNotEmpty => anyhow::bail!(
                    "destination already contains output; clean it out or set \
                     pipeline.clear_destination"
                ),
            }

            // The run executes in the background; follow the snapshots until
            // it reaches its terminal state.
            loop {
                let finished = progress_rx
                    .borrow_and_update()
                    .as_ref()
                    .map(report_progress)
                    .unwrap_or(false);
                if finished {
                    break;
                }
                if progress_rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn resolve_config(cli_path: Option<&Path>) -> Result<Config> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("WEBREEL_CONFIG").ok().map(PathBuf::from));

    match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None if Path::new("config.toml").exists() => {
            load_config(Path::new("config.toml")).context("Failed to load ./config.toml")
        }
        None => Ok(Config::default()),
    }
}

/// Forwards error-sink reports to the log as they arrive.
fn spawn_error_loggers(orchestrator: &TranscodeOrchestrator) {
    let errors = orchestrator.errors();
    let mut recoverable = errors.subscribe_recoverable();
    let mut critical = errors.subscribe_critical();

    tokio::spawn(async move {
        while let Ok(report) = recoverable.recv().await {
            warn!(details = %report.technical_details, "{}", report.message);
        }
    });
    tokio::spawn(async move {
        while let Ok(report) = critical.recv().await {
            error!(details = %report.technical_details, "{}", report.message);
        }
    });
}

/// Logs one snapshot; returns whether the run is finished.
fn report_progress(progress: &RunProgress) -> bool {
    if let Some(task) = progress.tasks.last() {
        info!(
            asset = %task.video_name,
            step = task.steps_done,
            of = task.steps_total,
            "progress"
        );
    }
    if progress.is_finished() {
        info!(
            processed = progress.assets_processed,
            failed = progress.assets_failed,
            video_copied = progress.video_streams_copied,
            video_transcoded = progress.video_streams_transcoded,
            audio_copied = progress.audio_streams_copied,
            audio_transcoded = progress.audio_streams_transcoded,
            subtitles_extracted = progress.subtitle_tracks_extracted,
            subtitles_skipped = progress.subtitle_tracks_skipped,
            "run complete"
        );
        return true;
    }
    false
}
