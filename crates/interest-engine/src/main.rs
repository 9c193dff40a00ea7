// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use interest_config::{load_config, validate_config, InterestConfig};
use interest_engine::settings::{device_preference, engine_settings, logging_options};
use interest_engine::{
    run_pipeline, DirectoryFrameSource, EventPublisher, FrameIntake, FrameSubmitter,
    InterestPipeline, JsonLinesFeedbackSource, JsonLinesSink, PipelineSettings, PipelineStats,
    Shutdown, StatsSnapshot,
};
use interest_memory::{ComputeContext, MemoryCheckpoint, ScoringEngine};
use interest_observability::{init_logging, parse_debug_flags};
use interest_vision::FrameGate;

/// Interestingness engine - scores a frame stream for novelty against a learned memory
#[derive(Parser, Debug)]
#[command(
    name = "interest-engine",
    version,
    about,
    after_help = "Per-crate debug logging: --debug-<crate> or --debug-all (or INTEREST_DEBUG)"
)]
struct Args {
    /// Configuration file (default: search for interest_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration override, repeatable (e.g. --set pipeline.skip_frames=3)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Frame source directory, repeatable (replaces sources.frame_sources)
    #[arg(short, long = "frames", value_name = "DIR")]
    frames: Vec<String>,

    /// Feedback source: JSON-lines file or "-" for stdin
    #[arg(long)]
    feedback: Option<String>,

    /// Write events as JSON lines to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write annotated display images (PNG) into this directory
    #[arg(long)]
    images: Option<PathBuf>,

    /// Delay between frames read from a source, in milliseconds
    #[arg(long, default_value_t = 0)]
    frame_interval_ms: u64,
}

fn main() -> Result<()> {
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|a| !a.starts_with("--debug-")));

    let config = load_configuration(&args)?;
    let _log_guard = init_logging(&debug_flags, &logging_options(&config))?;

    print_banner();

    // The checkpoint must load before any source is opened
    info!(target: "interest-engine", "Loading checkpoint from: {}", config.model.checkpoint.display());
    let checkpoint = MemoryCheckpoint::load(&config.model.checkpoint)
        .with_context(|| format!("Failed to load checkpoint {}", config.model.checkpoint.display()))?;
    let compute = ComputeContext::detect(device_preference(config.model.device))?;
    let engine = Arc::new(ScoringEngine::from_checkpoint(
        &checkpoint,
        engine_settings(&config),
        compute,
    )?);
    info!(target: "interest-engine", "✓ Scoring engine ready");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let snapshot = runtime.block_on(serve(&config, &args, engine))?;

    snapshot.log_summary();
    info!(target: "interest-engine", "✅ Interest engine shutdown complete");
    Ok(())
}

fn load_configuration(args: &Args) -> Result<InterestConfig> {
    let mut overrides = HashMap::new();
    for item in &args.overrides {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| anyhow!("Override '{}' is not KEY=VALUE", item))?;
        overrides.insert(key.trim().to_string(), value.trim().to_string());
    }
    if !args.frames.is_empty() {
        overrides.insert("frame_sources".to_string(), args.frames.join(","));
    }
    if let Some(feedback) = &args.feedback {
        overrides.insert("feedback_source".to_string(), feedback.clone());
    }

    let config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

async fn serve(config: &InterestConfig, args: &Args, engine: Arc<ScoringEngine>) -> Result<StatsSnapshot> {
    let settings = PipelineSettings::from(config);
    let stats = Arc::new(PipelineStats::new());
    let shutdown = Shutdown::new();

    // Outbound events
    let writer: Box<dyn std::io::Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout()),
    };
    let mut sink = JsonLinesSink::new(writer);
    if let Some(dir) = &args.images {
        sink = sink.with_image_dir(dir)?;
    }
    let publisher = EventPublisher::new().with_sink(sink);

    let pipeline = InterestPipeline::new(&settings, engine, publisher, Arc::clone(&stats))?;
    let intake = Arc::new(FrameIntake::new(settings.intake_capacity));
    let submitter = FrameSubmitter::new(
        FrameGate::new(settings.skip_frames)?,
        Arc::clone(&intake),
        Arc::clone(&stats),
    );

    // Frame sources
    let interval = Duration::from_millis(args.frame_interval_ms);
    let mut source_tasks = Vec::new();
    for identifier in &config.sources.frame_sources {
        let mut source = DirectoryFrameSource::new(identifier)
            .with_context(|| format!("Cannot open frame source '{}'", identifier))?;
        if !interval.is_zero() {
            source = source.with_interval(interval);
        }
        let submitter = submitter.clone();
        let listener = shutdown.subscribe();
        info!(target: "interest-engine", "  Frame source: {}", source.name());
        source_tasks.push(tokio::task::spawn_blocking(move || {
            source.run(&submitter, &listener)
        }));
    }

    // Feedback source
    let (feedback_tx, feedback_rx) = mpsc::channel(config.pipeline.event_channel_capacity.max(1));
    let feedback_source = JsonLinesFeedbackSource::from_identifier(&config.sources.feedback_source);
    match feedback_source.path() {
        Some(path) if !path.exists() => {
            warn!(
                target: "interest-engine",
                "Feedback source {} not found, running without feedback",
                path.display()
            );
            drop(feedback_tx);
        }
        _ => {
            let listener = shutdown.subscribe();
            info!(target: "interest-engine", "  Feedback source: {}", config.sources.feedback_source);
            tokio::spawn(async move {
                match feedback_source.run(feedback_tx, listener).await {
                    Ok(count) => info!(target: "interest-engine", "Feedback source finished after {} records", count),
                    Err(e) => error!(target: "interest-engine", "Feedback source failed: {}", e),
                }
            });
        }
    }

    // Ctrl-C
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!(target: "interest-engine", "Shutdown signal received...");
                shutdown.trigger();
            }
        });
    }

    // Finite sources: stop once every source is exhausted and the queue drained
    {
        let shutdown = shutdown.clone();
        let intake = Arc::clone(&intake);
        tokio::spawn(async move {
            for task in source_tasks {
                match task.await {
                    Ok(Ok(count)) => info!(target: "interest-engine", "Frame source finished after {} frames", count),
                    Ok(Err(e)) => error!(target: "interest-engine", "Frame source failed: {}", e),
                    Err(e) => error!(target: "interest-engine", "Frame source task failed: {}", e),
                }
            }
            while !intake.is_empty() && !shutdown.is_triggered() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            shutdown.trigger();
        });
    }

    info!(
        target: "interest-engine",
        "🚀 Engine running (skip_frames={}, window={}, crop={}) - press Ctrl+C to stop",
        settings.skip_frames,
        settings.window_size,
        settings.crop_size
    );
    let snapshot = run_pipeline(pipeline, intake, feedback_rx, shutdown).await?;
    Ok(snapshot)
}

fn print_banner() {
    eprintln!(
        r#"
╔═══════════════════════════════════════════════════════════════════╗
║                                                                   ║
║   Interestingness Engine v{}                                   ║
║   Novelty scoring against a learned memory, with live feedback    ║
║                                                                   ║
╚═══════════════════════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
