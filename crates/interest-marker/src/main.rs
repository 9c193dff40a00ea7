// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use interest_config::{load_config, validate_config};
use interest_marker::{FilterSettings, InterestFilter};
use interest_observability::{init_logging, parse_debug_flags, LoggingOptions};
use interest_structures::InterestEvent;

/// Interest marker - turns interest events (JSON lines) into visualization markers (JSON lines)
#[derive(Parser, Debug)]
#[command(name = "interest-marker", version, about)]
struct Args {
    /// Configuration file (default: search for interest_configuration.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum interest level to show (overrides visualization.min_level)
    #[arg(long)]
    min_level: Option<f32>,

    /// Read events from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write markers to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|a| !a.starts_with("--debug-")));

    let mut overrides = HashMap::new();
    if let Some(min_level) = args.min_level {
        overrides.insert("min_level".to_string(), min_level.to_string());
    }
    let config = load_config(args.config.as_deref(), Some(&overrides))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let _log_guard = init_logging(
        &debug_flags,
        &LoggingOptions {
            default_level: config.logging.level.clone(),
            ..LoggingOptions::default()
        },
    )?;

    let filter = InterestFilter::new(FilterSettings::from(&config))?;
    info!(
        target: "interest-marker",
        "Interest marker running (min_level={}, k={}, level_range={:?})",
        filter.settings().min_level,
        filter.settings().marker_scale,
        filter.settings().level_range
    );

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let (mut events, mut markers) = (0u64, 0u64);
    for line in reader.lines() {
        let line = line.context("Failed to read event stream")?;
        if line.trim().is_empty() {
            continue;
        }
        let event: InterestEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(target: "interest-marker", "Ignoring malformed event: {}", e);
                continue;
            }
        };
        events += 1;
        if let Some(marker) = filter.filter(&event) {
            serde_json::to_writer(&mut writer, &marker)?;
            writeln!(writer)?;
            writer.flush()?;
            markers += 1;
        }
    }

    info!(
        target: "interest-marker",
        "Event stream ended: {} events, {} markers",
        events,
        markers
    );
    Ok(())
}
