// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Checkpoint Initialization Tool

Writes a memory checkpoint with randomly initialized slots, for a first run
before any memory has been learned.

Usage:
  cargo run --bin init_checkpoint -- --output saves/memory.checkpoint.json

Example:
  cargo run --bin init_checkpoint -- --slots 64 --channels 3 --grid 8 --seed 7 --output saves/memory.checkpoint.json

Copyright 2025 Neuraville Inc.
Licensed under the Apache License, Version 2.0
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use interestingness::memory::MemoryCheckpoint;

/// Write a randomly initialized memory checkpoint
#[derive(Parser, Debug)]
#[command(name = "init_checkpoint", version, about)]
struct Args {
    /// Output file
    #[arg(short, long, default_value = "saves/memory.checkpoint.json")]
    output: PathBuf,

    /// Number of memory slots
    #[arg(long, default_value_t = 100)]
    slots: usize,

    /// Coding channels (3 for RGB input)
    #[arg(long, default_value_t = 3)]
    channels: usize,

    /// Coding grid side length
    #[arg(long, default_value_t = 8)]
    grid: usize,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("🧠 Interestingness Checkpoint Tool");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Output: {}", args.output.display());
    println!("   Slots:  {}", args.slots);
    println!("   Coding: [{}, {}, {}]", args.channels, args.grid, args.grid);
    println!("   Seed:   {}", args.seed);
    println!();

    let coding_len = args.channels * args.grid * args.grid;
    let mut rng = StdRng::seed_from_u64(args.seed);
    let slots: Vec<Vec<f32>> = (0..args.slots)
        .map(|_| (0..coding_len).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect();

    let checkpoint = MemoryCheckpoint::new([args.channels, args.grid, args.grid], slots)
        .context("Invalid checkpoint parameters")?;
    checkpoint
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!("✅ Checkpoint written");
    Ok(())
}
