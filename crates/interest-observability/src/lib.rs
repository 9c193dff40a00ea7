// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-observability
//!
//! Logging setup shared by the pipeline binaries.
//!
//! Every crate logs through `tracing` with its crate name as the target, so
//! `--debug-interest-memory` (or `INTEREST_DEBUG=interest-memory`) raises just
//! that crate to debug level.
//!
//! ## Features
//! - `file-logging`: per-run JSON log files with retention cleanup (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known pipeline crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "interest-config",
    "interest-vision",
    "interest-memory",
    "interest-engine",
    "interest-marker",
];
