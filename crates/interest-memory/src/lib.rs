// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-memory
//!
//! The stateful half of the scorer.
//!
//! - [`Memory`]: slot memory behind a traced mutex, exposing only `read` and `write`
//! - [`ScoringModel`] / [`MemoryNetwork`]: coding and novelty
//! - [`MemoryCheckpoint`]: JSON checkpoint loading and validation
//! - [`ComputeContext`]: one-time device selection and the encoder thread pool
//! - [`ScoringEngine`]: `score(tensor)` and `feedback(coding)` over a shared memory

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod checkpoint;
mod compute;
mod engine;
mod lock;
mod memory;
mod model;

pub use checkpoint::{MemoryCheckpoint, CHECKPOINT_FORMAT_VERSION};
pub use compute::{is_accelerator_available, ComputeContext, Device, DevicePreference};
pub use engine::{EngineSettings, ScoringEngine};
pub use lock::{TracingMutex, TracingMutexGuard};
pub use memory::{cosine_similarity, Memory, Recall};
pub use model::{MemoryNetwork, ScoringModel};
