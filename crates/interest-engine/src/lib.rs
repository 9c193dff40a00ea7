// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-engine
//!
//! Orchestration of the interestingness pipeline: the frame path
//! (gate, intake, preprocessing, scoring, smoothing, publication) and the
//! concurrent feedback path into the shared memory.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod feedback_ingest;
pub mod intake;
pub mod pipeline;
pub mod publisher;
pub mod settings;
pub mod shutdown;
pub mod smoother;
pub mod sources;
pub mod stats;

pub use feedback_ingest::FeedbackIngest;
pub use intake::{FrameIntake, PushOutcome};
pub use pipeline::{run_pipeline, FrameOutcome, FrameSubmitter, InterestPipeline, PipelineSettings};
pub use publisher::{BroadcastSink, EventPublisher, EventSink, JsonLinesSink, PublishedEvent};
pub use shutdown::{Shutdown, ShutdownListener};
pub use smoother::Smoother;
pub use sources::{DirectoryFrameSource, JsonLinesFeedbackSource};
pub use stats::{PipelineStats, StatsSnapshot};
