// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Interestingness
//!
//! Online visual interestingness: every frame of a live stream is scored for
//! novelty against an adaptive memory, smoothed, and published as an event.
//! External feedback can mark content as uninteresting, which is written back
//! into the same memory while scoring continues.
//!
//! ## Architecture
//!
//! ```text
//!  frames ─▶ FrameGate ─▶ intake ─▶ Preprocessor ─▶ ScoringEngine ─▶ Smoother ─▶ EventPublisher ─▶ events
//!                                                       ▲                                          │
//!  feedback ─▶ FeedbackIngest ──────────────────────────┘                                          ▼
//!                                                                                    InterestFilter ─▶ markers
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use interestingness::prelude::*;
//!
//! let checkpoint = MemoryCheckpoint::load(Path::new("saves/memory.checkpoint.json"))?;
//! let compute = ComputeContext::detect(DevicePreference::Auto)?;
//! let engine = Arc::new(ScoringEngine::from_checkpoint(&checkpoint, EngineSettings::default(), compute)?);
//!
//! let pipeline = InterestPipeline::new(
//!     &PipelineSettings::default(),
//!     engine,
//!     EventPublisher::new().with_sink(JsonLinesSink::stdout()),
//!     Arc::new(PipelineStats::new()),
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crates
//!
//! - **structures**: data model and error type
//! - **config**: TOML configuration with environment and CLI overrides
//! - **observability**: logging setup
//! - **vision**: frame gate, preprocessing, display images
//! - **memory**: memory, scoring model, scoring engine
//! - **engine**: pipeline orchestration
//! - **marker**: visualization markers
//!
//! ## License
//!
//! Apache-2.0

pub use interest_config as config;
pub use interest_engine as engine;
pub use interest_marker as marker;
pub use interest_memory as memory;
pub use interest_observability as observability;
pub use interest_structures as structures;
pub use interest_vision as vision;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::structures::{
        FeatureVector, FeedbackRecord, Frame, FrameHeader, InterestError, InterestEvent,
        InterestResult, MarkerEvent, Observation, PreprocessedTensor,
    };

    pub use crate::config::{load_config, validate_config, InterestConfig};

    pub use crate::vision::{FrameGate, Preprocessor};

    pub use crate::memory::{
        ComputeContext, DevicePreference, EngineSettings, MemoryCheckpoint, ScoringEngine,
        ScoringModel,
    };

    pub use crate::engine::{
        run_pipeline, BroadcastSink, EventPublisher, FeedbackIngest, FrameIntake, FrameSubmitter,
        InterestPipeline, JsonLinesSink, PipelineSettings, PipelineStats, Shutdown, Smoother,
    };

    pub use crate::marker::{FilterSettings, InterestFilter};
}
