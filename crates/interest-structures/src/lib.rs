// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-structures
//!
//! The data model shared by every stage of the interestingness pipeline.
//!
//! - **[`Frame`]**: one raw image as delivered by a named frame source
//! - **[`PreprocessedTensor`]**: the normalized channels-first tensor the scoring model consumes
//! - **[`FeatureVector`]**: a flattened numeric tensor together with its shape
//! - **[`Observation`]**: the scoring function's full output for one frame
//! - **[`InterestEvent`]**: the per-frame record published downstream
//! - **[`FeedbackRecord`]**: an external "this is not interesting" judgment
//! - **[`MarkerEvent`]**: the visual artifact derived from a high-interest event
//!
//! All of these are plain values. They are immutable once built and are moved,
//! not shared, between pipeline stages.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod error;
mod events;
mod feature_vector;
mod frame;
mod marker;
mod tensor;

pub use error::{InterestError, InterestResult};
pub use events::{FeedbackRecord, InterestEvent, Observation};
pub use feature_vector::FeatureVector;
pub use frame::{ChannelLayout, Frame, FrameHeader};
pub use marker::{
    ColorRgba, MarkerAction, MarkerEvent, MarkerLifetime, MarkerShape, Pose, Quaternion, Vector3,
};
pub use tensor::PreprocessedTensor;
