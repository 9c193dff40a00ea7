// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scoring outputs and the records exchanged on the event and feedback channels.

use serde::{Deserialize, Serialize};

use crate::{FeatureVector, FrameHeader};

/// Full output of the scoring function for one preprocessed tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unsmoothed novelty of this frame
    pub raw_score: f32,
    /// State recalled from memory for this frame's coding
    pub state: FeatureVector,
    /// The frame's memory coding (what feedback sends back to mark as seen)
    pub coding: FeatureVector,
    /// Attention over memory slots used to build `state`
    pub reading_weights: FeatureVector,
    /// Number of memory writes applied before this read
    pub memory_version: u64,
}

/// The per-frame record published for every scored frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEvent {
    pub header: FrameHeader,
    pub raw_score: f32,
    /// Smoothed interest level
    pub level: f32,
    /// The preprocessed tensor the score was computed from (channels, height, width)
    pub image: FeatureVector,
    pub state: FeatureVector,
    pub coding: FeatureVector,
    pub reading_weights: FeatureVector,
}

impl InterestEvent {
    pub fn sequence_id(&self) -> u64 {
        self.header.sequence_id
    }
}

/// External judgment that `coding` should be treated as non-novel.
///
/// Consumed exactly once by the scoring engine's write path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub sequence_id: u64,
    pub coding: FeatureVector,
}

impl FeedbackRecord {
    pub fn new(sequence_id: u64, coding: FeatureVector) -> Self {
        Self {
            sequence_id,
            coding,
        }
    }
}
