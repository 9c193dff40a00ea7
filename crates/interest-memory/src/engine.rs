// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # ScoringEngine
//!
//! Owns the scoring model, the [`Memory`] and the compute context. `score`
//! and `feedback` may be called from different threads; the memory lock makes
//! each call observe the memory either before or after any given write, never
//! in between.
//!
//! Encoding runs outside the lock, so a long inference only holds the memory
//! for the duration of the read itself.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use interest_structures::{
    FeatureVector, InterestError, InterestResult, Observation, PreprocessedTensor,
};

use crate::checkpoint::MemoryCheckpoint;
use crate::compute::ComputeContext;
use crate::memory::Memory;
use crate::model::{MemoryNetwork, ScoringModel};

/// Runtime settings for the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    /// Read rate `rr`
    pub read_rate: f32,
    /// Write rate `wr`
    pub write_rate: f32,
    /// Memory lock waits or holds longer than this are logged at warn
    pub slow_lock_threshold: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            read_rate: 5.0,
            write_rate: 5.0,
            slow_lock_threshold: Duration::from_millis(5),
        }
    }
}

pub struct ScoringEngine {
    model: Arc<dyn ScoringModel>,
    memory: Memory,
    compute: ComputeContext,
}

impl ScoringEngine {
    pub fn new(
        model: Arc<dyn ScoringModel>,
        memory: Memory,
        compute: ComputeContext,
    ) -> InterestResult<Self> {
        let coding_len = FeatureVector::element_count_of(model.coding_shape());
        if coding_len != Some(memory.coding_len()) {
            return Err(InterestError::ShapeMismatch {
                expected: model.coding_shape().to_vec(),
                actual: vec![memory.slot_count(), memory.coding_len()],
            });
        }
        Ok(Self {
            model,
            memory,
            compute,
        })
    }

    /// Build the built-in memory network from a loaded checkpoint
    pub fn from_checkpoint(
        checkpoint: &MemoryCheckpoint,
        settings: EngineSettings,
        compute: ComputeContext,
    ) -> InterestResult<Self> {
        checkpoint.validate()?;
        let [channels, grid, _] = checkpoint.coding_shape;
        let model = MemoryNetwork::new(channels, grid)?;
        let memory = Memory::new(
            checkpoint.slot_matrix()?,
            settings.read_rate,
            settings.write_rate,
            settings.slow_lock_threshold,
        )?;

        info!(
            target: "interest-memory",
            "ScoringEngine ready: model={}, slots={}, coding={:?}, rr={}, wr={}, device={}",
            model.name(),
            memory.slot_count(),
            checkpoint.coding_shape,
            settings.read_rate,
            settings.write_rate,
            compute.device()
        );
        Self::new(Arc::new(model), memory, compute)
    }

    pub fn coding_shape(&self) -> &[usize] {
        self.model.coding_shape()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn compute(&self) -> &ComputeContext {
        &self.compute
    }

    pub fn set_learning_rate(&self, read_rate: f32, write_rate: f32) -> InterestResult<()> {
        self.memory.set_learning_rate(read_rate, write_rate)
    }

    /// Score one tensor. The model runs in inference mode; only the memory's
    /// reading weights change.
    pub fn score(&self, tensor: &PreprocessedTensor) -> InterestResult<Observation> {
        let coding = self.model.encode(tensor, &self.compute)?;
        let recall = self.memory.read(coding.as_slice())?;
        let raw_score = self.model.novelty(coding.as_slice(), &recall.state);

        let state = FeatureVector::new(self.coding_shape().to_vec(), recall.state)?;
        let reading_weights = FeatureVector::from_flat(recall.reading_weights);

        debug!(
            target: "interest-memory",
            "Scored tensor: raw={:.4}, memory version {}",
            raw_score,
            recall.version
        );
        Ok(Observation {
            raw_score,
            state,
            coding,
            reading_weights,
            memory_version: recall.version,
        })
    }

    /// Write a coding judged non-novel into the memory.
    ///
    /// The coding must have the model's coding shape, or be the flat vector
    /// of the same length. Returns the memory version after the write.
    pub fn feedback(&self, coding: &FeatureVector) -> InterestResult<u64> {
        coding.validate()?;
        let expected = self.coding_shape();
        let flat_ok = coding.shape().len() == 1 && coding.len() == self.memory.coding_len();
        if coding.shape() != expected && !flat_ok {
            return Err(InterestError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: coding.shape().to_vec(),
            });
        }
        self.memory.write(coding.as_slice())
    }
}

impl std::fmt::Debug for ScoringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringEngine")
            .field("model", &self.model.name())
            .field("memory", &self.memory)
            .field("compute", &self.compute)
            .finish()
    }
}
