// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Slot memory shared by the scoring and feedback paths.
//!
//! The memory is `N` slots, each the size of one coding. A read attends over
//! the slots with `softmax(rr * cos(key, slot))` and returns the weighted sum
//! (the recalled state); a write blends the coding into every slot in
//! proportion to `softmax(wr * cos(coding, slot))`.
//!
//! All state sits behind one [`TracingMutex`]. Each `read` or `write` runs
//! entirely inside the critical section, so a caller only ever observes the
//! memory between two complete writes.

use std::time::Duration;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::debug;

use interest_structures::{InterestError, InterestResult};

use crate::lock::TracingMutex;

const COSINE_EPSILON: f32 = 1e-8;

/// Result of one memory read
#[derive(Debug, Clone, PartialEq)]
pub struct Recall {
    /// Attention-weighted sum of the slots, same length as the key
    pub state: Vec<f32>,
    /// Attention over the slots, sums to one
    pub reading_weights: Vec<f32>,
    /// Number of writes applied before this read
    pub version: u64,
}

struct MemoryState {
    slots: Array2<f32>,
    read_rate: f32,
    write_rate: f32,
    reading_weights: Array1<f32>,
    version: u64,
}

pub struct Memory {
    state: TracingMutex<MemoryState>,
    slot_count: usize,
    coding_len: usize,
}

impl Memory {
    /// Build a memory from an `N x D` slot matrix.
    pub fn new(
        slots: Array2<f32>,
        read_rate: f32,
        write_rate: f32,
        slow_lock_threshold: Duration,
    ) -> InterestResult<Self> {
        let (slot_count, coding_len) = slots.dim();
        if slot_count == 0 || coding_len == 0 {
            return Err(InterestError::InvalidParameter(format!(
                "memory needs at least one non-empty slot, got {}x{}",
                slot_count, coding_len
            )));
        }
        if slots.iter().any(|v| !v.is_finite()) {
            return Err(InterestError::InvalidParameter(
                "memory slots contain non-finite values".to_string(),
            ));
        }
        check_rates(read_rate, write_rate)?;

        let state = MemoryState {
            slots,
            read_rate,
            write_rate,
            reading_weights: Array1::from_elem(slot_count, 1.0 / slot_count as f32),
            version: 0,
        };
        Ok(Self {
            state: TracingMutex::new(state, "memory", slow_lock_threshold),
            slot_count,
            coding_len,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn coding_len(&self) -> usize {
        self.coding_len
    }

    /// Number of writes applied so far
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn learning_rate(&self) -> (f32, f32) {
        let state = self.state.lock();
        (state.read_rate, state.write_rate)
    }

    pub fn set_learning_rate(&self, read_rate: f32, write_rate: f32) -> InterestResult<()> {
        check_rates(read_rate, write_rate)?;
        let mut state = self.state.lock();
        state.read_rate = read_rate;
        state.write_rate = write_rate;
        Ok(())
    }

    /// Copy of the slot matrix
    pub fn snapshot(&self) -> Array2<f32> {
        self.state.lock().slots.clone()
    }

    /// Weights of the most recent read
    pub fn last_reading_weights(&self) -> Vec<f32> {
        self.state.lock().reading_weights.to_vec()
    }

    /// Attend over the slots with `key` and return the recalled state.
    ///
    /// Slot contents are not modified; the reading weights are kept as the
    /// memory's latest attention.
    pub fn read(&self, key: &[f32]) -> InterestResult<Recall> {
        self.check_len(key)?;
        let key = ArrayView1::from(key);

        let mut state = self.state.lock();
        let weights = attention(&state.slots, key, state.read_rate);
        let recalled = weights.dot(&state.slots);
        state.reading_weights = weights.clone();

        Ok(Recall {
            state: recalled.to_vec(),
            reading_weights: weights.to_vec(),
            version: state.version,
        })
    }

    /// Blend `coding` into the slots. Returns the version after the write.
    pub fn write(&self, coding: &[f32]) -> InterestResult<u64> {
        self.check_len(coding)?;
        if coding.iter().any(|v| !v.is_finite()) {
            return Err(InterestError::InvalidParameter(
                "coding contains non-finite values".to_string(),
            ));
        }
        let coding = ArrayView1::from(coding);

        let mut state = self.state.lock();
        let weights = attention(&state.slots, coding, state.write_rate);
        for (mut slot, &w) in state.slots.axis_iter_mut(Axis(0)).zip(weights.iter()) {
            slot.zip_mut_with(&coding, |s, &c| *s = (1.0 - w) * *s + w * c);
        }
        state.version += 1;
        let version = state.version;
        drop(state);

        debug!(target: "interest-memory", "Memory write applied, version {}", version);
        Ok(version)
    }

    fn check_len(&self, vector: &[f32]) -> InterestResult<()> {
        if vector.len() != self.coding_len {
            return Err(InterestError::ShapeMismatch {
                expected: vec![self.coding_len],
                actual: vec![vector.len()],
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("slot_count", &self.slot_count)
            .field("coding_len", &self.coding_len)
            .finish()
    }
}

fn check_rates(read_rate: f32, write_rate: f32) -> InterestResult<()> {
    for (name, rate) in [("read_rate", read_rate), ("write_rate", write_rate)] {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(InterestError::InvalidParameter(format!(
                "{} must be finite and > 0, got {}",
                name, rate
            )));
        }
    }
    Ok(())
}

/// Cosine similarity of two equal-length vectors
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    a.dot(&b) / (norm + COSINE_EPSILON)
}

/// `softmax(rate * cos(key, slot_i))` over all slots
fn attention(slots: &Array2<f32>, key: ArrayView1<'_, f32>, rate: f32) -> Array1<f32> {
    let logits: Array1<f32> = slots
        .axis_iter(Axis(0))
        .map(|slot| rate * cosine_similarity(slot, key))
        .collect();
    let max = logits.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const SLOTS: usize = 4;
    const LEN: usize = 6;

    fn vector() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-10.0f32..10.0, LEN)
    }

    proptest! {
        #[test]
        fn reading_weights_form_a_distribution(
            slots in prop::collection::vec(-10.0f32..10.0, SLOTS * LEN),
            key in vector(),
            read_rate in 0.1f32..20.0,
        ) {
            let slots = Array2::from_shape_vec((SLOTS, LEN), slots).unwrap();
            let mem = Memory::new(slots, read_rate, 5.0, Duration::from_millis(5)).unwrap();
            let recall = mem.read(&key).unwrap();

            prop_assert_eq!(recall.reading_weights.len(), SLOTS);
            prop_assert!(recall.reading_weights.iter().all(|w| (0.0..=1.0).contains(w)));
            let total: f32 = recall.reading_weights.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-4);
            prop_assert!(recall.state.iter().all(|v| v.is_finite()));
        }

        #[test]
        fn writes_blend_each_slot_toward_the_coding(
            slots in prop::collection::vec(-10.0f32..10.0, SLOTS * LEN),
            codings in prop::collection::vec(vector(), 1..8),
            write_rate in 0.1f32..20.0,
        ) {
            let slots = Array2::from_shape_vec((SLOTS, LEN), slots).unwrap();
            let mem = Memory::new(slots, 5.0, write_rate, Duration::from_millis(5)).unwrap();

            for coding in &codings {
                let before = mem.snapshot();
                mem.write(coding).unwrap();
                let after = mem.snapshot();
                for (row_before, row_after) in before.outer_iter().zip(after.outer_iter()) {
                    for ((&old, &new), &c) in row_before.iter().zip(row_after.iter()).zip(coding) {
                        prop_assert!(new.is_finite());
                        prop_assert!(new >= old.min(c) - 1e-3 && new <= old.max(c) + 1e-3);
                    }
                }
            }
            prop_assert_eq!(mem.version(), codings.len() as u64);
        }
    }
}
