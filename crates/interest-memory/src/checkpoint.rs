// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Memory checkpoint file.
//!
//! A checkpoint is a JSON document:
//!
//! ```json
//! { "format_version": 1, "coding_shape": [C, G, G], "slots": [[...], ...] }
//! ```
//!
//! Every slot holds `C * G * G` finite values. Any violation is a
//! [`InterestError::Checkpoint`] and is fatal at startup.

use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

use interest_structures::{InterestError, InterestResult};

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryCheckpoint {
    pub format_version: u32,
    pub coding_shape: [usize; 3],
    pub slots: Vec<Vec<f32>>,
}

impl MemoryCheckpoint {
    pub fn new(coding_shape: [usize; 3], slots: Vec<Vec<f32>>) -> InterestResult<Self> {
        let checkpoint = Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            coding_shape,
            slots,
        };
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Load and validate a checkpoint file
    pub fn load(path: &Path) -> InterestResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            InterestError::Checkpoint(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let checkpoint: Self = serde_json::from_str(&contents).map_err(|e| {
            InterestError::Checkpoint(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        checkpoint.validate()?;

        info!(
            target: "interest-memory",
            "Loaded checkpoint {} ({} slots, coding shape {:?})",
            path.display(),
            checkpoint.slots.len(),
            checkpoint.coding_shape
        );
        Ok(checkpoint)
    }

    pub fn save(&self, path: &Path) -> InterestResult<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                InterestError::Checkpoint(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string(self)
            .map_err(|e| InterestError::Checkpoint(format!("Failed to encode checkpoint: {}", e)))?;
        fs::write(path, json).map_err(|e| {
            InterestError::Checkpoint(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    pub fn coding_len(&self) -> usize {
        self.coding_shape.iter().product()
    }

    pub fn validate(&self) -> InterestResult<()> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(InterestError::Checkpoint(format!(
                "Unsupported checkpoint format version {} (expected {})",
                self.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        let coding_len = self.coding_len();
        if coding_len == 0 {
            return Err(InterestError::Checkpoint(format!(
                "Coding shape {:?} is empty",
                self.coding_shape
            )));
        }
        if self.coding_shape[1] != self.coding_shape[2] {
            return Err(InterestError::Checkpoint(format!(
                "Coding grid must be square, got {:?}",
                self.coding_shape
            )));
        }
        if self.slots.is_empty() {
            return Err(InterestError::Checkpoint("Checkpoint has no memory slots".to_string()));
        }
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.len() != coding_len {
                return Err(InterestError::Checkpoint(format!(
                    "Slot {} has {} values, coding shape {:?} needs {}",
                    i,
                    slot.len(),
                    self.coding_shape,
                    coding_len
                )));
            }
            if slot.iter().any(|v| !v.is_finite()) {
                return Err(InterestError::Checkpoint(format!(
                    "Slot {} contains non-finite values",
                    i
                )));
            }
        }
        Ok(())
    }

    /// Slots as an `N x D` matrix
    pub fn slot_matrix(&self) -> InterestResult<Array2<f32>> {
        let rows = self.slots.len();
        let flat: Vec<f32> = self.slots.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows, self.coding_len()), flat)
            .map_err(|e| InterestError::Checkpoint(e.to_string()))
    }
}
