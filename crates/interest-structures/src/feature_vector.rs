// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flattened numeric tensors with an explicit shape.

use crate::{InterestError, InterestResult};
use serde::{Deserialize, Serialize};

/// A row-major flattened tensor and the shape it was flattened from.
///
/// This is the form in which tensors, states, codings and reading weights
/// cross stage boundaries. Deserialized values are not checked on the way in;
/// call [`FeatureVector::validate`] before trusting data from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl FeatureVector {
    /// Create a vector, checking that `data` holds exactly `product(shape)` values.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> InterestResult<Self> {
        let vector = Self { shape, data };
        vector.validate()?;
        Ok(vector)
    }

    /// Create a one dimensional vector.
    pub fn from_flat(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Create a vector whose consistency the caller already guarantees.
    pub(crate) fn from_shape_unchecked(shape: Vec<usize>, data: Vec<f32>) -> Self {
        debug_assert_eq!(Self::element_count_of(&shape), Some(data.len()));
        Self { shape, data }
    }

    /// Check that the declared shape accounts for every value.
    pub fn validate(&self) -> InterestResult<()> {
        if Self::element_count_of(&self.shape) != Some(self.data.len()) {
            return Err(InterestError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: vec![self.data.len()],
            });
        }
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements a tensor of `shape` holds, or `None` if that count
    /// does not fit in `usize`. An empty shape is a scalar.
    pub fn element_count_of(shape: &[usize]) -> Option<usize> {
        shape.iter().try_fold(1usize, |count, &dim| count.checked_mul(dim))
    }
}
