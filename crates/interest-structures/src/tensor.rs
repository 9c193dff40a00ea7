// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ndarray::{Array3, ArrayView3};

use crate::{FeatureVector, InterestError, InterestResult};

/// A normalized, channels-first `(channels, height, width)` image tensor.
///
/// Produced from exactly one frame and owned by the pipeline invocation that
/// produced it; it is moved into the published event after scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor {
    data: Array3<f32>,
}

impl PreprocessedTensor {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Rebuild a tensor from its flattened form, e.g. the `image` field of an event.
    pub fn from_feature_vector(vector: &FeatureVector) -> InterestResult<Self> {
        vector.validate()?;
        let shape = vector.shape();
        if shape.len() != 3 {
            return Err(InterestError::ShapeMismatch {
                expected: vec![3, 0, 0],
                actual: shape.to_vec(),
            });
        }
        let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), vector.as_slice().to_vec())
            .map_err(|e| InterestError::InvalidParameter(e.to_string()))?;
        Ok(Self { data })
    }

    /// `[channels, height, width]`
    pub fn shape(&self) -> [usize; 3] {
        let (c, h, w) = self.data.dim();
        [c, h, w]
    }

    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Flatten in row-major `(channel, row, column)` order.
    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector::from_shape_unchecked(self.shape().to_vec(), self.data.iter().copied().collect())
    }

    /// Flatten, consuming the tensor.
    pub fn into_feature_vector(self) -> FeatureVector {
        self.to_feature_vector()
    }
}
