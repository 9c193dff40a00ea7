// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scoring model contract and the built-in pooling encoder.

use ndarray::{s, ArrayView1, ArrayView2};
use rayon::prelude::*;

use interest_structures::{FeatureVector, InterestError, InterestResult, PreprocessedTensor};

use crate::compute::ComputeContext;
use crate::memory::cosine_similarity;

/// The learned part of the scorer: turns a tensor into a coding and judges
/// how far a coding is from what the memory recalls for it.
///
/// Implementations must be pure; all adaptive state lives in
/// [`Memory`](crate::Memory).
pub trait ScoringModel: Send + Sync {
    /// Name for logging
    fn name(&self) -> &str;

    /// Shape of every coding [`encode`](Self::encode) produces
    fn coding_shape(&self) -> &[usize];

    fn encode(
        &self,
        tensor: &PreprocessedTensor,
        compute: &ComputeContext,
    ) -> InterestResult<FeatureVector>;

    /// Raw interestingness of `coding` given the recalled `state`, in `[0, 1]`.
    /// The default is `(1 - cos(coding, state)) / 2`.
    fn novelty(&self, coding: &[f32], state: &[f32]) -> f32 {
        let cos = cosine_similarity(ArrayView1::from(coding), ArrayView1::from(state));
        ((1.0 - cos) / 2.0).clamp(0.0, 1.0)
    }
}

/// Encoder that adaptive-average-pools each input channel to a `G x G` grid,
/// giving a `C x G x G` coding.
#[derive(Debug, Clone)]
pub struct MemoryNetwork {
    coding_shape: [usize; 3],
}

impl MemoryNetwork {
    pub fn new(channels: usize, grid: usize) -> InterestResult<Self> {
        if channels == 0 || grid == 0 {
            return Err(InterestError::InvalidParameter(format!(
                "coding shape must be non-empty, got [{}, {}, {}]",
                channels, grid, grid
            )));
        }
        Ok(Self {
            coding_shape: [channels, grid, grid],
        })
    }

    pub fn channels(&self) -> usize {
        self.coding_shape[0]
    }

    pub fn grid(&self) -> usize {
        self.coding_shape[1]
    }
}

impl ScoringModel for MemoryNetwork {
    fn name(&self) -> &str {
        "memory-network"
    }

    fn coding_shape(&self) -> &[usize] {
        &self.coding_shape
    }

    fn encode(
        &self,
        tensor: &PreprocessedTensor,
        compute: &ComputeContext,
    ) -> InterestResult<FeatureVector> {
        let [channels, height, width] = tensor.shape();
        if channels != self.channels() || height == 0 || width == 0 {
            return Err(InterestError::ShapeMismatch {
                expected: vec![self.channels(), height.max(1), width.max(1)],
                actual: tensor.shape().to_vec(),
            });
        }

        let grid = self.grid();
        let view = tensor.view();
        let pooled: Vec<Vec<f32>> = compute.install(|| {
            (0..channels)
                .into_par_iter()
                .map(|c| adaptive_avg_pool(view.slice(s![c, .., ..]), grid))
                .collect()
        });

        FeatureVector::new(self.coding_shape.to_vec(), pooled.concat())
    }
}

/// Bin `i` of `n` over an axis of length `len` spans
/// `[floor(i * len / n), ceil((i + 1) * len / n))`.
fn bin(i: usize, n: usize, len: usize) -> (usize, usize) {
    let start = i * len / n;
    let end = ((i + 1) * len).div_ceil(n);
    (start, end.max(start + 1).min(len.max(1)))
}

fn adaptive_avg_pool(plane: ArrayView2<'_, f32>, grid: usize) -> Vec<f32> {
    let (height, width) = plane.dim();
    let mut out = Vec::with_capacity(grid * grid);
    for gy in 0..grid {
        let (y0, y1) = bin(gy, grid, height);
        for gx in 0..grid {
            let (x0, x1) = bin(gx, grid, width);
            out.push(plane.slice(s![y0..y1, x0..x1]).mean().unwrap_or(0.0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_pooling_averages_quadrants() {
        let net = MemoryNetwork::new(1, 2).unwrap();
        let compute = ComputeContext::cpu(1).unwrap();
        // 4x4 plane whose quadrants hold 1, 2, 3, 4
        let tensor = PreprocessedTensor::new(Array3::from_shape_fn((1, 4, 4), |(_, y, x)| {
            (1 + (y / 2) * 2 + x / 2) as f32
        }));
        let coding = net.encode(&tensor, &compute).unwrap();
        assert_eq!(coding.shape(), &[1, 2, 2]);
        assert_eq!(coding.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_grid_larger_than_input() {
        let net = MemoryNetwork::new(1, 3).unwrap();
        let compute = ComputeContext::cpu(1).unwrap();
        let tensor = PreprocessedTensor::new(Array3::from_elem((1, 2, 2), 0.5));
        let coding = net.encode(&tensor, &compute).unwrap();
        assert_eq!(coding.len(), 9);
        assert!(coding.as_slice().iter().all(|v| (*v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let net = MemoryNetwork::new(3, 2).unwrap();
        let compute = ComputeContext::cpu(1).unwrap();
        let tensor = PreprocessedTensor::new(Array3::zeros((1, 4, 4)));
        assert!(matches!(
            net.encode(&tensor, &compute),
            Err(InterestError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_novelty_bounds() {
        let net = MemoryNetwork::new(1, 1).unwrap();
        assert!(net.novelty(&[1.0, 0.0], &[1.0, 0.0]) < 1e-6);
        assert!((net.novelty(&[1.0, 0.0], &[-1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((net.novelty(&[1.0, 0.0], &[0.0, 1.0]) - 0.5).abs() < 1e-6);
    }
}
