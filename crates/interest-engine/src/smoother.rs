// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Moving average over the most recent raw scores.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use interest_structures::{InterestError, InterestResult};

/// Fixed-capacity moving average. Owned by the single scoring path.
#[derive(Debug, Clone)]
pub struct Smoother {
    window: VecDeque<f32>,
    capacity: NonZeroUsize,
    sum: f64,
}

impl Smoother {
    pub fn new(window_size: usize) -> InterestResult<Self> {
        let capacity = NonZeroUsize::new(window_size).ok_or_else(|| {
            InterestError::InvalidParameter("window_size must be >= 1".to_string())
        })?;
        Ok(Self {
            window: VecDeque::with_capacity(capacity.get()),
            capacity,
            sum: 0.0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Insert `raw_score`, evict the oldest value if over capacity, and
    /// return the mean of the window.
    pub fn append(&mut self, raw_score: f32) -> f32 {
        if self.capacity.get() == 1 {
            self.window.clear();
            self.window.push_back(raw_score);
            self.sum = raw_score as f64;
            return raw_score;
        }

        self.window.push_back(raw_score);
        self.sum += raw_score as f64;
        if self.window.len() > self.capacity.get() {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest as f64;
            }
        }
        (self.sum / self.window.len() as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_window_of_two() {
        let mut smoother = Smoother::new(2).unwrap();
        let levels: Vec<f32> = [0.2, 0.4, 0.6, 0.8]
            .into_iter()
            .map(|s| smoother.append(s))
            .collect();
        for (got, want) in levels.iter().zip([0.2, 0.3, 0.5, 0.7]) {
            assert!((got - want).abs() < 1e-6, "{} != {}", got, want);
        }
    }

    #[test]
    fn test_zero_window_is_rejected() {
        assert!(Smoother::new(0).is_err());
    }

    proptest! {
        #[test]
        fn window_one_is_identity(scores in prop::collection::vec(-1.0e6f32..1.0e6, 1..64)) {
            let mut smoother = Smoother::new(1).unwrap();
            for s in scores {
                prop_assert_eq!(smoother.append(s), s);
            }
        }

        #[test]
        fn output_is_mean_of_recent_values(
            scores in prop::collection::vec(0.0f32..1.0, 1..64),
            window in 1usize..10,
        ) {
            let mut smoother = Smoother::new(window).unwrap();
            for (i, s) in scores.iter().enumerate() {
                let level = smoother.append(*s);
                let start = (i + 1).saturating_sub(window);
                let recent = &scores[start..=i];
                let mean = recent.iter().map(|v| *v as f64).sum::<f64>() / recent.len() as f64;
                prop_assert!((level as f64 - mean).abs() < 1e-5);
            }
        }
    }
}
