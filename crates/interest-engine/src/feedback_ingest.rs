// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Feedback path: external "not interesting" judgments written into memory.

use std::sync::Arc;

use tracing::{info, warn};

use interest_memory::ScoringEngine;
use interest_structures::{FeedbackRecord, InterestResult};

use crate::stats::PipelineStats;

#[derive(Clone)]
pub struct FeedbackIngest {
    engine: Arc<ScoringEngine>,
    stats: Arc<PipelineStats>,
}

impl FeedbackIngest {
    pub fn new(engine: Arc<ScoringEngine>, stats: Arc<PipelineStats>) -> Self {
        Self { engine, stats }
    }

    /// Apply one record. A rejected record is logged and counted; the error
    /// is returned for callers that want it but is never fatal.
    pub fn ingest(&self, record: FeedbackRecord) -> InterestResult<u64> {
        info!(
            target: "interest-engine",
            "Feedback received for frame {} (coding shape {:?})",
            record.sequence_id,
            record.coding.shape()
        );
        match self.engine.feedback(&record.coding) {
            Ok(version) => {
                self.stats.record_feedback_applied();
                Ok(version)
            }
            Err(e) => {
                self.stats.record_feedback_rejected();
                warn!(
                    target: "interest-engine",
                    "Feedback for frame {} rejected: {}",
                    record.sequence_id,
                    e
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interest_memory::{ComputeContext, EngineSettings, MemoryCheckpoint};
    use interest_structures::{FeatureVector, InterestError};

    fn ingest() -> (FeedbackIngest, Arc<PipelineStats>) {
        let checkpoint = MemoryCheckpoint::new([3, 1, 1], vec![vec![1.0, 0.0, 0.0]]).unwrap();
        let engine = ScoringEngine::from_checkpoint(
            &checkpoint,
            EngineSettings::default(),
            ComputeContext::cpu(1).unwrap(),
        )
        .unwrap();
        let stats = Arc::new(PipelineStats::new());
        (FeedbackIngest::new(Arc::new(engine), Arc::clone(&stats)), stats)
    }

    #[test]
    fn test_valid_feedback_is_applied() {
        let (ingest, stats) = ingest();
        let coding = FeatureVector::new(vec![3, 1, 1], vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(ingest.ingest(FeedbackRecord::new(9, coding)).unwrap(), 1);
        assert_eq!(stats.snapshot().feedback_applied, 1);
    }

    #[test]
    fn test_wrong_shape_is_rejected_and_counted() {
        let (ingest, stats) = ingest();
        let coding = FeatureVector::from_flat(vec![1.0; 5]);
        let result = ingest.ingest(FeedbackRecord::new(9, coding));
        assert!(matches!(result, Err(InterestError::ShapeMismatch { .. })));
        assert_eq!(stats.snapshot().feedback_rejected, 1);
        assert_eq!(stats.snapshot().feedback_applied, 0);
    }
}
