// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pipeline counters, shared between the scoring loop, feedback ingest and
//! frame sources.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_received: AtomicU64,
    frames_skipped: AtomicU64,
    frames_admitted: AtomicU64,
    frames_dropped_decode: AtomicU64,
    frames_dropped_backpressure: AtomicU64,
    frames_failed_scoring: AtomicU64,
    frames_discarded_shutdown: AtomicU64,
    events_published: AtomicU64,
    feedback_applied: AtomicU64,
    feedback_rejected: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_received: u64,
    pub frames_skipped: u64,
    pub frames_admitted: u64,
    pub frames_dropped_decode: u64,
    pub frames_dropped_backpressure: u64,
    pub frames_failed_scoring: u64,
    pub frames_discarded_shutdown: u64,
    pub events_published: u64,
    pub feedback_applied: u64,
    pub feedback_rejected: u64,
}

macro_rules! counter {
    ($incr:ident, $field:ident) => {
        pub fn $incr(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_received, frames_received);
    counter!(record_skipped, frames_skipped);
    counter!(record_admitted, frames_admitted);
    counter!(record_decode_drop, frames_dropped_decode);
    counter!(record_backpressure_drop, frames_dropped_backpressure);
    counter!(record_scoring_failure, frames_failed_scoring);
    counter!(record_published, events_published);
    counter!(record_feedback_applied, feedback_applied);
    counter!(record_feedback_rejected, feedback_rejected);

    /// Frames still queued when the intake was closed
    pub fn record_shutdown_discards(&self, count: u64) {
        self.frames_discarded_shutdown.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            frames_admitted: self.frames_admitted.load(Ordering::Relaxed),
            frames_dropped_decode: self.frames_dropped_decode.load(Ordering::Relaxed),
            frames_dropped_backpressure: self.frames_dropped_backpressure.load(Ordering::Relaxed),
            frames_failed_scoring: self.frames_failed_scoring.load(Ordering::Relaxed),
            frames_discarded_shutdown: self.frames_discarded_shutdown.load(Ordering::Relaxed),
            events_published: self.events_published.load(Ordering::Relaxed),
            feedback_applied: self.feedback_applied.load(Ordering::Relaxed),
            feedback_rejected: self.feedback_rejected.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    pub fn log_summary(&self) {
        info!(target: "interest-engine", "Pipeline summary:");
        info!(
            target: "interest-engine",
            "  Frames: {} received, {} skipped, {} admitted",
            self.frames_received, self.frames_skipped, self.frames_admitted
        );
        info!(
            target: "interest-engine",
            "  Dropped: {} decode, {} backpressure, {} scoring, {} at shutdown",
            self.frames_dropped_decode,
            self.frames_dropped_backpressure,
            self.frames_failed_scoring,
            self.frames_discarded_shutdown
        );
        info!(
            target: "interest-engine",
            "  Events published: {}",
            self.events_published
        );
        info!(
            target: "interest-engine",
            "  Feedback: {} applied, {} rejected",
            self.feedback_applied, self.feedback_rejected
        );
    }
}
