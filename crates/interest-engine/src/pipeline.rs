// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Pipeline driver
//!
//! Frame path: [`FrameSubmitter`] (gate + bounded intake) feeds the
//! [`InterestPipeline`] scoring loop, which runs preprocessing, scoring,
//! smoothing and publication for one frame at a time.
//!
//! Feedback path: records arrive on an mpsc channel and go straight to
//! [`FeedbackIngest`], concurrently with scoring. The two paths only meet
//! inside the memory lock of the [`ScoringEngine`].
//!
//! Shutdown: the intake is closed (queued frames are discarded), the frame
//! being scored finishes and is published, feedback stops being read, and
//! [`run_pipeline`] returns the final counters.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use interest_config::InterestConfig;
use interest_memory::ScoringEngine;
use interest_structures::{
    FeedbackRecord, Frame, InterestError, InterestEvent, InterestResult,
};
use interest_vision::{FrameGate, Preprocessor};

use crate::feedback_ingest::FeedbackIngest;
use crate::intake::{FrameIntake, PushOutcome};
use crate::publisher::EventPublisher;
use crate::shutdown::Shutdown;
use crate::smoother::Smoother;
use crate::stats::{PipelineStats, StatsSnapshot};

/// Frame path settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub skip_frames: u32,
    pub crop_size: u32,
    pub window_size: usize,
    pub intake_capacity: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            skip_frames: 1,
            crop_size: 320,
            window_size: 1,
            intake_capacity: 10,
        }
    }
}

impl From<&InterestConfig> for PipelineSettings {
    fn from(config: &InterestConfig) -> Self {
        Self {
            skip_frames: config.pipeline.skip_frames,
            crop_size: config.preprocess.crop_size,
            window_size: config.pipeline.window_size,
            intake_capacity: config.pipeline.intake_capacity,
        }
    }
}

/// What happened to one frame
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    /// Rejected by the frame gate
    Skipped,
    /// Could not be preprocessed; dropped
    DecodeFailed,
    /// The scoring engine failed; dropped
    ScoringFailed,
    Published(Arc<InterestEvent>),
}

impl FrameOutcome {
    pub fn event(&self) -> Option<&Arc<InterestEvent>> {
        match self {
            FrameOutcome::Published(event) => Some(event),
            _ => None,
        }
    }
}

/// Gate plus bounded intake, used by frame sources
#[derive(Clone)]
pub struct FrameSubmitter {
    gate: FrameGate,
    intake: Arc<FrameIntake>,
    stats: Arc<PipelineStats>,
}

impl FrameSubmitter {
    pub fn new(gate: FrameGate, intake: Arc<FrameIntake>, stats: Arc<PipelineStats>) -> Self {
        Self {
            gate,
            intake,
            stats,
        }
    }

    /// Offer a frame to the pipeline. Returns `Ok(true)` if it was queued for
    /// scoring, `Ok(false)` if the gate skipped it, and
    /// [`InterestError::ShutDown`] once the intake is closed.
    pub fn submit(&self, frame: Frame) -> InterestResult<bool> {
        self.stats.record_received();
        if !self.gate.admit(&frame) {
            self.stats.record_skipped();
            return Ok(false);
        }
        let sequence_id = frame.sequence_id();
        let frame_id = frame.frame_id().to_string();
        let source = frame.source().to_string();

        match self.intake.push(frame) {
            PushOutcome::Queued => {}
            PushOutcome::DroppedOldest(dropped) => {
                self.stats.record_backpressure_drop();
                debug!(
                    target: "interest-engine",
                    "Intake full, dropped oldest frame {}",
                    dropped
                );
            }
            PushOutcome::Closed => return Err(InterestError::ShutDown),
        }
        self.stats.record_admitted();
        debug!(
            target: "interest-engine",
            "Admitted frame {} ({}) from {}",
            sequence_id,
            frame_id,
            source
        );
        Ok(true)
    }
}

/// The single scoring path
pub struct InterestPipeline {
    gate: FrameGate,
    preprocessor: Preprocessor,
    engine: Arc<ScoringEngine>,
    smoother: Smoother,
    publisher: EventPublisher,
    stats: Arc<PipelineStats>,
}

impl InterestPipeline {
    pub fn new(
        settings: &PipelineSettings,
        engine: Arc<ScoringEngine>,
        publisher: EventPublisher,
        stats: Arc<PipelineStats>,
    ) -> InterestResult<Self> {
        Ok(Self {
            gate: FrameGate::new(settings.skip_frames)?,
            preprocessor: Preprocessor::new(settings.crop_size)?,
            engine,
            smoother: Smoother::new(settings.window_size)?,
            publisher,
            stats,
        })
    }

    pub fn engine(&self) -> &Arc<ScoringEngine> {
        &self.engine
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn gate(&self) -> FrameGate {
        self.gate
    }

    /// Gate and process one frame synchronously
    pub fn process_frame(&mut self, frame: &Frame) -> FrameOutcome {
        self.stats.record_received();
        if !self.gate.admit(frame) {
            self.stats.record_skipped();
            return FrameOutcome::Skipped;
        }
        self.stats.record_admitted();
        debug!(
            target: "interest-engine",
            "Admitted frame {} ({}) from {}",
            frame.sequence_id(),
            frame.frame_id(),
            frame.source()
        );
        self.process_admitted(frame)
    }

    /// Score frames from `intake` until it is closed
    pub fn run_blocking(&mut self, intake: &FrameIntake) {
        while let Some(frame) = intake.pop_blocking() {
            self.process_admitted(&frame);
        }
    }

    fn process_admitted(&mut self, frame: &Frame) -> FrameOutcome {
        let tensor = match self.preprocessor.prepare(frame) {
            Ok(tensor) => tensor,
            Err(e) => {
                self.stats.record_decode_drop();
                warn!(
                    target: "interest-engine",
                    "Dropping frame {} ({}): {}",
                    frame.sequence_id(),
                    frame.frame_id(),
                    e
                );
                return FrameOutcome::DecodeFailed;
            }
        };

        let observation = match self.engine.score(&tensor) {
            Ok(observation) => observation,
            Err(e) => {
                self.stats.record_scoring_failure();
                warn!(
                    target: "interest-engine",
                    "Scoring failed for frame {}: {}",
                    frame.sequence_id(),
                    e
                );
                return FrameOutcome::ScoringFailed;
            }
        };

        let level = self.smoother.append(observation.raw_score);
        let display = self
            .publisher
            .wants_display()
            .then(|| self.preprocessor.annotate(&tensor, level));
        let event = self
            .publisher
            .publish(
                frame.header().clone(),
                &self.preprocessor.denormalize(&tensor),
                observation,
                level,
                display,
            );
        self.stats.record_published();
        FrameOutcome::Published(event)
    }
}

/// Run the scoring loop and the feedback loop until `shutdown` triggers.
///
/// Frames are read from `intake`; feedback from `feedback_rx`. Returns the
/// final counters once both loops have stopped.
pub async fn run_pipeline(
    mut pipeline: InterestPipeline,
    intake: Arc<FrameIntake>,
    mut feedback_rx: mpsc::Receiver<FeedbackRecord>,
    shutdown: Shutdown,
) -> InterestResult<StatsSnapshot> {
    let stats = Arc::clone(pipeline.stats());
    let ingest = FeedbackIngest::new(Arc::clone(pipeline.engine()), Arc::clone(&stats));

    let closer = {
        let intake = Arc::clone(&intake);
        let stats = Arc::clone(&stats);
        let mut listener = shutdown.subscribe();
        tokio::spawn(async move {
            listener.wait().await;
            let discarded = intake.close();
            stats.record_shutdown_discards(discarded as u64);
            info!(
                target: "interest-engine",
                "Shutdown requested, discarded {} queued frames",
                discarded
            );
        })
    };

    let scoring = {
        let intake = Arc::clone(&intake);
        tokio::task::spawn_blocking(move || pipeline.run_blocking(&intake))
    };

    let feedback = {
        let mut listener = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = listener.wait() => break,
                    record = feedback_rx.recv() => match record {
                        Some(record) => {
                            // The memory lock may be held by scoring
                            let ingest = ingest.clone();
                            let applied =
                                tokio::task::spawn_blocking(move || ingest.ingest(record)).await;
                            if let Err(e) = applied {
                                warn!(target: "interest-engine", "Feedback task failed: {}", e);
                            }
                        }
                        None => {
                            debug!(target: "interest-engine", "Feedback channel closed");
                            break;
                        }
                    },
                }
            }
        })
    };

    let join_error = |task: &str, e: tokio::task::JoinError| {
        InterestError::Transport(format!("{} task failed: {}", task, e))
    };
    closer.await.map_err(|e| join_error("shutdown", e))?;
    scoring.await.map_err(|e| join_error("scoring", e))?;
    feedback.await.map_err(|e| join_error("feedback", e))?;

    Ok(stats.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::BroadcastSink;
    use chrono::Utc;
    use interest_memory::{
        ComputeContext, EngineSettings, Memory, MemoryCheckpoint, MemoryNetwork, ScoringModel,
    };
    use interest_structures::{ChannelLayout, FeatureVector, FrameHeader, PreprocessedTensor};
    use ndarray::Array2;
    use std::sync::Barrier;
    use std::time::Duration;

    fn engine() -> Arc<ScoringEngine> {
        let slots = vec![vec![0.5; 12], (0..12).map(|i| i as f32).collect()];
        let checkpoint = MemoryCheckpoint::new([3, 2, 2], slots).unwrap();
        Arc::new(
            ScoringEngine::from_checkpoint(
                &checkpoint,
                EngineSettings::default(),
                ComputeContext::cpu(1).unwrap(),
            )
            .unwrap(),
        )
    }

    fn frame(seq: u64) -> Frame {
        let pixels: Vec<u8> = (0..8 * 8 * 3).map(|i| ((i as u64 * 7 + seq * 13) % 256) as u8).collect();
        Frame::new(
            FrameHeader::new(seq, Utc::now(), "camera"),
            "/camera/image",
            8,
            8,
            ChannelLayout::Rgb8,
            pixels,
        )
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            skip_frames: 1,
            crop_size: 4,
            window_size: 1,
            intake_capacity: 4,
        }
    }

    #[test]
    fn test_decode_failure_drops_frame_and_continues() {
        let stats = Arc::new(PipelineStats::new());
        let mut pipeline =
            InterestPipeline::new(&settings(), engine(), EventPublisher::new(), Arc::clone(&stats)).unwrap();
        let bad = Frame::new(
            FrameHeader::new(0, Utc::now(), "camera"),
            "/camera/image",
            8,
            8,
            ChannelLayout::Rgb8,
            vec![0u8; 5],
        );
        assert!(matches!(pipeline.process_frame(&bad), FrameOutcome::DecodeFailed));
        assert!(pipeline.process_frame(&frame(1)).event().is_some());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_dropped_decode, 1);
        assert_eq!(snapshot.events_published, 1);
    }

    #[test]
    fn test_window_one_level_equals_raw_score() {
        let stats = Arc::new(PipelineStats::new());
        let mut pipeline =
            InterestPipeline::new(&settings(), engine(), EventPublisher::new(), stats).unwrap();
        for seq in 0..3 {
            let outcome = pipeline.process_frame(&frame(seq));
            let event = outcome.event().unwrap();
            assert_eq!(event.level, event.raw_score);
            assert_eq!(event.image.shape(), &[3, 4, 4]);
            assert!(event
                .image
                .as_slice()
                .iter()
                .all(|v| (-1e-5..=1.0 + 1e-5).contains(v)));
        }
    }

    #[test]
    fn test_submitter_gates_and_counts_backpressure() {
        let stats = Arc::new(PipelineStats::new());
        let intake = Arc::new(FrameIntake::new(2));
        let submitter = FrameSubmitter::new(FrameGate::new(2).unwrap(), Arc::clone(&intake), Arc::clone(&stats));
        for seq in 0..8 {
            submitter.submit(frame(seq)).unwrap();
        }
        // Admitted 0, 2, 4, 6; the queue keeps the newest two
        assert_eq!(intake.len(), 2);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.frames_received, 8);
        assert_eq!(snapshot.frames_skipped, 4);
        assert_eq!(snapshot.frames_admitted, 4);
        assert_eq!(snapshot.frames_dropped_backpressure, 2);

        intake.close();
        assert!(matches!(submitter.submit(frame(10)), Err(InterestError::ShutDown)));
    }

    #[tokio::test]
    async fn test_run_pipeline_scores_until_shutdown() {
        let stats = Arc::new(PipelineStats::new());
        let broadcast = BroadcastSink::new(16, false);
        let mut events = broadcast.subscribe();
        let pipeline = InterestPipeline::new(
            &settings(),
            engine(),
            EventPublisher::new().with_sink(broadcast),
            Arc::clone(&stats),
        )
        .unwrap();
        let intake = Arc::new(FrameIntake::new(4));
        let (_feedback_tx, feedback_rx) = mpsc::channel(4);
        let shutdown = Shutdown::new();
        let run = tokio::spawn(run_pipeline(pipeline, Arc::clone(&intake), feedback_rx, shutdown.clone()));

        let submitter = FrameSubmitter::new(FrameGate::new(1).unwrap(), Arc::clone(&intake), stats);
        submitter.submit(frame(0)).unwrap();
        let first = events.recv().await.unwrap();
        assert_eq!(first.event.sequence_id(), 0);

        shutdown.trigger();
        let snapshot = run.await.unwrap().unwrap();
        assert_eq!(snapshot.events_published, 1);
        assert!(matches!(submitter.submit(frame(1)), Err(InterestError::ShutDown)));
    }

    /// Pooling encoder that parks inside `encode` until released
    struct ParkedModel {
        inner: MemoryNetwork,
        entered: Arc<Barrier>,
        release: Arc<Barrier>,
    }

    impl ScoringModel for ParkedModel {
        fn name(&self) -> &str {
            "parked"
        }

        fn coding_shape(&self) -> &[usize] {
            self.inner.coding_shape()
        }

        fn encode(
            &self,
            tensor: &PreprocessedTensor,
            compute: &ComputeContext,
        ) -> InterestResult<FeatureVector> {
            self.entered.wait();
            self.release.wait();
            self.inner.encode(tensor, compute)
        }
    }

    fn parked_engine() -> (Arc<ScoringEngine>, Arc<Barrier>, Arc<Barrier>) {
        let entered = Arc::new(Barrier::new(2));
        let release = Arc::new(Barrier::new(2));
        let model = ParkedModel {
            inner: MemoryNetwork::new(3, 2).unwrap(),
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        };
        let slots = Array2::from_shape_fn((2, 12), |(s, i)| (s * 12 + i) as f32 / 24.0);
        let memory = Memory::new(slots, 5.0, 5.0, Duration::from_millis(5)).unwrap();
        let engine = Arc::new(
            ScoringEngine::new(Arc::new(model), memory, ComputeContext::cpu(1).unwrap()).unwrap(),
        );
        (engine, entered, release)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_during_scoring_publishes_in_flight_frame_only() {
        let (engine, entered, release) = parked_engine();

        let stats = Arc::new(PipelineStats::new());
        let broadcast = BroadcastSink::new(16, false);
        let mut events = broadcast.subscribe();
        let pipeline = InterestPipeline::new(
            &settings(),
            engine,
            EventPublisher::new().with_sink(broadcast),
            Arc::clone(&stats),
        )
        .unwrap();
        let intake = Arc::new(FrameIntake::new(4));
        let (_feedback_tx, feedback_rx) = mpsc::channel(4);
        let shutdown = Shutdown::new();
        let run = tokio::spawn(run_pipeline(pipeline, Arc::clone(&intake), feedback_rx, shutdown.clone()));

        let submitter = FrameSubmitter::new(FrameGate::new(1).unwrap(), Arc::clone(&intake), Arc::clone(&stats));
        submitter.submit(frame(0)).unwrap();
        entered.wait();

        // Frame 0 is inside the model; these two wait in the queue
        submitter.submit(frame(1)).unwrap();
        submitter.submit(frame(2)).unwrap();
        assert_eq!(intake.len(), 2);

        shutdown.trigger();
        while !intake.is_closed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        release.wait();

        let snapshot = run.await.unwrap().unwrap();
        assert_eq!(snapshot.frames_admitted, 3);
        assert_eq!(snapshot.events_published, 1);
        assert_eq!(snapshot.frames_discarded_shutdown, 2);
        assert_eq!(events.recv().await.unwrap().event.sequence_id(), 0);
        assert!(events.try_recv().is_err());
        assert!(intake.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_feedback_applies_while_frame_is_being_scored() {
        let (engine, entered, release) = parked_engine();
        let stats = Arc::new(PipelineStats::new());
        let pipeline = InterestPipeline::new(
            &settings(),
            Arc::clone(&engine),
            EventPublisher::new(),
            Arc::clone(&stats),
        )
        .unwrap();
        let intake = Arc::new(FrameIntake::new(4));
        let (feedback_tx, feedback_rx) = mpsc::channel(4);
        let shutdown = Shutdown::new();
        let run = tokio::spawn(run_pipeline(pipeline, Arc::clone(&intake), feedback_rx, shutdown.clone()));

        let submitter = FrameSubmitter::new(FrameGate::new(1).unwrap(), Arc::clone(&intake), Arc::clone(&stats));
        submitter.submit(frame(0)).unwrap();
        entered.wait();

        feedback_tx
            .send(FeedbackRecord::new(0, FeatureVector::from_flat(vec![0.3; 12])))
            .await
            .unwrap();
        while engine.memory().version() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        release.wait();

        // Let the scored frame reach the publisher before stopping
        while stats.snapshot().events_published == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        shutdown.trigger();
        let snapshot = run.await.unwrap().unwrap();
        assert_eq!(snapshot.feedback_applied, 1);
        assert_eq!(snapshot.events_published, 1);
    }
}
