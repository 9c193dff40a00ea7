// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Event publication
//!
//! [`EventPublisher`] assembles the [`InterestEvent`] for a scored frame and
//! hands it to every configured [`EventSink`]. Delivery is fire-and-forget:
//! a failing sink is logged and the pipeline moves on.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use image::RgbImage;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use interest_structures::{
    FrameHeader, InterestError, InterestEvent, InterestResult, Observation, PreprocessedTensor,
};

/// An event plus its companion display image
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: Arc<InterestEvent>,
    pub display: Option<Arc<RgbImage>>,
}

/// Outbound event transport
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this sink uses the annotated display image
    fn wants_display(&self) -> bool {
        false
    }

    fn emit(&self, published: &PublishedEvent) -> InterestResult<()>;
}

#[derive(Default)]
pub struct EventPublisher {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// True if any sink wants display images
    pub fn wants_display(&self) -> bool {
        self.sinks.iter().any(|s| s.wants_display())
    }

    /// Build the event for one scored frame and emit it to every sink.
    /// `image` is the cropped frame with channel values in `[0, 1]`.
    pub fn publish(
        &self,
        header: FrameHeader,
        image: &PreprocessedTensor,
        observation: Observation,
        level: f32,
        display: Option<RgbImage>,
    ) -> Arc<InterestEvent> {
        let event = Arc::new(InterestEvent {
            header,
            raw_score: observation.raw_score,
            level,
            image: image.to_feature_vector(),
            state: observation.state,
            coding: observation.coding,
            reading_weights: observation.reading_weights,
        });
        let published = PublishedEvent {
            event: Arc::clone(&event),
            display: display.map(Arc::new),
        };

        for sink in &self.sinks {
            if let Err(e) = sink.emit(&published) {
                warn!(
                    target: "interest-engine",
                    "Sink '{}' failed for event {}: {}",
                    sink.name(),
                    event.sequence_id(),
                    e
                );
            }
        }
        debug!(
            target: "interest-engine",
            "Published event {} (raw={:.4}, level={:.4})",
            event.sequence_id(),
            event.raw_score,
            event.level
        );
        event
    }
}

/// In-process fan-out. Bounded; receivers that fall behind lose the oldest
/// events.
pub struct BroadcastSink {
    tx: broadcast::Sender<PublishedEvent>,
    with_display: bool,
}

impl BroadcastSink {
    pub fn new(capacity: usize, with_display: bool) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, with_display }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.tx.subscribe()
    }

    /// Sender handle, for subscribing after the sink moved into a publisher
    pub fn sender(&self) -> broadcast::Sender<PublishedEvent> {
        self.tx.clone()
    }
}

impl EventSink for BroadcastSink {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn wants_display(&self) -> bool {
        self.with_display
    }

    fn emit(&self, published: &PublishedEvent) -> InterestResult<()> {
        // No subscribers is not an error for a best-effort channel
        let _ = self.tx.send(published.clone());
        Ok(())
    }
}

/// One JSON object per line, optionally with a PNG per event
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
    image_dir: Option<PathBuf>,
}

impl JsonLinesSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
            image_dir: None,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Also write `<sequence_id>.png` display images into `dir`
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> InterestResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            InterestError::Transport(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        self.image_dir = Some(dir);
        Ok(self)
    }
}

impl EventSink for JsonLinesSink {
    fn name(&self) -> &str {
        "json-lines"
    }

    fn wants_display(&self) -> bool {
        self.image_dir.is_some()
    }

    fn emit(&self, published: &PublishedEvent) -> InterestResult<()> {
        let line = serde_json::to_string(published.event.as_ref())?;
        {
            let mut writer = self.writer.lock();
            writeln!(writer, "{}", line).map_err(|e| InterestError::Transport(e.to_string()))?;
            writer.flush().map_err(|e| InterestError::Transport(e.to_string()))?;
        }

        if let (Some(dir), Some(display)) = (&self.image_dir, &published.display) {
            let path = dir.join(format!("{:08}.png", published.event.sequence_id()));
            display
                .save(&path)
                .map_err(|e| InterestError::Transport(format!("{}: {}", path.display(), e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use interest_structures::FeatureVector;
    use ndarray::Array3;

    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        fn emit(&self, _published: &PublishedEvent) -> InterestResult<()> {
            Err(InterestError::Transport("down".to_string()))
        }
    }

    fn observation() -> Observation {
        Observation {
            raw_score: 0.25,
            state: FeatureVector::from_flat(vec![0.1, 0.2]),
            coding: FeatureVector::from_flat(vec![0.3, 0.4]),
            reading_weights: FeatureVector::from_flat(vec![1.0]),
            memory_version: 0,
        }
    }

    fn tensor() -> PreprocessedTensor {
        PreprocessedTensor::new(Array3::zeros((3, 2, 2)))
    }

    #[test]
    fn test_publish_assembles_event() {
        let publisher = EventPublisher::new();
        let header = FrameHeader::new(4, Utc::now(), "camera");
        let event = publisher.publish(header.clone(), &tensor(), observation(), 0.5, None);
        assert_eq!(event.header, header);
        assert_eq!(event.raw_score, 0.25);
        assert_eq!(event.level, 0.5);
        assert_eq!(event.image.shape(), &[3, 2, 2]);
        assert_eq!(event.coding.as_slice(), &[0.3, 0.4]);
    }

    #[test]
    fn test_failing_sink_does_not_stop_others() {
        let broadcast = BroadcastSink::new(4, false);
        let mut rx = broadcast.subscribe();
        let publisher = EventPublisher::new().with_sink(FailingSink).with_sink(broadcast);

        publisher.publish(FrameHeader::new(1, Utc::now(), "camera"), &tensor(), observation(), 0.1, None);
        let received = rx.try_recv().unwrap();
        assert_eq!(received.event.sequence_id(), 1);
    }

    #[test]
    fn test_lagging_receiver_loses_oldest() {
        let broadcast = BroadcastSink::new(2, false);
        let mut rx = broadcast.subscribe();
        let publisher = EventPublisher::new().with_sink(broadcast);
        for seq in 0..4 {
            publisher.publish(FrameHeader::new(seq, Utc::now(), "camera"), &tensor(), observation(), 0.1, None);
        }
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Lagged(2))));
        assert_eq!(rx.try_recv().unwrap().event.sequence_id(), 2);
        assert_eq!(rx.try_recv().unwrap().event.sequence_id(), 3);
    }

    #[test]
    fn test_json_lines_sink_writes_one_line_per_event() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = JsonLinesSink::new(Box::new(SharedBuffer(Arc::clone(&buffer))));
        let publisher = EventPublisher::new().with_sink(sink);
        publisher.publish(FrameHeader::new(0, Utc::now(), "camera"), &tensor(), observation(), 0.1, None);
        publisher.publish(FrameHeader::new(3, Utc::now(), "camera"), &tensor(), observation(), 0.2, None);

        let text = String::from_utf8(buffer.lock().clone()).unwrap();
        let events: Vec<InterestEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].sequence_id(), 3);
        assert_eq!(events[1].level, 0.2);
    }

    #[test]
    fn test_json_lines_sink_writes_display_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesSink::new(Box::new(std::io::sink()))
            .with_image_dir(dir.path())
            .unwrap();
        let publisher = EventPublisher::new().with_sink(sink);
        assert!(publisher.wants_display());
        publisher.publish(
            FrameHeader::new(5, Utc::now(), "camera"),
            &tensor(),
            observation(),
            0.1,
            Some(RgbImage::new(2, 2)),
        );
        assert!(dir.path().join("00000005.png").exists());
    }
}
