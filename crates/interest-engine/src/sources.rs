// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Inbound adapters used by the `interest-engine` binary.
//!
//! - [`DirectoryFrameSource`]: image files from a directory, in file name order
//! - [`JsonLinesFeedbackSource`]: one [`FeedbackRecord`] JSON object per line,
//!   from a file or stdin

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use interest_structures::{
    ChannelLayout, FeedbackRecord, Frame, FrameHeader, InterestError, InterestResult,
};

use crate::pipeline::FrameSubmitter;
use crate::shutdown::ShutdownListener;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "ppm"];

/// Replays the images in a directory as a frame stream
#[derive(Debug, Clone)]
pub struct DirectoryFrameSource {
    name: String,
    dir: PathBuf,
    interval: Option<Duration>,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> InterestResult<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(InterestError::InvalidParameter(format!(
                "Frame source {} is not a directory",
                dir.display()
            )));
        }
        Ok(Self {
            name: dir.display().to_string(),
            dir,
            interval: None,
        })
    }

    /// Pace frames at most once per `interval`
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Image files in name order
    pub fn list_images(&self) -> InterestResult<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            InterestError::Transport(format!("Failed to read {}: {}", self.dir.display(), e))
        })?;
        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        images.sort();
        Ok(images)
    }

    /// Push every image into `submitter`, numbering frames from 0. Blocking;
    /// returns the number of frames read.
    pub fn run(&self, submitter: &FrameSubmitter, shutdown: &ShutdownListener) -> InterestResult<u64> {
        let images = self.list_images()?;
        info!(
            target: "interest-engine",
            "Frame source {}: {} images",
            self.name,
            images.len()
        );

        let mut sequence_id = 0u64;
        for path in images {
            if shutdown.is_triggered() {
                break;
            }
            let frame = match self.read_frame(&path, sequence_id) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(target: "interest-engine", "Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            debug!(
                target: "interest-engine",
                "Received frame {} ({}) from {}",
                sequence_id,
                frame.frame_id(),
                self.name
            );
            sequence_id += 1;

            match submitter.submit(frame) {
                Ok(_) => {}
                Err(InterestError::ShutDown) => break,
                Err(e) => return Err(e),
            }
            if let Some(interval) = self.interval {
                std::thread::sleep(interval);
            }
        }
        Ok(sequence_id)
    }

    fn read_frame(&self, path: &Path, sequence_id: u64) -> InterestResult<Frame> {
        let image = image::open(path)
            .map_err(|e| InterestError::Decode(e.to_string()))?
            .to_rgb8();
        let (width, height) = image.dimensions();
        let frame_id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Frame::new(
            FrameHeader::new(sequence_id, Utc::now(), frame_id),
            self.name.as_str(),
            width,
            height,
            ChannelLayout::Rgb8,
            image.into_raw(),
        ))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads feedback records, one JSON object per line
#[derive(Debug, Clone)]
pub struct JsonLinesFeedbackSource {
    path: Option<PathBuf>,
}

impl JsonLinesFeedbackSource {
    /// `"-"` reads stdin, anything else is a file path
    pub fn from_identifier(identifier: &str) -> Self {
        let path = (identifier != "-").then(|| PathBuf::from(identifier));
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Forward records to `tx` until input ends, the receiver is dropped or
    /// shutdown is requested. Malformed lines are logged and skipped.
    pub async fn run(
        &self,
        tx: mpsc::Sender<FeedbackRecord>,
        shutdown: ShutdownListener,
    ) -> InterestResult<u64> {
        match &self.path {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    InterestError::Transport(format!("Failed to open {}: {}", path.display(), e))
                })?;
                let lines = LineSource::File(BufReader::new(file).lines());
                forward_records(lines, tx, shutdown).await
            }
            None => forward_blocking_reader(io::BufReader::new(io::stdin()), tx, shutdown).await,
        }
    }
}

/// Line input for the feedback source.
///
/// Blocking readers (stdin) run on a detached thread: a read that never
/// returns must not keep the runtime from shutting down.
enum LineSource {
    File(Lines<BufReader<tokio::fs::File>>),
    Detached(mpsc::Receiver<io::Result<String>>),
}

impl LineSource {
    fn detached<R>(reader: R) -> InterestResult<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (line_tx, line_rx) = mpsc::channel(64);
        thread::Builder::new()
            .name("feedback-reader".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| InterestError::Transport(format!("Failed to start feedback reader: {}", e)))?;
        Ok(LineSource::Detached(line_rx))
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self {
            LineSource::File(lines) => lines.next_line().await,
            LineSource::Detached(rx) => rx.recv().await.transpose(),
        }
    }
}

async fn forward_blocking_reader<R>(
    reader: R,
    tx: mpsc::Sender<FeedbackRecord>,
    shutdown: ShutdownListener,
) -> InterestResult<u64>
where
    R: BufRead + Send + 'static,
{
    forward_records(LineSource::detached(reader)?, tx, shutdown).await
}

async fn forward_records(
    mut lines: LineSource,
    tx: mpsc::Sender<FeedbackRecord>,
    mut shutdown: ShutdownListener,
) -> InterestResult<u64> {
    let mut forwarded = 0u64;
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            line = lines.next_line() => line.map_err(|e| InterestError::Transport(e.to_string()))?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedbackRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(target: "interest-engine", "Ignoring malformed feedback line: {}", e);
                continue;
            }
        };
        if tx.send(record).await.is_err() {
            break;
        }
        forwarded += 1;
    }
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::FrameIntake;
    use crate::shutdown::Shutdown;
    use crate::stats::PipelineStats;
    use image::{Rgb, RgbImage};
    use interest_structures::FeatureVector;
    use interest_vision::FrameGate;
    use std::sync::Arc;

    #[test]
    fn test_directory_source_reads_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for (i, name) in ["b.png", "a.png", "c.png"].iter().enumerate() {
            RgbImage::from_pixel(4, 3, Rgb([i as u8, 0, 0]))
                .save(dir.path().join(name))
                .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let source = DirectoryFrameSource::new(dir.path()).unwrap();
        let intake = Arc::new(FrameIntake::new(8));
        let submitter = FrameSubmitter::new(
            FrameGate::new(1).unwrap(),
            Arc::clone(&intake),
            Arc::new(PipelineStats::new()),
        );
        let shutdown = Shutdown::new();
        assert_eq!(source.run(&submitter, &shutdown.subscribe()).unwrap(), 3);

        let first = intake.try_pop().unwrap();
        assert_eq!(first.sequence_id(), 0);
        assert_eq!(first.frame_id(), "a.png");
        assert_eq!((first.width(), first.height()), (4, 3));
        assert_eq!(first.layout(), ChannelLayout::Rgb8);
        assert_eq!(first.pixels()[0], 1);
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        assert!(DirectoryFrameSource::new("/definitely/not/here").is_err());
    }

    #[tokio::test]
    async fn test_feedback_lines_are_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.jsonl");
        let record = FeedbackRecord::new(3, FeatureVector::from_flat(vec![0.5, 0.5]));
        let line = serde_json::to_string(&record).unwrap();
        let contents = format!("{}\nnot json\n\n{}\n", line, line);
        fs::write(&path, contents).unwrap();

        let source = JsonLinesFeedbackSource::from_identifier(path.to_str().unwrap());
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let forwarded = source.run(tx, shutdown.subscribe()).await.unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_blocking_reader_lines_are_forwarded() {
        let record = FeedbackRecord::new(7, FeatureVector::from_flat(vec![0.25; 3]));
        let line = serde_json::to_string(&record).unwrap();
        let input = std::io::Cursor::new(format!("{}\n{{broken\n", line).into_bytes());

        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let forwarded = forward_blocking_reader(input, tx, shutdown.subscribe())
            .await
            .unwrap();
        assert_eq!(forwarded, 1);
        assert_eq!(rx.recv().await.unwrap(), record);
    }

    /// A reader whose first read never returns, like an idle terminal
    struct StalledReader;

    impl std::io::Read for StalledReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                thread::park();
            }
        }
    }

    #[test]
    fn test_stalled_reader_does_not_block_runtime_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let shutdown = Shutdown::new();
        let (tx, _rx) = mpsc::channel(1);
        let reader = std::io::BufReader::new(StalledReader);
        let task = runtime.spawn(forward_blocking_reader(reader, tx, shutdown.subscribe()));

        shutdown.trigger();
        assert_eq!(runtime.block_on(task).unwrap().unwrap(), 0);

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            drop(runtime);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }
}
