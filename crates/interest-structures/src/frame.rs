// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Raw frames as delivered by frame sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use crate::InterestError;

/// Identity of one frame: where it came from in the stream and when.
///
/// The header travels unchanged from the frame into its event and marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Monotonic, source-assigned sequence number
    pub sequence_id: u64,
    pub timestamp: DateTime<Utc>,
    /// Free-form frame identifier (camera / coordinate frame name)
    pub frame_id: String,
}

impl FrameHeader {
    pub fn new(sequence_id: u64, timestamp: DateTime<Utc>, frame_id: impl Into<String>) -> Self {
        Self {
            sequence_id,
            timestamp,
            frame_id: frame_id.into(),
        }
    }
}

/// Pixel encoding of a raw frame buffer.
///
/// The names follow the usual camera driver encodings. Only 8-bit
/// layouts can be turned into a tensor; the others are recognised so that
/// a source can report them, and are rejected at preprocessing.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Rgb8,
    Rgba8,
    Bgr8,
    Bgra8,
    Mono8,
    Mono16,
    Yuv422,
}

impl ChannelLayout {
    /// Bytes used by one pixel in this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ChannelLayout::Mono8 => 1,
            ChannelLayout::Mono16 | ChannelLayout::Yuv422 => 2,
            ChannelLayout::Rgb8 | ChannelLayout::Bgr8 => 3,
            ChannelLayout::Rgba8 | ChannelLayout::Bgra8 => 4,
        }
    }
}

impl Display for ChannelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ChannelLayout::Rgb8 => "rgb8",
            ChannelLayout::Rgba8 => "rgba8",
            ChannelLayout::Bgr8 => "bgr8",
            ChannelLayout::Bgra8 => "bgra8",
            ChannelLayout::Mono8 => "mono8",
            ChannelLayout::Mono16 => "mono16",
            ChannelLayout::Yuv422 => "yuv422",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChannelLayout {
    type Err = InterestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb8" => Ok(ChannelLayout::Rgb8),
            "rgba8" => Ok(ChannelLayout::Rgba8),
            "bgr8" => Ok(ChannelLayout::Bgr8),
            "bgra8" => Ok(ChannelLayout::Bgra8),
            "mono8" => Ok(ChannelLayout::Mono8),
            "mono16" => Ok(ChannelLayout::Mono16),
            "yuv422" => Ok(ChannelLayout::Yuv422),
            other => Err(InterestError::Decode(format!(
                "Unknown channel layout '{}'",
                other
            ))),
        }
    }
}

/// One raw frame. Immutable once received.
///
/// The pixel buffer is reference counted so that a frame can sit in the intake
/// queue and be handed to the scoring path without copying.
#[derive(Debug, Clone)]
pub struct Frame {
    header: FrameHeader,
    source: Arc<str>,
    width: u32,
    height: u32,
    layout: ChannelLayout,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Build a frame. The buffer is not checked against the dimensions here;
    /// a buffer that does not fit is a decode failure at preprocessing time.
    pub fn new(
        header: FrameHeader,
        source: impl Into<Arc<str>>,
        width: u32,
        height: u32,
        layout: ChannelLayout,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            header,
            source: source.into(),
            width,
            height,
            layout,
            pixels: pixels.into(),
        }
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn sequence_id(&self) -> u64 {
        self.header.sequence_id
    }

    pub fn frame_id(&self) -> &str {
        &self.header.frame_id
    }

    /// Name of the source this frame arrived on
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}
