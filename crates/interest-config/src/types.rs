// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `interest_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ConfigError;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterestConfig {
    pub sources: SourcesConfig,
    pub model: ModelConfig,
    pub preprocess: PreprocessConfig,
    pub pipeline: PipelineConfig,
    pub memory: MemoryConfig,
    pub visualization: VisualizationConfig,
    pub logging: LoggingConfig,
}

/// Named inbound channels
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub frame_sources: Vec<String>,
    pub feedback_source: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            frame_sources: vec!["/rs_front/color/image".to_string()],
            feedback_source: "/interaction/feature_map".to_string(),
        }
    }
}

/// Which compute device the scoring engine should run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRequest {
    /// Use the best device available
    Auto,
    Cpu,
    /// Prefer an accelerator, falling back to the CPU when none is present
    Accelerator,
}

impl Display for DeviceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceRequest::Auto => write!(f, "auto"),
            DeviceRequest::Cpu => write!(f, "cpu"),
            DeviceRequest::Accelerator => write!(f, "accelerator"),
        }
    }
}

impl FromStr for DeviceRequest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DeviceRequest::Auto),
            "cpu" => Ok(DeviceRequest::Cpu),
            "accelerator" | "gpu" | "cuda" => Ok(DeviceRequest::Accelerator),
            other => Err(ConfigError::InvalidValue(format!(
                "device must be 'auto', 'cpu' or 'accelerator', got '{}'",
                other
            ))),
        }
    }
}

/// Scoring model location and placement
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub checkpoint: PathBuf,
    pub device: DeviceRequest,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            checkpoint: PathBuf::from("saves/memory.checkpoint.json"),
            device: DeviceRequest::Auto,
        }
    }
}

/// Frame preprocessing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length in pixels of the square crop fed to the model
    pub crop_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { crop_size: 320 }
    }
}

/// Frame path rate control and smoothing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Only frames whose sequence id is a multiple of this are scored
    pub skip_frames: u32,
    /// Moving average window for the interest level
    pub window_size: usize,
    /// Bound of the inbound frame queue; the oldest frame is dropped when full
    pub intake_capacity: usize,
    /// Bound of the in-process event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skip_frames: 1,
            window_size: 1,
            intake_capacity: 10,
            event_channel_capacity: 10,
        }
    }
}

/// Memory read / write blending
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Read rate `rr`
    pub read_rate: f32,
    /// Write rate `wr`
    pub write_rate: f32,
    /// Memory lock waits or holds longer than this are logged as slow
    pub slow_lock_threshold_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            read_rate: 5.0,
            write_rate: 5.0,
            slow_lock_threshold_ms: 5,
        }
    }
}

/// Marker visualization
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Events below this level produce no marker
    pub min_level: f32,
    /// Marker extent per unit of level
    pub marker_scale: f32,
    /// Optional `[low, high]` clip range; levels are rescaled to `[0, 1]` before gating
    pub level_range: Option<[f32; 2]>,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            min_level: 0.1,
            marker_scale: 4.0,
            level_range: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
