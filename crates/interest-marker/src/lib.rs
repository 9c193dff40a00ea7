// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-marker
//!
//! Turns [`InterestEvent`]s into visualization markers. Events below the
//! configured level are dropped; the rest become red spheres whose opacity
//! is the level and whose size is `k * level`.
//!
//! Markers are keyed by the event's sequence id and never expire, so the
//! consumer accumulates a map of every interesting moment. They are all
//! placed at the same fixed position.

use tracing::{info, warn};

use interest_config::InterestConfig;
use interest_structures::{
    ColorRgba, InterestError, InterestEvent, InterestResult, MarkerAction, MarkerEvent,
    MarkerLifetime, MarkerShape, Pose, Quaternion, Vector3,
};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Height above the origin at which every marker is placed
pub const MARKER_HEIGHT: f32 = 3.0;

const MARKER_RGB: (f32, f32, f32) = (1.0, 0.0, 0.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// Events with a (normalized) level below this are dropped
    pub min_level: f32,
    /// Marker extent per unit level, `k`
    pub marker_scale: f32,
    /// When set, levels are clipped to `[lo, hi]` and rescaled to `[0, 1]`
    /// before gating
    pub level_range: Option<[f32; 2]>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_level: 0.1,
            marker_scale: 4.0,
            level_range: None,
        }
    }
}

impl From<&InterestConfig> for FilterSettings {
    fn from(config: &InterestConfig) -> Self {
        Self {
            min_level: config.visualization.min_level,
            marker_scale: config.visualization.marker_scale,
            level_range: config.visualization.level_range,
        }
    }
}

/// Stateless event to marker transform
#[derive(Debug, Clone, Copy)]
pub struct InterestFilter {
    settings: FilterSettings,
}

impl InterestFilter {
    pub fn new(settings: FilterSettings) -> InterestResult<Self> {
        if !settings.min_level.is_finite() {
            return Err(InterestError::InvalidParameter(format!(
                "min_level must be finite, got {}",
                settings.min_level
            )));
        }
        if !settings.marker_scale.is_finite() || settings.marker_scale <= 0.0 {
            return Err(InterestError::InvalidParameter(format!(
                "marker_scale must be > 0, got {}",
                settings.marker_scale
            )));
        }
        if let Some([lo, hi]) = settings.level_range {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(InterestError::InvalidParameter(format!(
                    "level_range must satisfy lo < hi, got [{}, {}]",
                    lo, hi
                )));
            }
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Level used for gating and for the marker's attributes
    pub fn display_level(&self, level: f32) -> f32 {
        match self.settings.level_range {
            Some([lo, hi]) => (level.clamp(lo, hi) - lo) / (hi - lo),
            None => level,
        }
    }

    /// Marker for `event`, or `None` if its level is below `min_level`
    pub fn filter(&self, event: &InterestEvent) -> Option<MarkerEvent> {
        let level = self.display_level(event.level);
        if level.is_nan() || level < self.settings.min_level {
            info!(
                target: "interest-marker",
                "Skip interests with level: {} (frame {})",
                level,
                event.sequence_id()
            );
            return None;
        }

        let (r, g, b) = MARKER_RGB;
        let marker = MarkerEvent {
            id: event.sequence_id(),
            header: event.header.clone(),
            shape: MarkerShape::Sphere,
            action: MarkerAction::Add,
            level,
            color: ColorRgba { r, g, b, a: level },
            scale: Vector3::splat(self.settings.marker_scale * level),
            pose: Pose {
                position: Vector3::new(0.0, 0.0, MARKER_HEIGHT),
                orientation: Quaternion::IDENTITY,
            },
            lifetime: MarkerLifetime::Persistent,
        };
        warn!(
            target: "interest-marker",
            "Sent interests with level: {} (frame {})",
            level,
            event.sequence_id()
        );
        Some(marker)
    }
}
