// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Visualization markers derived from interest events.

use serde::{Deserialize, Serialize};

use crate::FrameHeader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerAction {
    /// Add the marker, or replace the one with the same id
    Add,
}

/// How long a marker stays visible after it is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLifetime {
    /// Never expires; markers accumulate into a cumulative interest map
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(value: f32) -> Self {
        Self::new(value, value, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

/// A visual artifact for one high-interest event.
///
/// `id` is the originating event's sequence id, so repeated high-interest
/// events produce distinct markers instead of replacing one another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEvent {
    pub id: u64,
    pub header: FrameHeader,
    pub shape: MarkerShape,
    pub action: MarkerAction,
    pub level: f32,
    pub color: ColorRgba,
    pub scale: Vector3,
    pub pose: Pose,
    pub lifetime: MarkerLifetime,
}
