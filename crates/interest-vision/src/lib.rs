// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # interest-vision
//!
//! The leaf stages of the frame path:
//!
//! - [`FrameGate`] decides which frames are scored at all (coarse backpressure)
//! - [`Preprocessor`] turns an admitted frame into the normalized tensor the
//!   scoring model expects
//! - [`annotate`] renders the companion display image published with each event

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod annotate;
mod frame_gate;
mod preprocessor;

pub use annotate::annotate;
pub use frame_gate::FrameGate;
pub use preprocessor::{Preprocessor, IMAGENET_MEAN, IMAGENET_STD};
