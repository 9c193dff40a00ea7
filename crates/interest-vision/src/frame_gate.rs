// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroU32;

use interest_structures::{Frame, InterestError, InterestResult};

/// Admits every `skip_frames`-th frame by sequence id.
///
/// Stateless apart from the stride: a frame is admitted iff
/// `sequence_id % skip_frames == 0`, so the decision does not depend on which
/// frames were seen before.
#[derive(Debug, Clone, Copy)]
pub struct FrameGate {
    stride: NonZeroU32,
}

impl FrameGate {
    pub fn new(skip_frames: u32) -> InterestResult<Self> {
        let stride = NonZeroU32::new(skip_frames).ok_or_else(|| {
            InterestError::InvalidParameter("skip_frames must be >= 1".to_string())
        })?;
        Ok(Self { stride })
    }

    pub fn stride(&self) -> u32 {
        self.stride.get()
    }

    pub fn admit(&self, frame: &Frame) -> bool {
        self.admits_sequence(frame.sequence_id())
    }

    pub fn admits_sequence(&self, sequence_id: u64) -> bool {
        sequence_id % u64::from(self.stride.get()) == 0
    }
}
