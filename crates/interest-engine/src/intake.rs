// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Bounded frame intake.
//!
//! Frame sources push here from any thread; the scoring loop blocks on
//! [`FrameIntake::pop_blocking`]. When the queue is full the oldest
//! unprocessed frame is dropped. Closing the intake discards whatever is
//! still queued and wakes the consumer.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use interest_structures::Frame;

/// What happened to a pushed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the frame with this sequence id
    DroppedOldest(u64),
    /// Intake is closed; the frame was discarded
    Closed,
}

struct IntakeState {
    frames: VecDeque<Frame>,
    closed: bool,
}

pub struct FrameIntake {
    state: Mutex<IntakeState>,
    available: Condvar,
    capacity: usize,
}

impl FrameIntake {
    /// Create an intake holding at most `capacity` frames (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(IntakeState {
                frames: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn push(&self, frame: Frame) -> PushOutcome {
        let mut state = self.state.lock();
        if state.closed {
            return PushOutcome::Closed;
        }
        let mut outcome = PushOutcome::Queued;
        if state.frames.len() >= self.capacity {
            if let Some(oldest) = state.frames.pop_front() {
                outcome = PushOutcome::DroppedOldest(oldest.sequence_id());
            }
        }
        state.frames.push_back(frame);
        drop(state);
        self.available.notify_one();
        outcome
    }

    /// Take the next frame if any, without waiting
    pub fn try_pop(&self) -> Option<Frame> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.frames.pop_front()
    }

    /// Wait for the next frame. Returns `None` once the intake is closed.
    pub fn pop_blocking(&self) -> Option<Frame> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            self.available.wait(&mut state);
        }
    }

    /// Stop accepting frames and discard the queue. Returns how many queued
    /// frames were discarded.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let discarded = state.frames.len();
        state.frames.clear();
        drop(state);
        self.available.notify_all();
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use interest_structures::{ChannelLayout, FrameHeader};
    use std::sync::Arc;
    use std::thread;

    fn frame(seq: u64) -> Frame {
        Frame::new(
            FrameHeader::new(seq, Utc::now(), "camera"),
            "test",
            1,
            1,
            ChannelLayout::Mono8,
            vec![0u8],
        )
    }

    #[test]
    fn test_full_queue_drops_oldest() {
        let intake = FrameIntake::new(2);
        assert_eq!(intake.push(frame(0)), PushOutcome::Queued);
        assert_eq!(intake.push(frame(1)), PushOutcome::Queued);
        assert_eq!(intake.push(frame(2)), PushOutcome::DroppedOldest(0));
        assert_eq!(intake.try_pop().map(|f| f.sequence_id()), Some(1));
        assert_eq!(intake.try_pop().map(|f| f.sequence_id()), Some(2));
        assert!(intake.try_pop().is_none());
    }

    #[test]
    fn test_close_discards_queued_frames() {
        let intake = FrameIntake::new(4);
        intake.push(frame(0));
        intake.push(frame(1));
        assert_eq!(intake.close(), 2);
        assert!(intake.is_empty());
        assert_eq!(intake.push(frame(2)), PushOutcome::Closed);
        assert!(intake.pop_blocking().is_none());
    }

    #[test]
    fn test_close_wakes_waiting_consumer() {
        let intake = Arc::new(FrameIntake::new(4));
        let consumer = {
            let intake = Arc::clone(&intake);
            thread::spawn(move || intake.pop_blocking().map(|f| f.sequence_id()))
        };
        thread::sleep(std::time::Duration::from_millis(20));
        intake.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn test_consumer_receives_pushed_frame() {
        let intake = Arc::new(FrameIntake::new(4));
        let consumer = {
            let intake = Arc::clone(&intake);
            thread::spawn(move || intake.pop_blocking().map(|f| f.sequence_id()))
        };
        intake.push(frame(7));
        assert_eq!(consumer.join().unwrap(), Some(7));
    }
}
