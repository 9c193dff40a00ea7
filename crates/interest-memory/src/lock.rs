// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Mutex wrapper that logs how long callers wait for and hold the lock.
//!
//! Acquisitions and releases are traced at `trace` level; any wait or hold
//! longer than the configured threshold is reported at `warn` so contention
//! between the scoring and feedback paths shows up in the logs.

use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{trace, warn};

pub struct TracingMutex<T> {
    inner: Mutex<T>,
    name: &'static str,
    slow_threshold: Duration,
}

impl<T> TracingMutex<T> {
    pub fn new(value: T, name: &'static str, slow_threshold: Duration) -> Self {
        Self {
            inner: Mutex::new(value),
            name,
            slow_threshold,
        }
    }

    /// Acquire the lock, logging the wait time
    pub fn lock(&self) -> TracingMutexGuard<'_, T> {
        let thread_id = thread::current().id();
        let lock_start = Instant::now();
        let guard = self.inner.lock();
        let acquire_time = Instant::now();
        let wait_duration = acquire_time.duration_since(lock_start);

        if wait_duration > self.slow_threshold {
            warn!(
                target: "interest-memory",
                "[MEMORY-LOCK] {}: Thread {:?} acquired lock after {:.2}ms wait (SLOW)",
                self.name,
                thread_id,
                wait_duration.as_secs_f64() * 1000.0
            );
        } else {
            trace!(
                target: "interest-memory",
                "[MEMORY-LOCK] {}: Thread {:?} acquired lock ({:.2}ms wait)",
                self.name,
                thread_id,
                wait_duration.as_secs_f64() * 1000.0
            );
        }

        TracingMutexGuard {
            guard,
            name: self.name,
            thread_id,
            acquire_time,
            wait_duration,
            slow_threshold: self.slow_threshold,
        }
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard returned by [`TracingMutex::lock`]; logs the hold time on drop
pub struct TracingMutexGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    name: &'static str,
    thread_id: thread::ThreadId,
    acquire_time: Instant,
    wait_duration: Duration,
    slow_threshold: Duration,
}

impl<T> std::ops::Deref for TracingMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> std::ops::DerefMut for TracingMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T> Drop for TracingMutexGuard<'_, T> {
    fn drop(&mut self) {
        let hold_duration = self.acquire_time.elapsed();
        let total_duration = hold_duration + self.wait_duration;

        if hold_duration > self.slow_threshold || self.wait_duration > self.slow_threshold {
            warn!(
                target: "interest-memory",
                "[MEMORY-LOCK] {}: Thread {:?} RELEASED lock (held for {:.2}ms, total from attempt: {:.2}ms)",
                self.name,
                self.thread_id,
                hold_duration.as_secs_f64() * 1000.0,
                total_duration.as_secs_f64() * 1000.0
            );
        } else {
            trace!(
                target: "interest-memory",
                "[MEMORY-LOCK] {}: Thread {:?} RELEASED lock (held for {:.2}ms)",
                self.name,
                self.thread_id,
                hold_duration.as_secs_f64() * 1000.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_lock_serializes_updates() {
        let counter = Arc::new(TracingMutex::new(0u64, "counter", Duration::from_millis(5)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(*counter.lock(), 4000);
    }
}
