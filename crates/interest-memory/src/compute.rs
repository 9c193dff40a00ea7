// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Compute Context
//!
//! Device selection happens once at startup. The resulting [`ComputeContext`]
//! is handed to the [`ScoringEngine`](crate::ScoringEngine) and owns the
//! thread pool the encoder runs on.
//!
//! No accelerator backend is compiled into this build, so an `accelerator`
//! request (or `auto`) resolves to the CPU. That is a fallback, not an error.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::info;

use interest_structures::{InterestError, InterestResult};

/// Requested compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Use the accelerator if one is available, otherwise the CPU
    #[default]
    Auto,
    Cpu,
    Accelerator,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePreference::Auto => write!(f, "auto"),
            DevicePreference::Cpu => write!(f, "cpu"),
            DevicePreference::Accelerator => write!(f, "accelerator"),
        }
    }
}

/// Device actually in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu { threads: usize },
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu { threads } => write!(f, "CPU ({} threads)", threads),
        }
    }
}

/// Whether an accelerator backend is usable in this process
pub fn is_accelerator_available() -> bool {
    false
}

/// Selected device plus the worker pool computations run on.
#[derive(Clone)]
pub struct ComputeContext {
    requested: DevicePreference,
    device: Device,
    reason: String,
    pool: Arc<ThreadPool>,
}

impl ComputeContext {
    /// Resolve `requested` to a concrete device.
    pub fn detect(requested: DevicePreference) -> InterestResult<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let reason = match requested {
            DevicePreference::Cpu => "CPU requested via configuration".to_string(),
            DevicePreference::Auto if !is_accelerator_available() => {
                "No accelerator available, using CPU".to_string()
            }
            DevicePreference::Accelerator if !is_accelerator_available() => {
                "Accelerator requested but not available, falling back to CPU".to_string()
            }
            _ => "Using CPU".to_string(),
        };
        Self::cpu_with_reason(requested, threads, reason)
    }

    /// CPU context with a fixed worker count
    pub fn cpu(threads: usize) -> InterestResult<Self> {
        Self::cpu_with_reason(
            DevicePreference::Cpu,
            threads,
            "CPU requested via configuration".to_string(),
        )
    }

    fn cpu_with_reason(
        requested: DevicePreference,
        threads: usize,
        reason: String,
    ) -> InterestResult<Self> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("interest-compute-{}", i))
            .build()
            .map_err(|e| InterestError::InvalidParameter(format!("compute pool: {}", e)))?;

        let context = Self {
            requested,
            device: Device::Cpu { threads },
            reason,
            pool: Arc::new(pool),
        };
        info!(
            target: "interest-memory",
            "Compute device: {} (requested {}): {}",
            context.device,
            context.requested,
            context.reason
        );
        Ok(context)
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn requested(&self) -> DevicePreference {
        self.requested
    }

    /// Why this device was chosen
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Run `op` on the context's worker pool
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for ComputeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeContext")
            .field("requested", &self.requested)
            .field("device", &self.device)
            .field("reason", &self.reason)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accelerator_request_falls_back_to_cpu() {
        let context = ComputeContext::detect(DevicePreference::Accelerator).unwrap();
        assert!(matches!(context.device(), Device::Cpu { .. }));
        assert_eq!(context.requested(), DevicePreference::Accelerator);
        assert!(context.reason().contains("falling back"));
    }

    #[test]
    fn test_install_runs_on_pool() {
        let context = ComputeContext::cpu(2).unwrap();
        assert_eq!(context.device(), Device::Cpu { threads: 2 });
        let total: u32 = context.install(|| (1..=4).sum());
        assert_eq!(total, 10);
    }
}
