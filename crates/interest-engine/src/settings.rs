// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Conversion of the loaded configuration into per-component settings.

use std::time::Duration;

use interest_config::{DeviceRequest, InterestConfig};
use interest_memory::{DevicePreference, EngineSettings};
use interest_observability::LoggingOptions;

pub fn engine_settings(config: &InterestConfig) -> EngineSettings {
    EngineSettings {
        read_rate: config.memory.read_rate,
        write_rate: config.memory.write_rate,
        slow_lock_threshold: Duration::from_millis(config.memory.slow_lock_threshold_ms),
    }
}

pub fn device_preference(request: DeviceRequest) -> DevicePreference {
    match request {
        DeviceRequest::Auto => DevicePreference::Auto,
        DeviceRequest::Cpu => DevicePreference::Cpu,
        DeviceRequest::Accelerator => DevicePreference::Accelerator,
    }
}

pub fn logging_options(config: &InterestConfig) -> LoggingOptions {
    LoggingOptions {
        default_level: config.logging.level.clone(),
        log_dir: config.logging.log_dir.clone(),
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    }
}
