// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that configuration values are within the ranges the pipeline
//! components accept, and reports every violation at once.

use crate::{ConfigError, ConfigResult, InterestConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Required fields (at least one frame source, a checkpoint locator)
/// - Strides, windows, sizes and capacities of at least 1
/// - Finite, positive memory rates
/// - A finite visualization threshold and a well-formed level range
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &InterestConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_pipeline(config, &mut errors);
    validate_memory(config, &mut errors);
    validate_visualization(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &InterestConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.sources.frame_sources.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "sources.frame_sources".to_string(),
        });
    }
    if config.sources.frame_sources.iter().any(|s| s.trim().is_empty()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "sources.frame_sources".to_string(),
            reason: "source names must not be empty".to_string(),
        });
    }
    if config.sources.feedback_source.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "sources.feedback_source".to_string(),
        });
    }
    if config.model.checkpoint.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "model.checkpoint".to_string(),
        });
    }
}

fn validate_pipeline(config: &InterestConfig, errors: &mut Vec<ConfigValidationError>) {
    let at_least_one = [
        ("preprocess.crop_size", config.preprocess.crop_size as usize),
        ("pipeline.skip_frames", config.pipeline.skip_frames as usize),
        ("pipeline.window_size", config.pipeline.window_size),
        ("pipeline.intake_capacity", config.pipeline.intake_capacity),
        (
            "pipeline.event_channel_capacity",
            config.pipeline.event_channel_capacity,
        ),
    ];
    for (field, value) in at_least_one {
        if value < 1 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
    }
}

fn validate_memory(config: &InterestConfig, errors: &mut Vec<ConfigValidationError>) {
    for (field, rate) in [
        ("memory.read_rate", config.memory.read_rate),
        ("memory.write_rate", config.memory.write_rate),
    ] {
        if !rate.is_finite() || rate <= 0.0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be a finite positive number".to_string(),
            });
        }
    }
}

fn validate_visualization(config: &InterestConfig, errors: &mut Vec<ConfigValidationError>) {
    let vis = &config.visualization;
    if !vis.min_level.is_finite() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "visualization.min_level".to_string(),
            reason: "must be finite".to_string(),
        });
    }
    if !vis.marker_scale.is_finite() || vis.marker_scale <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "visualization.marker_scale".to_string(),
            reason: "must be a finite positive number".to_string(),
        });
    }
    if let Some([low, high]) = vis.level_range {
        if !low.is_finite() || !high.is_finite() || low >= high {
            errors.push(ConfigValidationError::InvalidValue {
                field: "visualization.level_range".to_string(),
                reason: format!("must be finite with low < high, got [{}, {}]", low, high),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = InterestConfig::default();
        let result = validate_config(&config);
        if let Err(e) = &result {
            eprintln!("Validation error: {}", e);
        }
        assert!(result.is_ok());
    }

    #[test]
    fn test_zero_stride_and_window_are_rejected() {
        let mut config = InterestConfig::default();
        config.pipeline.skip_frames = 0;
        config.pipeline.window_size = 0;

        let result = validate_config(&config);
        match result {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("pipeline.skip_frames"));
                assert!(msg.contains("pipeline.window_size"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_rate_is_rejected() {
        let mut config = InterestConfig::default();
        config.memory.write_rate = f32::NAN;

        let result = validate_config(&config);
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("memory.write_rate")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_level_range_is_rejected() {
        let mut config = InterestConfig::default();
        config.visualization.level_range = Some([0.08, 0.02]);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_frame_sources() {
        let mut config = InterestConfig::default();
        config.sources.frame_sources.clear();

        match validate_config(&config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains("sources.frame_sources"))
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
