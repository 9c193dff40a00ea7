// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, DeviceRequest, InterestConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "interest_configuration.toml";

/// Environment variables and the override keys they map to
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("INTEREST_FRAME_SOURCES", "frame_sources"),
    ("INTEREST_FEEDBACK_SOURCE", "feedback_source"),
    ("INTEREST_CHECKPOINT", "checkpoint"),
    ("INTEREST_DEVICE", "device"),
    ("INTEREST_CROP_SIZE", "crop_size"),
    ("INTEREST_SKIP_FRAMES", "skip_frames"),
    ("INTEREST_WINDOW_SIZE", "window_size"),
    ("INTEREST_INTAKE_CAPACITY", "intake_capacity"),
    ("INTEREST_READ_RATE", "read_rate"),
    ("INTEREST_WRITE_RATE", "write_rate"),
    ("INTEREST_MIN_LEVEL", "min_level"),
    ("INTEREST_LOG_LEVEL", "log_level"),
    ("INTEREST_LOG_DIR", "log_dir"),
];

/// Find the configuration file
///
/// Search order:
/// 1. `INTEREST_CONFIG_PATH` environment variable
/// 2. Current working directory: `./interest_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("INTEREST_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by INTEREST_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet INTEREST_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched
///   for and built-in defaults are used when none exists.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns an error if a file given explicitly or through `INTEREST_CONFIG_PATH`
/// is missing, the TOML is invalid, or an override value cannot be parsed.
/// Validation is a separate step ([`crate::validate_config`]).
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<InterestConfig> {
    let config_file = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => match find_config_file() {
            Ok(path) => Some(path),
            // Only a search that found nothing falls back to defaults
            Err(ConfigError::FileNotFound(_)) if env::var_os("INTEREST_CONFIG_PATH").is_none() => None,
            Err(e) => return Err(e),
        },
    };

    let mut config = match config_file {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        }
        None => InterestConfig::default(),
    };

    apply_environment_overrides(&mut config)?;

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `INTEREST_FRAME_SOURCES` -> `sources.frame_sources` (comma-separated)
/// - `INTEREST_FEEDBACK_SOURCE` -> `sources.feedback_source`
/// - `INTEREST_CHECKPOINT` -> `model.checkpoint`
/// - `INTEREST_DEVICE` -> `model.device`
/// - `INTEREST_CROP_SIZE` -> `preprocess.crop_size`
/// - `INTEREST_SKIP_FRAMES` -> `pipeline.skip_frames`
/// - `INTEREST_WINDOW_SIZE` -> `pipeline.window_size`
/// - `INTEREST_INTAKE_CAPACITY` -> `pipeline.intake_capacity`
/// - `INTEREST_READ_RATE` -> `memory.read_rate`
/// - `INTEREST_WRITE_RATE` -> `memory.write_rate`
/// - `INTEREST_MIN_LEVEL` -> `visualization.min_level`
/// - `INTEREST_LOG_LEVEL` -> `logging.level`
/// - `INTEREST_LOG_DIR` -> `logging.log_dir`
pub fn apply_environment_overrides(config: &mut InterestConfig) -> ConfigResult<()> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of override keys to values (e.g., `{"skip_frames": "3", "rr": "2.5"}`)
pub fn apply_cli_overrides(
    config: &mut InterestConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        apply_override(config, key, value)?;
    }
    Ok(())
}

/// Apply a single `key = value` override
///
/// Keys are either the field name (`skip_frames`) or the dotted section path
/// (`pipeline.skip_frames`). `rr` and `wr` are accepted for the memory rates.
pub fn apply_override(config: &mut InterestConfig, key: &str, value: &str) -> ConfigResult<()> {
    let field = key.rsplit('.').next().unwrap_or(key);
    match field {
        "frame_sources" => {
            config.sources.frame_sources = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        "feedback_source" => config.sources.feedback_source = value.to_string(),
        "checkpoint" => config.model.checkpoint = PathBuf::from(value),
        "device" => config.model.device = value.parse::<DeviceRequest>()?,
        "crop_size" => config.preprocess.crop_size = parse_value(key, value)?,
        "skip_frames" => config.pipeline.skip_frames = parse_value(key, value)?,
        "window_size" => config.pipeline.window_size = parse_value(key, value)?,
        "intake_capacity" => config.pipeline.intake_capacity = parse_value(key, value)?,
        "event_channel_capacity" => {
            config.pipeline.event_channel_capacity = parse_value(key, value)?
        }
        "read_rate" | "rr" => config.memory.read_rate = parse_value(key, value)?,
        "write_rate" | "wr" => config.memory.write_rate = parse_value(key, value)?,
        "slow_lock_threshold_ms" => {
            config.memory.slow_lock_threshold_ms = parse_value(key, value)?
        }
        "min_level" => config.visualization.min_level = parse_value(key, value)?,
        "marker_scale" => config.visualization.marker_scale = parse_value(key, value)?,
        "log_level" | "level" => config.logging.level = value.to_string(),
        "log_dir" => config.logging.log_dir = Some(PathBuf::from(value)),
        _ => {
            return Err(ConfigError::InvalidValue(format!(
                "Unknown configuration key '{}'",
                key
            )))
        }
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(format!("Cannot parse '{}' for key '{}'", value, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("INTEREST_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("INTEREST_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[pipeline]").unwrap();
        writeln!(file, "skip_frames = 3").unwrap();
        writeln!(file, "[visualization]").unwrap();
        writeln!(file, "level_range = [0.02, 0.08]").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.pipeline.skip_frames, 3);
        assert_eq!(config.visualization.level_range, Some([0.02, 0.08]));
        // Untouched sections keep their defaults
        assert_eq!(config.preprocess.crop_size, 320);
    }

    #[test]
    fn test_missing_file_named_by_env_var_is_an_error() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.toml");

        env::set_var("INTEREST_CONFIG_PATH", missing.to_str().unwrap());
        let result = load_config(None, None);
        env::remove_var("INTEREST_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let result = load_config(Some(&missing), None);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[pipeline\nskip_frames = ").unwrap();
        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = InterestConfig::default();

        env::set_var("INTEREST_SKIP_FRAMES", "4");
        env::set_var("INTEREST_FRAME_SOURCES", "/cam/left, /cam/right");

        let result = apply_environment_overrides(&mut config);

        env::remove_var("INTEREST_SKIP_FRAMES");
        env::remove_var("INTEREST_FRAME_SOURCES");

        assert!(result.is_ok());
        assert_eq!(config.pipeline.skip_frames, 4);
        assert_eq!(config.sources.frame_sources, vec!["/cam/left", "/cam/right"]);
    }

    #[test]
    fn test_cli_overrides_accept_short_and_dotted_keys() {
        let mut config = InterestConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("rr".to_string(), "2.5".to_string());
        cli_args.insert("memory.write_rate".to_string(), "7".to_string());
        cli_args.insert("device".to_string(), "cpu".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.memory.read_rate, 2.5);
        assert_eq!(config.memory.write_rate, 7.0);
        assert_eq!(config.model.device, DeviceRequest::Cpu);
    }

    #[test]
    fn test_unparseable_override_is_rejected() {
        let mut config = InterestConfig::default();
        let result = apply_override(&mut config, "window_size", "three");
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[pipeline]").unwrap();
        writeln!(file, "skip_frames = 2").unwrap();
        writeln!(file, "window_size = 2").unwrap();

        env::set_var("INTEREST_SKIP_FRAMES", "5");
        env::set_var("INTEREST_WINDOW_SIZE", "6");

        let mut cli_args = HashMap::new();
        cli_args.insert("skip_frames".to_string(), "9".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));

        env::remove_var("INTEREST_SKIP_FRAMES");
        env::remove_var("INTEREST_WINDOW_SIZE");

        let config = config.unwrap();
        // CLI wins for skip_frames, env wins for window_size (no CLI override)
        assert_eq!(config.pipeline.skip_frames, 9);
        assert_eq!(config.pipeline.window_size, 6);
    }
}
