// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-interest-memory`, `--debug-interest-engine`, etc.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Per-crate debug flags.
///
/// # Example
/// ```rust
/// use interest_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-interest-memory".to_string()]);
/// assert!(flags.is_enabled("interest-memory"));
/// assert_eq!(flags.to_filter_string("info"), "interest-memory=debug,info");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Parse debug flags from command-line arguments
    ///
    /// Looks for arguments matching `--debug-{crate-name}`; `--debug-all`
    /// enables every known crate. Other arguments are ignored.
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();

        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
                continue;
            }
            if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }

        flags
    }

    /// Merge a comma-separated crate list (or `all`), as found in `INTEREST_DEBUG`
    pub fn merge_list(&mut self, list: &str) {
        if list.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in list.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enabled_crates.insert(crate_name.to_string());
            }
        }
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    /// Check if debug is enabled for a specific crate
    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    /// Check if debug is enabled for any crate
    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Create an `EnvFilter` directive string from debug flags
    ///
    /// Format: `"interest-engine=debug,interest-memory=debug,<default>"`.
    pub fn to_filter_string(&self, default_level: &str) -> String {
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|crate_name| format!("{}=debug", crate_name))
            .collect();
        filters.push(default_level.to_lowercase());
        filters.join(",")
    }
}

/// Parse debug flags from the process arguments and the `INTEREST_DEBUG` variable
///
/// Variable format: comma-separated crate names, e.g. `interest-engine,interest-memory`,
/// or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(env_var) = env::var("INTEREST_DEBUG") {
        flags.merge_list(&env_var);
    }
    flags
}

/// Help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for specific crate

Available crates:
  {}

Environment Variable:
  INTEREST_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  INTEREST_DEBUG=all                             Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}
