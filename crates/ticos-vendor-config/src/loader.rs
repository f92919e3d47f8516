//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Apply env var fallbacks (`TICOS_VENDOR_*`)
//! 3. Merge `{root}/ticos-vendor.toml`, or the explicit `--config` file
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// File name looked up at the library root.
pub const CONFIG_FILE_NAME: &str = "ticos-vendor.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variables consulted as fallbacks, with the dotted config
/// path each one fills.
const ENV_FALLBACKS: &[(&str, &str)] = &[
    ("TICOS_VENDOR_REPO_URL", "upstream.repo_url"),
    ("TICOS_VENDOR_LOG", "logging.level"),
];

/// A loaded configuration plus the files that contributed to it.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The final, validated configuration.
    pub config: Config,
    /// Config files merged over the defaults, in load order.
    pub loaded_files: Vec<String>,
}

/// Load the configuration for the library rooted at `root`.
///
/// When `explicit` is given it replaces the `{root}/ticos-vendor.toml`
/// lookup and must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a config file is malformed, an explicit
/// config file is missing, or the merged configuration fails validation.
pub fn load(root: &Path, explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(root, explicit, &collect_env_vars())
}

/// [`load`] with a caller-supplied environment snapshot.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env(
    root: &Path,
    explicit: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    // 1. Parse embedded defaults.
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    // 2. Env fallbacks sit below any file layer.
    let env_count = apply_env_fallbacks(&mut merged, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 3. File layer.
    let mut loaded_files = Vec::new();
    let overlay = match explicit {
        Some(path) => Some((read_file(path)?, path.to_path_buf())),
        None => {
            let path = root.join(CONFIG_FILE_NAME);
            try_load_file(&path)?.map(|overlay| (overlay, path))
        },
    };
    if let Some((overlay, path)) = overlay {
        deep_merge(&mut merged, &overlay);
        info!(path = %path.display(), "loaded config file");
        loaded_files.push(path.display().to_string());
    }

    // 4. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 5. Validate.
    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

/// Write every non-empty `TICOS_VENDOR_*` fallback into `merged`.
///
/// Returns the number of fields that were set.
fn apply_env_fallbacks(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0usize;
    for (var, dotted) in ENV_FALLBACKS {
        let Some(value) = env_vars.get(*var).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        if set_dotted(merged, dotted, toml::Value::String(value.clone())) {
            debug!(var, field = dotted, "config field set from environment");
            applied = applied.saturating_add(1);
        }
    }
    applied
}

/// Set `a.b.c` inside a table tree. Returns `false` when a parent is not a table.
fn set_dotted(root: &mut toml::Value, dotted: &str, value: toml::Value) -> bool {
    let mut segments: Vec<&str> = dotted.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return false;
    };
    let mut cursor = root;
    for segment in segments {
        let Some(table) = cursor.as_table_mut() else {
            return false;
        };
        cursor = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    match cursor.as_table_mut() {
        Some(table) => {
            table.insert(leaf.to_owned(), value);
            true
        },
        None => false,
    }
}

/// Read and parse a file that must exist.
fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_checked(path, &content)
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };
    parse_checked(path, &content).map(Some)
}

fn parse_checked(path: &Path, content: &str) -> ConfigResult<toml::Value> {
    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
