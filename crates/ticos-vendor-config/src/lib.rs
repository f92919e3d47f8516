#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Configuration for the ticos-vendor SDK sync tool.
//!
//! # Usage
//!
//! ```rust,no_run
//! use ticos_vendor_config::Config;
//!
//! // defaults → TICOS_VENDOR_* env fallbacks → {root}/ticos-vendor.toml
//! let resolved = Config::load(std::path::Path::new("."), None).unwrap();
//! println!("Syncing from: {}", resolved.config.upstream.repo_url);
//! ```
//!
//! This crate has no dependencies on other internal crates. The sync engine
//! converts these plain types into its own rule types at startup.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAME, ResolvedConfig};
pub use types::*;

impl Config {
    /// Load configuration for the library rooted at `root`.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the final
    /// configuration fails validation.
    pub fn load(
        root: &std::path::Path,
        explicit: Option<&std::path::Path>,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(root, explicit)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if serialization fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError {
            field: "<config>".to_owned(),
            message: format!("failed to serialize config: {e}"),
        })
    }

    /// Render the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if serialization fails.
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::ValidationError {
            field: "<config>".to_owned(),
            message: format!("failed to serialize config: {e}"),
        })
    }
}
