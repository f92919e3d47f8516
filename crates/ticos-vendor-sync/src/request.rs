//! Run inputs: the two required identifiers and the library layout.

use std::path::{Path, PathBuf};

use serde::Serialize;
use ticos_vendor_config::LayoutSection;

use crate::error::{SyncError, SyncResult};

/// The two identifiers every run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    /// Tag or branch of the upstream SDK to vendor.
    pub sdk_version: String,
    /// Version stamped into the library metadata.
    pub lib_version: String,
}

impl SyncRequest {
    /// Validate the raw command-line inputs.
    ///
    /// Absent or blank values are rejected; nothing else about their format
    /// is checked.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingInput`] naming the first missing flag.
    pub fn new(sdk_version: Option<String>, lib_version: Option<String>) -> SyncResult<Self> {
        let sdk_version = require(sdk_version, "--sdk-version")?;
        let lib_version = require(lib_version, "--lib-version")?;
        Ok(Self {
            sdk_version,
            lib_version,
        })
    }
}

fn require(value: Option<String>, flag: &'static str) -> SyncResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(SyncError::MissingInput { flag }),
    }
}

/// Absolute locations touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncLayout {
    /// Library root all other paths hang off.
    pub root: PathBuf,
    /// Flattened source directory.
    pub source_dir: PathBuf,
    /// `library.properties`.
    pub metadata_file: PathBuf,
    /// Scratch clone directory.
    pub scratch_dir: PathBuf,
}

impl SyncLayout {
    /// Resolve the configured relative layout against `root`.
    #[must_use]
    pub fn resolve(root: &Path, layout: &LayoutSection) -> Self {
        Self {
            root: root.to_path_buf(),
            source_dir: root.join(&layout.source_dir),
            metadata_file: root.join(&layout.metadata_file),
            scratch_dir: root.join(&layout.scratch_dir),
        }
    }
}
