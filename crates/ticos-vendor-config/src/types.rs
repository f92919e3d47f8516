//! Configuration types for ticos-vendor.
//!
//! Every struct implements [`Default`] with the values shipped in
//! `defaults.toml`, so a bare `[section]` header in TOML produces a working
//! configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the SDK is fetched from and how its tree URL is built.
    pub upstream: UpstreamSection,
    /// Paths inside the Arduino library, relative to the library root.
    pub layout: LayoutSection,
    /// Which files of the SDK tree are vendored.
    pub selection: SelectionSection,
    /// Include-path rewriting for the flattened layout.
    pub rewrite: RewriteSection,
    /// Keys rewritten in the library metadata file.
    pub metadata: MetadataSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// UpstreamSection
// ---------------------------------------------------------------------------

/// Upstream SDK repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Clone URL of the SDK repository.
    pub repo_url: String,
    /// Browse URL written into the metadata file. `{sdk_version}` is
    /// replaced with the synced revision.
    pub tree_url_template: String,
    /// Upper bound for the shallow clone, in seconds.
    pub clone_timeout_secs: u64,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            repo_url: "git@github.com:tiwater/ticos-sdk-for-c.git".to_owned(),
            tree_url_template: "https://github.com/tiwater/ticos-sdk-for-c/tree/{sdk_version}"
                .to_owned(),
            clone_timeout_secs: 300,
        }
    }
}

impl UpstreamSection {
    /// Placeholder substituted by [`UpstreamSection::tree_url`].
    pub const VERSION_PLACEHOLDER: &'static str = "{sdk_version}";

    /// Render the tree URL for a revision.
    #[must_use]
    pub fn tree_url(&self, sdk_version: &str) -> String {
        self.tree_url_template
            .replace(Self::VERSION_PLACEHOLDER, sdk_version)
    }
}

// ---------------------------------------------------------------------------
// LayoutSection
// ---------------------------------------------------------------------------

/// Library-relative locations touched by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    /// Flattened source directory (fully replaced on every run).
    pub source_dir: String,
    /// Arduino `library.properties` file.
    pub metadata_file: String,
    /// Scratch clone location, removed at the end of the run.
    pub scratch_dir: String,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            source_dir: "src".to_owned(),
            metadata_file: "library.properties".to_owned(),
            scratch_dir: "sdkrepo".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// SelectionSection
// ---------------------------------------------------------------------------

/// File selection rules applied to the fetched tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSection {
    /// Directory inside the clone that holds the C implementation.
    pub sdk_subtree: String,
    /// File extensions to vendor (without the dot).
    pub extensions: Vec<String>,
    /// Directory names whose contents are never vendored.
    pub excluded_dirs: Vec<String>,
    /// Substrings marking unsupported platform backends.
    pub excluded_markers: Vec<String>,
}

impl Default for SelectionSection {
    fn default() -> Self {
        Self {
            sdk_subtree: "sdk".to_owned(),
            extensions: vec!["c".to_owned(), "h".to_owned()],
            excluded_dirs: vec!["tests".to_owned(), "samples".to_owned()],
            excluded_markers: vec![
                "curl".to_owned(),
                "win32".to_owned(),
                "ti_posix".to_owned(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// RewriteSection
// ---------------------------------------------------------------------------

/// Include directives to collapse after flattening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteSection {
    /// First path segment of every namespaced include.
    pub namespace_root: String,
    /// Nested directories below the root that no longer exist once flattened.
    pub subpaths: Vec<String>,
}

impl Default for RewriteSection {
    fn default() -> Self {
        Self {
            namespace_root: "ticos".to_owned(),
            subpaths: [
                "iot/internal",
                "core/internal",
                "iot",
                "core",
                "storage",
                "platform",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataSection
// ---------------------------------------------------------------------------

/// Fields of the metadata file owned by the sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    /// Key receiving the library version.
    pub version_key: String,
    /// Key receiving the upstream tree URL.
    pub url_key: String,
    /// Umbrella headers the operator is reminded to register.
    pub reminder_headers: Vec<String>,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            version_key: "version".to_owned(),
            url_key: "url".to_owned(),
            reminder_headers: vec!["ti_core.h".to_owned(), "ti_iot.h".to_owned()],
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["ticos_vendor_sync=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
