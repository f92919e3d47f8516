//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are usable
//! before any file is touched.

use std::path::{Component, Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, UpstreamSection};

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_upstream(config)?;
    validate_layout(config)?;
    validate_selection(config)?;
    validate_rewrite(config)?;
    validate_metadata(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_upstream(config: &Config) -> ConfigResult<()> {
    let u = &config.upstream;

    if u.repo_url.trim().is_empty() {
        return Err(invalid("upstream.repo_url", "repo_url must not be empty"));
    }

    if !u.tree_url_template.contains(UpstreamSection::VERSION_PLACEHOLDER) {
        return Err(invalid(
            "upstream.tree_url_template",
            format!(
                "template must contain '{}'",
                UpstreamSection::VERSION_PLACEHOLDER
            ),
        ));
    }

    if u.clone_timeout_secs == 0 {
        return Err(invalid(
            "upstream.clone_timeout_secs",
            "clone_timeout_secs must be greater than 0",
        ));
    }

    Ok(())
}

/// Drop `.` components so `./src` and `src` compare equal.
fn normalize(value: &str) -> PathBuf {
    Path::new(value)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Layout paths must name something strictly inside the library root.
fn check_relative(field: &str, value: &str) -> ConfigResult<PathBuf> {
    if value.trim().is_empty() {
        return Err(invalid(field, "path must not be empty"));
    }
    let path = Path::new(value);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(invalid(
            field,
            format!("'{value}' must be a relative path inside the library root"),
        ));
    }
    let normalized = normalize(value);
    if normalized.as_os_str().is_empty() {
        return Err(invalid(
            field,
            format!("'{value}' refers to the library root itself"),
        ));
    }
    Ok(normalized)
}

fn validate_layout(config: &Config) -> ConfigResult<()> {
    let l = &config.layout;

    let source_dir = check_relative("layout.source_dir", &l.source_dir)?;
    let metadata_file = check_relative("layout.metadata_file", &l.metadata_file)?;
    let scratch_dir = check_relative("layout.scratch_dir", &l.scratch_dir)?;

    if scratch_dir.starts_with(&source_dir) || source_dir.starts_with(&scratch_dir) {
        return Err(invalid(
            "layout.scratch_dir",
            "scratch_dir and source_dir must not contain one another",
        ));
    }

    if metadata_file.starts_with(&source_dir) || metadata_file.starts_with(&scratch_dir) {
        return Err(invalid(
            "layout.metadata_file",
            "metadata_file must not live inside source_dir or scratch_dir, which are cleared on every run",
        ));
    }

    Ok(())
}

fn validate_selection(config: &Config) -> ConfigResult<()> {
    let s = &config.selection;

    check_relative("selection.sdk_subtree", &s.sdk_subtree)?;

    if s.extensions.is_empty() {
        return Err(invalid(
            "selection.extensions",
            "at least one file extension is required",
        ));
    }

    if let Some(bad) = s
        .extensions
        .iter()
        .find(|e| e.is_empty() || e.starts_with('.') || e.contains(['/', '*', '{', '}']))
    {
        return Err(invalid(
            "selection.extensions",
            format!("invalid extension '{bad}'; use bare names such as \"c\""),
        ));
    }

    if s.excluded_dirs.iter().any(String::is_empty) {
        return Err(invalid(
            "selection.excluded_dirs",
            "excluded directory names must not be empty",
        ));
    }

    if s.excluded_markers.iter().any(String::is_empty) {
        return Err(invalid(
            "selection.excluded_markers",
            "an empty marker would exclude every file",
        ));
    }

    Ok(())
}

fn validate_rewrite(config: &Config) -> ConfigResult<()> {
    let r = &config.rewrite;

    if r.namespace_root.is_empty() || r.namespace_root.contains('/') {
        return Err(invalid(
            "rewrite.namespace_root",
            "namespace_root must be a single non-empty path segment",
        ));
    }

    if r.subpaths.is_empty() {
        return Err(invalid(
            "rewrite.subpaths",
            "at least one subpath is required",
        ));
    }

    if let Some(bad) = r
        .subpaths
        .iter()
        .find(|p| p.is_empty() || p.starts_with('/') || p.ends_with('/'))
    {
        return Err(invalid(
            "rewrite.subpaths",
            format!("invalid subpath '{bad}'; expected e.g. \"iot/internal\""),
        ));
    }

    Ok(())
}

fn validate_metadata(config: &Config) -> ConfigResult<()> {
    let m = &config.metadata;

    if m.version_key.trim().is_empty() {
        return Err(invalid("metadata.version_key", "version_key must not be empty"));
    }
    if m.url_key.trim().is_empty() {
        return Err(invalid("metadata.url_key", "url_key must not be empty"));
    }
    if m.version_key == m.url_key {
        return Err(invalid(
            "metadata.url_key",
            "url_key must differ from version_key",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }

    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "level must not be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_template_without_placeholder() {
        let mut config = Config::default();
        config.upstream.tree_url_template = "https://example.com/tree/main".to_owned();
        let err = validate(&config).unwrap_err();
        assert_eq!(field_of(err), "upstream.tree_url_template");
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.upstream.clone_timeout_secs = 0;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "upstream.clone_timeout_secs"
        );
    }

    #[test]
    fn test_layout_paths_must_stay_inside_root() {
        let mut config = Config::default();
        config.layout.scratch_dir = "../elsewhere".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.scratch_dir"
        );

        let mut config = Config::default();
        config.layout.source_dir = "/usr/src".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "layout.source_dir");
    }

    #[test]
    fn test_metadata_inside_source_dir_rejected() {
        let mut config = Config::default();
        config.layout.metadata_file = "src/library.properties".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.metadata_file"
        );
    }

    #[test]
    fn test_library_root_as_source_dir_rejected() {
        for value in [".", "./", "./."] {
            let mut config = Config::default();
            config.layout.source_dir = value.to_owned();
            assert_eq!(
                field_of(validate(&config).unwrap_err()),
                "layout.source_dir",
                "{value}"
            );
        }
    }

    #[test]
    fn test_scratch_dir_inside_source_dir_rejected() {
        let mut config = Config::default();
        config.layout.scratch_dir = "src/sdkrepo".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.scratch_dir"
        );

        let mut config = Config::default();
        config.layout.scratch_dir = "./src".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.scratch_dir"
        );
    }

    #[test]
    fn test_metadata_inside_source_dir_rejected_after_normalizing() {
        let mut config = Config::default();
        config.layout.metadata_file = "./src/library.properties".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.metadata_file"
        );

        let mut config = Config::default();
        config.layout.source_dir = "./src/".to_owned();
        config.layout.metadata_file = "src/library.properties".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "layout.metadata_file"
        );
    }

    #[test]
    fn test_nested_layout_paths_accepted() {
        let mut config = Config::default();
        config.layout.source_dir = "./vendor/src".to_owned();
        config.layout.scratch_dir = "vendor/sdkrepo".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let mut config = Config::default();
        config.selection.extensions = vec![".c".to_owned()];
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "selection.extensions"
        );
    }

    #[test]
    fn test_empty_marker_rejected() {
        let mut config = Config::default();
        config.selection.excluded_markers.push(String::new());
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "selection.excluded_markers"
        );
    }

    #[test]
    fn test_rewrite_rules() {
        let mut config = Config::default();
        config.rewrite.subpaths.clear();
        assert_eq!(field_of(validate(&config).unwrap_err()), "rewrite.subpaths");

        let mut config = Config::default();
        config.rewrite.subpaths.push("iot/".to_owned());
        assert_eq!(field_of(validate(&config).unwrap_err()), "rewrite.subpaths");

        let mut config = Config::default();
        config.rewrite.namespace_root = "ticos/sdk".to_owned();
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "rewrite.namespace_root"
        );
    }

    #[test]
    fn test_same_metadata_keys_rejected() {
        let mut config = Config::default();
        config.metadata.url_key = "version".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "metadata.url_key");
    }

    #[test]
    fn test_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }
}
