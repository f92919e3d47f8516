//! CLI handlers for the `ticos-vendor config` subcommand.

use std::path::Path;

use anyhow::Result;
use ticos_vendor_config::{Config, ResolvedConfig};

use crate::theme::{Theme, fail};

/// Output formats for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShowFormat {
    Toml,
    Json,
}

impl ShowFormat {
    fn parse(format: &str) -> Option<Self> {
        match format {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn render(resolved: &ResolvedConfig, format: ShowFormat) -> Result<String> {
    let body = match format {
        ShowFormat::Toml => resolved.config.to_toml()?,
        ShowFormat::Json => resolved.config.to_json()?,
    };
    Ok(body)
}

/// Show the resolved configuration.
pub(crate) fn show_config(root: &Path, config_path: Option<&Path>, format: &str) -> Result<()> {
    let Some(show_format) = ShowFormat::parse(format) else {
        fail(&format!("unknown format '{format}' (expected toml or json)"));
    };
    let resolved = Config::load(root, config_path)?;

    if show_format == ShowFormat::Toml {
        if resolved.loaded_files.is_empty() {
            println!("# built-in defaults");
        }
        for path in &resolved.loaded_files {
            println!("# from {path}");
        }
    }
    println!("{}", render(&resolved, show_format)?);
    Ok(())
}

/// Validate the current configuration.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn validate_config(root: &Path, config_path: Option<&Path>) -> Result<()> {
    match Config::load(root, config_path) {
        Ok(resolved) => {
            println!("{}", Theme::success("Configuration is valid."));
            if !resolved.loaded_files.is_empty() {
                println!("\nLoaded files:");
                for path in &resolved.loaded_files {
                    println!("  - {path}");
                }
            }
            Ok(())
        },
        Err(e) => fail(&format!("Configuration error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_format_parse() {
        assert_eq!(ShowFormat::parse("toml"), Some(ShowFormat::Toml));
        assert_eq!(ShowFormat::parse("json"), Some(ShowFormat::Json));
        assert_eq!(ShowFormat::parse("yaml"), None);
    }

    #[test]
    fn test_render_reflects_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ticos_vendor_config::CONFIG_FILE_NAME),
            "[layout]\nsource_dir = \"vendor\"\n",
        )
        .unwrap();

        let resolved = Config::load(dir.path(), None).unwrap();
        let json = render(&resolved, ShowFormat::Json).unwrap();
        assert!(json.contains("\"source_dir\": \"vendor\""));
        let toml = render(&resolved, ShowFormat::Toml).unwrap();
        assert!(toml.contains("source_dir = \"vendor\""));
    }
}
