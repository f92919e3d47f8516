//! ticos-vendor - Ticos SDK vendoring tool
//!
//! Pulls a tagged snapshot of `ticos-sdk-for-c`, flattens its C sources into
//! the Arduino library's `src/` directory, fixes the include paths and bumps
//! `library.properties`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod commands;
mod theme;

use commands::{config, doctor, sync};

/// ticos-vendor - vendor the Ticos C SDK into the Arduino library
#[derive(Parser)]
#[command(name = "ticos-vendor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Library root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Configuration file (defaults to `<root>/ticos-vendor.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace src/ with a snapshot of the SDK and bump library.properties
    Sync {
        /// SDK tag or branch to vendor
        #[arg(long)]
        sdk_version: Option<String>,

        /// Version to record in library.properties
        #[arg(long)]
        lib_version: Option<String>,

        /// Fetch and select only; leave src/ and library.properties alone
        #[arg(long)]
        dry_run: bool,

        /// Keep the scratch clone after the run
        #[arg(long)]
        keep_scratch: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Check that a sync can run here
    Doctor,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
    },
    /// Validate the current configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = match cli.root.clone() {
        Some(root) => root,
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    // Load config for logging setup; commands report load errors themselves.
    let logging = ticos_vendor_config::Config::load(&root, cli.config.as_deref())
        .ok()
        .map(|r| r.config.logging);

    let log_config = match logging
        .as_ref()
        .map(ticos_vendor_telemetry::LogConfig::from_section)
    {
        Some(Ok(mut lc)) => {
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        _ => {
            let level = if cli.verbose { "debug" } else { "info" };
            ticos_vendor_telemetry::LogConfig::new(level)
                .with_format(ticos_vendor_telemetry::LogFormat::Compact)
        },
    };
    if let Err(e) = ticos_vendor_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Sync {
            sdk_version,
            lib_version,
            dry_run,
            keep_scratch,
            json,
        } => {
            let args = sync::SyncArgs {
                sdk_version,
                lib_version,
                dry_run,
                keep_scratch,
                json,
            };
            sync::run_sync(&root, config_path, args).await?;
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show { format } => config::show_config(&root, config_path, &format)?,
            ConfigCommands::Validate => config::validate_config(&root, config_path)?,
        },
        Commands::Doctor => doctor::run_doctor(&root, config_path)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_flags_parse() {
        let cli = Cli::try_parse_from([
            "ticos-vendor",
            "sync",
            "--sdk-version",
            "v1.2.0",
            "--lib-version",
            "2.3.0",
            "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Sync {
                sdk_version,
                lib_version,
                dry_run,
                keep_scratch,
                json,
            } => {
                assert_eq!(sdk_version.as_deref(), Some("v1.2.0"));
                assert_eq!(lib_version.as_deref(), Some("2.3.0"));
                assert!(dry_run);
                assert!(!keep_scratch);
                assert!(!json);
            },
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_sync_versions_are_optional_at_parse_time() {
        let cli = Cli::try_parse_from(["ticos-vendor", "sync"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync {
                sdk_version: None,
                lib_version: None,
                ..
            }
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ticos-vendor",
            "doctor",
            "--root",
            "/work/lib",
            "--config",
            "/work/vendor.toml",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.root, Some(PathBuf::from("/work/lib")));
        assert_eq!(cli.config, Some(PathBuf::from("/work/vendor.toml")));
        assert!(matches!(cli.command, Commands::Doctor));
    }

    #[test]
    fn test_config_show_format() {
        let cli = Cli::try_parse_from(["ticos-vendor", "config", "show", "-f", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show { ref format }
            } if format == "json"
        ));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["ticos-vendor"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
