//! CLI handler for `ticos-vendor sync`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ticos_vendor_config::Config;
use ticos_vendor_sync::{GitFetcher, SyncLayout, SyncOptions, SyncReport, SyncRequest, SyncSettings};
use tracing::debug;

use crate::theme::{Theme, fail};

/// Raw `sync` arguments as parsed by clap.
pub(crate) struct SyncArgs {
    pub(crate) sdk_version: Option<String>,
    pub(crate) lib_version: Option<String>,
    pub(crate) dry_run: bool,
    pub(crate) keep_scratch: bool,
    pub(crate) json: bool,
}

/// Everything a run needs, resolved before any side effect.
struct Prepared {
    request: SyncRequest,
    config: Config,
    settings: SyncSettings,
    fetcher: GitFetcher,
    layout: SyncLayout,
}

/// Check inputs, load configuration and locate git.
///
/// Reads configuration only; nothing under `root` is created or changed.
fn preflight(root: &Path, config_path: Option<&Path>, args: &SyncArgs) -> Result<Prepared> {
    // Inputs come first so a missing flag is reported before config errors.
    let request = SyncRequest::new(args.sdk_version.clone(), args.lib_version.clone())?;

    let config = Config::load(root, config_path)
        .context("failed to load configuration")?
        .config;
    let settings = SyncSettings::from_config(&config)?;
    let fetcher = GitFetcher::locate(
        config.upstream.repo_url.clone(),
        Duration::from_secs(config.upstream.clone_timeout_secs),
    )?;
    let layout = SyncLayout::resolve(root, &config.layout);

    Ok(Prepared {
        request,
        config,
        settings,
        fetcher,
        layout,
    })
}

/// Validate inputs, run the pipeline and print the outcome.
pub(crate) async fn run_sync(root: &Path, config_path: Option<&Path>, args: SyncArgs) -> Result<()> {
    let Prepared {
        request,
        config,
        settings,
        fetcher,
        layout,
    } = match preflight(root, config_path, &args) {
        Ok(prepared) => prepared,
        Err(e) => fail(&format!("{e:#}")),
    };

    let options = SyncOptions {
        dry_run: args.dry_run,
        keep_scratch: args.keep_scratch,
    };
    debug!(?layout, ?options, "starting sync");

    if !args.json {
        println!(
            "{}",
            Theme::header(&format!(
                "Syncing ticos-sdk-for-c {} into {}",
                request.sdk_version,
                layout.source_dir.display()
            ))
        );
    }

    let report = match ticos_vendor_sync::run_sync(
        request,
        layout.clone(),
        settings,
        Arc::new(fetcher),
        options,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => fail(&e.to_string()),
    };

    let reminder = reminder_lines(&config.metadata.reminder_headers, &report);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        for line in &reminder {
            eprintln!("{}", Theme::warning(line));
        }
    } else {
        print_report(&report, &layout);
        for line in &reminder {
            println!("{}", Theme::warning(line));
        }
    }
    Ok(())
}

fn print_report(report: &SyncReport, layout: &SyncLayout) {
    if report.dry_run {
        println!(
            "{}",
            Theme::info(&format!(
                "Dry run: {} files would be vendored from {}",
                report.selected.len(),
                report.sdk_version
            ))
        );
        for path in &report.selected {
            println!("  {}", Theme::dimmed(path));
        }
    } else {
        println!(
            "{}",
            Theme::success(&format!(
                "Vendored {} files from {}",
                report.copied.len(),
                report.sdk_version
            ))
        );
        println!(
            "  {}",
            Theme::kv(
                "src",
                &format!(
                    "removed {} entries, copied {} files",
                    report.removed.len(),
                    report.copied.len()
                )
            )
        );
        println!(
            "  {}",
            Theme::kv(
                "includes rewritten",
                &format!("{} files", report.rewritten.len())
            )
        );
    }

    if let Some(metadata) = &report.metadata {
        let previous = metadata.previous_version.as_deref().unwrap_or("(unset)");
        println!(
            "  {}",
            Theme::kv("version", &format!("{previous} -> {}", metadata.version))
        );
        println!("  {}", Theme::kv("url", &metadata.url));
    }

    if report.scratch_removed {
        println!("  {}", Theme::dimmed("scratch clone removed"));
    } else {
        println!(
            "  {}",
            Theme::dimmed(&format!(
                "scratch clone kept at {}",
                layout.scratch_dir.display()
            ))
        );
    }
}

/// Lines reminding the operator to register public headers by hand.
fn reminder_lines(reminder_headers: &[String], report: &SyncReport) -> Vec<String> {
    if report.dry_run {
        return Vec::new();
    }

    let mut lines = vec![format!(
        "You must manually update library.properties with any new includes such as {}",
        reminder_headers.join(", ")
    )];
    if !report.added_headers.is_empty() {
        lines.push(format!(
            "Headers new in this sync: {}",
            report.added_headers.join(", ")
        ));
    }
    lines
}
