//! Doctor command for pre-sync health checks.

use std::path::Path;

use anyhow::Result;
use ticos_vendor_config::Config;
use ticos_vendor_sync::{PropertiesDocument, SyncLayout};

use crate::theme::{Theme, fail};

/// Outcome of one check.
#[derive(Debug)]
struct Check {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl Check {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.into(),
        }
    }
}

fn check_git() -> Check {
    match which::which("git") {
        Ok(path) => Check::pass("git", path.display().to_string()),
        Err(e) => Check::fail("git", format!("not found on PATH: {e}")),
    }
}

fn check_metadata(path: &Path, keys: [&str; 2]) -> Check {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => return Check::fail("metadata", format!("{}: {e}", path.display())),
    };
    let doc = PropertiesDocument::parse(&text);
    let missing: Vec<&str> = keys
        .into_iter()
        .filter(|key| doc.get(key).is_none())
        .collect();
    if missing.is_empty() {
        let version = doc.get(keys[0]).unwrap_or_default();
        Check::pass("metadata", format!("{} ({}={version})", path.display(), keys[0]))
    } else {
        Check::fail(
            "metadata",
            format!("{} is missing {}", path.display(), missing.join(", ")),
        )
    }
}

/// Every check except `git`, which depends on the host rather than the
/// library.
fn library_checks(root: &Path, config_path: Option<&Path>) -> Vec<Check> {
    match Config::load(root, config_path) {
        Ok(resolved) => {
            let detail = if resolved.loaded_files.is_empty() {
                "built-in defaults".to_owned()
            } else {
                resolved.loaded_files.join(", ")
            };
            let mut checks = vec![Check::pass("configuration", detail)];
            checks.extend(layout_checks(root, &resolved.config));
            checks
        },
        Err(e) => vec![Check::fail("configuration", e.to_string())],
    }
}

fn layout_checks(root: &Path, config: &Config) -> Vec<Check> {
    let layout = SyncLayout::resolve(root, &config.layout);
    let mut checks = Vec::new();

    checks.push(if layout.source_dir.is_dir() {
        Check::pass("source dir", layout.source_dir.display().to_string())
    } else {
        Check::fail(
            "source dir",
            format!("{} does not exist", layout.source_dir.display()),
        )
    });

    checks.push(check_metadata(
        &layout.metadata_file,
        [
            config.metadata.version_key.as_str(),
            config.metadata.url_key.as_str(),
        ],
    ));

    checks.push(if layout.scratch_dir.exists() {
        Check::fail(
            "scratch dir",
            format!(
                "{} left over from an earlier run (will be replaced)",
                layout.scratch_dir.display()
            ),
        )
    } else {
        Check::pass("scratch dir", "clean")
    });

    checks
}

/// Run health checks against the library at `root`.
pub(crate) fn run_doctor(root: &Path, config_path: Option<&Path>) -> Result<()> {
    println!("{}", Theme::header("ticos-vendor doctor"));
    println!();

    let mut checks = vec![check_git()];
    checks.extend(library_checks(root, config_path));

    for check in &checks {
        println!(
            "  {} {:<14} {}",
            Theme::status(check.ok),
            check.name,
            Theme::dimmed(&check.detail)
        );
    }

    println!();
    // A leftover scratch dir is only advisory.
    let blocking = checks
        .iter()
        .filter(|c| !c.ok && c.name != "scratch dir")
        .count();
    if blocking == 0 {
        println!("{}", Theme::success("Ready to sync."));
        Ok(())
    } else {
        fail(&format!("{blocking} check(s) failed"));
    }
}
