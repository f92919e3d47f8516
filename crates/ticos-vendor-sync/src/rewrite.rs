//! Collapsing namespaced include directives for the flat layout.
//!
//! Upstream sources include headers as `<ticos/core/internal/ti_x.h>`; once
//! every header sits directly in `src/` the include must read `<ti_x.h>`.

use std::borrow::Cow;
use std::path::Path;

use regex::bytes::Regex;
use serde::Serialize;
use ticos_vendor_config::RewriteSection;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// The namespace prefixes removed from include directives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRules {
    /// Leading namespace directory, e.g. `ticos`.
    pub namespace_root: String,
    /// Nested directories under the root, e.g. `core/internal`.
    pub subpaths: Vec<String>,
}

impl From<&RewriteSection> for RewriteRules {
    fn from(section: &RewriteSection) -> Self {
        Self {
            namespace_root: section.namespace_root.clone(),
            subpaths: section.subpaths.clone(),
        }
    }
}

impl RewriteRules {
    /// Every full prefix, e.g. `ticos/core/internal/`.
    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.subpaths
            .iter()
            .map(|sub| format!("{}/{}/", self.namespace_root, sub.trim_matches('/')))
            .collect()
    }
}

/// Compiled include rewriter.
#[derive(Debug, Clone)]
pub struct IncludeRewriter {
    pattern: Regex,
}

impl IncludeRewriter {
    /// Compile `rules` into a single pattern.
    ///
    /// Subpaths are tried longest first so `iot/internal` wins over `iot`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRule`] if the rule set is empty or the
    /// pattern cannot be compiled.
    pub fn new(rules: &RewriteRules) -> SyncResult<Self> {
        if rules.subpaths.is_empty() || rules.namespace_root.is_empty() {
            return Err(SyncError::InvalidRule {
                rule: "rewrite",
                message: "namespace root and at least one subpath are required".to_owned(),
            });
        }

        let mut subpaths: Vec<&str> = rules
            .subpaths
            .iter()
            .map(|s| s.trim_matches('/'))
            .collect();
        subpaths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        subpaths.dedup();

        let alternation = subpaths
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        let source = format!(
            r"(#[ \t]*include[ \t]*<){}/(?:{})/",
            regex::escape(&rules.namespace_root),
            alternation
        );

        let pattern = Regex::new(&source).map_err(|e| SyncError::InvalidRule {
            rule: "rewrite",
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Rewrite every matching directive in `input`.
    #[must_use]
    pub fn rewrite<'a>(&self, input: &'a [u8]) -> Cow<'a, [u8]> {
        self.pattern.replace_all(input, b"${1}".as_slice())
    }

    /// Whether `input` still contains a namespaced include.
    #[must_use]
    pub fn has_namespaced_include(&self, input: &[u8]) -> bool {
        self.pattern.is_match(input)
    }

    /// Rewrite every regular file directly inside `dir` in place.
    ///
    /// Files without a matching directive are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or written back.
    pub async fn rewrite_directory(&self, dir: &Path) -> SyncResult<RewriteSummary> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SyncError::io("read", dir, e))?;

        let mut summary = RewriteSummary::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::io("read", dir, e))?
        {
            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SyncError::io("inspect", &path, e))?;
            if !file_type.is_file() {
                continue;
            }

            summary.scanned = summary.scanned.saturating_add(1);
            let original = tokio::fs::read(&path)
                .await
                .map_err(|e| SyncError::io("read", &path, e))?;
            if let Cow::Owned(updated) = self.rewrite(&original) {
                tokio::fs::write(&path, updated)
                    .await
                    .map_err(|e| SyncError::io("write", &path, e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                debug!(file = %name, "rewrote include directives");
                summary.rewritten.push(name);
            }
        }

        summary.rewritten.sort();
        Ok(summary)
    }
}

/// Result of [`IncludeRewriter::rewrite_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    /// Files inspected.
    pub scanned: usize,
    /// Files whose content changed, sorted.
    pub rewritten: Vec<String>,
}
