//! Choosing which files of the fetched tree get vendored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use ticos_vendor_config::SelectionSection;
use walkdir::WalkDir;

use crate::error::{SyncError, SyncResult};

/// Selection rules, lifted out of the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRules {
    /// Directory inside the clone holding the sources.
    pub sdk_subtree: String,
    /// Extensions to keep.
    pub extensions: Vec<String>,
    /// Directory names to skip wherever they appear.
    pub excluded_dirs: Vec<String>,
    /// Substrings that disqualify any path component.
    pub excluded_markers: Vec<String>,
}

impl From<&SelectionSection> for SelectionRules {
    fn from(section: &SelectionSection) -> Self {
        Self {
            sdk_subtree: section.sdk_subtree.clone(),
            extensions: section.extensions.clone(),
            excluded_dirs: section.excluded_dirs.clone(),
            excluded_markers: section.excluded_markers.clone(),
        }
    }
}

/// Escape glob metacharacters so configured names match literally.
fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '{' | '}') {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

fn add_glob(builder: &mut GlobSetBuilder, pattern: &str) -> SyncResult<()> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| SyncError::InvalidRule {
            rule: "selection",
            message: format!("invalid glob '{pattern}': {e}"),
        })?;
    builder.add(glob);
    Ok(())
}

/// Compiled matcher for [`SelectionRules`].
#[derive(Debug, Clone)]
pub struct FileSelector {
    subtree: String,
    include: GlobSet,
    exclude: GlobSet,
}

impl FileSelector {
    /// Compile the rules into glob sets.
    ///
    /// Paths are matched relative to the clone root, e.g.
    /// `sdk/src/ticos/core/ti_span.c`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRule`] if a glob cannot be built.
    pub fn new(rules: &SelectionRules) -> SyncResult<Self> {
        if rules.extensions.is_empty() {
            return Err(SyncError::InvalidRule {
                rule: "selection",
                message: "no extensions configured".to_owned(),
            });
        }

        let subtree = rules.sdk_subtree.trim_matches('/').to_owned();
        let extensions: Vec<String> = rules.extensions.iter().map(|e| escape_glob(e)).collect();

        let mut include = GlobSetBuilder::new();
        add_glob(
            &mut include,
            &format!("{}/**/*.{{{}}}", escape_glob(&subtree), extensions.join(",")),
        )?;

        let mut exclude = GlobSetBuilder::new();
        for dir in &rules.excluded_dirs {
            add_glob(&mut exclude, &format!("**/{}/**", escape_glob(dir)))?;
        }
        for marker in &rules.excluded_markers {
            let marker = escape_glob(marker);
            add_glob(&mut exclude, &format!("**/*{marker}*"))?;
            add_glob(&mut exclude, &format!("**/*{marker}*/**"))?;
        }

        let build = |b: GlobSetBuilder| {
            b.build().map_err(|e| SyncError::InvalidRule {
                rule: "selection",
                message: e.to_string(),
            })
        };

        Ok(Self {
            subtree,
            include: build(include)?,
            exclude: build(exclude)?,
        })
    }

    /// Whether a clone-relative path is vendored.
    #[must_use]
    pub fn is_selected(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// Walk the clone at `root` and collect every selected file.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK subtree is missing or cannot be walked.
    pub fn select(&self, root: &Path) -> SyncResult<Selection> {
        let subtree = root.join(&self.subtree);
        if !subtree.is_dir() {
            return Err(SyncError::io(
                "read",
                &subtree,
                std::io::Error::new(std::io::ErrorKind::NotFound, "SDK subtree not found"),
            ));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&subtree)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                // Skip hidden directories (but not the root entry)
                e.depth() == 0 || e.file_name().to_str().is_none_or(|s| !s.starts_with('.'))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| subtree.clone(), Path::to_path_buf);
                SyncError::io("walk", path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if self.is_selected(relative) {
                files.push(relative.to_path_buf());
            }
        }

        Ok(Selection {
            root: root.to_path_buf(),
            files,
        })
    }
}

/// Files chosen from a fetched tree, relative to the clone root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    /// Clone root the paths are relative to.
    pub root: PathBuf,
    /// Selected files in walk order (sorted by path).
    pub files: Vec<PathBuf>,
}

impl Selection {
    /// Number of selected files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Absolute path of each selected file.
    pub fn absolute_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.root.join(f))
    }

    /// Selected paths rendered with `/` separators.
    #[must_use]
    pub fn display_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| display_relative(f)).collect()
    }

    /// Reject selections where two files share a file name.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NameCollision`] for the first clash found.
    pub fn check_collisions(&self) -> SyncResult<()> {
        let mut seen: BTreeMap<&std::ffi::OsStr, &Path> = BTreeMap::new();
        for file in &self.files {
            let Some(name) = file.file_name() else {
                continue;
            };
            if let Some(first) = seen.insert(name, file.as_path()) {
                return Err(SyncError::NameCollision {
                    name: name.to_string_lossy().into_owned(),
                    first: display_relative(first),
                    second: display_relative(file),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn display_relative(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
