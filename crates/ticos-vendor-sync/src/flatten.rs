//! Replacing the destination directory with a flat copy of the selection.

use std::path::Path;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::select::Selection;

/// What [`flatten`] did to the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlattenOutcome {
    /// Entries that were in the destination before it was cleared.
    pub removed: Vec<String>,
    /// File names written, sorted.
    pub copied: Vec<String>,
}

impl FlattenOutcome {
    /// Headers present after the copy that were not there before.
    #[must_use]
    pub fn added_headers(&self) -> Vec<String> {
        self.copied
            .iter()
            .filter(|name| name.ends_with(".h"))
            .filter(|name| !self.removed.contains(name))
            .cloned()
            .collect()
    }
}

/// Remove every entry of `dir`, creating it if it does not exist.
///
/// Returns the names of the removed entries, sorted.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or an entry cannot be
/// removed.
pub async fn clear_directory(dir: &Path) -> SyncResult<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SyncError::io("create", dir, e))?;
            return Ok(Vec::new());
        },
        Err(e) => return Err(SyncError::io("read", dir, e)),
    };

    let mut removed = Vec::new();
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
        let result = if file_type.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.map_err(|e| SyncError::io("remove", &path, e))?;
        removed.push(entry.file_name().to_string_lossy().into_owned());
    }

    removed.sort();
    Ok(removed)
}

/// Clear `dest` and copy every selected file into it by file name.
///
/// Name collisions are rejected before `dest` is touched. Copies run as one
/// task per file; the call returns once all of them have finished, with the
/// first failure if any failed.
///
/// # Errors
///
/// Returns [`SyncError::NameCollision`], a clearing error, or the first
/// [`SyncError::Copy`] failure.
pub async fn flatten(selection: &Selection, dest: &Path) -> SyncResult<FlattenOutcome> {
    selection.check_collisions()?;

    let removed = clear_directory(dest).await?;
    debug!(dest = %dest.display(), removed = removed.len(), "cleared destination");

    let mut tasks = JoinSet::new();
    for from in selection.absolute_paths() {
        let Some(name) = from.file_name().map(ToOwned::to_owned) else {
            continue;
        };
        let to = dest.join(&name);
        tasks.spawn(async move {
            match tokio::fs::copy(&from, &to).await {
                Ok(_) => Ok(name.to_string_lossy().into_owned()),
                Err(source) => Err(SyncError::Copy { from, to, source }),
            }
        });
    }

    let mut copied = Vec::with_capacity(selection.len());
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| SyncError::Task(e.to_string())).and_then(|r| r);
        match result {
            Ok(name) => copied.push(name),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => warn!(error = %e, "additional copy failure"),
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    copied.sort();
    Ok(FlattenOutcome { removed, copied })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn fixture(files: &[(&str, &str)]) -> (tempfile::TempDir, Selection) {
        let dir = tempfile::tempdir().unwrap();
        let clone = dir.path().join("clone");
        let mut rel = Vec::new();
        for (path, body) in files {
            let full = clone.join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(&full, body).unwrap();
            rel.push(PathBuf::from(path));
        }
        (
            dir,
            Selection {
                root: clone,
                files: rel,
            },
        )
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut out: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn test_flatten_discards_structure() {
        let (dir, selection) = fixture(&[
            ("sdk/src/ticos/core/ti_span.c", "span"),
            ("sdk/inc/ticos/core/ti_span.h", "span header"),
            ("sdk/inc/ticos/iot/ti_iot.h", "iot header"),
        ]);
        let dest = dir.path().join("src");

        let outcome = flatten(&selection, &dest).await.unwrap();
        assert_eq!(outcome.copied, vec!["ti_iot.h", "ti_span.c", "ti_span.h"]);
        assert!(outcome.removed.is_empty());
        assert_eq!(names(&dest), outcome.copied);
        assert_eq!(
            std::fs::read_to_string(dest.join("ti_span.h")).unwrap(),
            "span header"
        );
    }

    #[tokio::test]
    async fn test_flatten_clears_stale_entries() {
        let (dir, selection) = fixture(&[("sdk/src/ti_new.c", "new")]);
        let dest = dir.path().join("src");
        std::fs::create_dir_all(dest.join("leftover_dir")).unwrap();
        std::fs::write(dest.join("leftover_dir/x.c"), "x").unwrap();
        std::fs::write(dest.join("ti_old.h"), "old").unwrap();

        let outcome = flatten(&selection, &dest).await.unwrap();
        assert_eq!(outcome.removed, vec!["leftover_dir", "ti_old.h"]);
        assert_eq!(names(&dest), vec!["ti_new.c"]);
    }

    #[tokio::test]
    async fn test_flatten_twice_is_idempotent() {
        let (dir, selection) = fixture(&[
            ("sdk/src/a.c", "a"),
            ("sdk/inc/a.h", "a header"),
        ]);
        let dest = dir.path().join("src");

        let first = flatten(&selection, &dest).await.unwrap();
        let snapshot = names(&dest);
        let second = flatten(&selection, &dest).await.unwrap();
        assert_eq!(names(&dest), snapshot);
        assert_eq!(first.copied, second.copied);
        assert!(second.added_headers().is_empty());
    }

    #[tokio::test]
    async fn test_collision_leaves_destination_untouched() {
        let (dir, selection) = fixture(&[
            ("sdk/src/core/ti_log.c", "core"),
            ("sdk/src/iot/ti_log.c", "iot"),
        ]);
        let dest = dir.path().join("src");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("keep.c"), "keep").unwrap();

        let err = flatten(&selection, &dest).await.unwrap_err();
        assert!(matches!(err, SyncError::NameCollision { .. }));
        assert_eq!(names(&dest), vec!["keep.c"]);
    }

    #[tokio::test]
    async fn test_missing_source_reports_copy_error() {
        let (dir, mut selection) = fixture(&[("sdk/src/a.c", "a")]);
        selection.files.push(PathBuf::from("sdk/src/vanished.c"));
        let dest = dir.path().join("src");

        let err = flatten(&selection, &dest).await.unwrap_err();
        assert!(matches!(err, SyncError::Copy { .. }));
        // The copy that could succeed still completed.
        assert!(dest.join("a.c").exists());
    }

    #[test]
    fn test_added_headers() {
        let outcome = FlattenOutcome {
            removed: vec!["ti_core.h".into(), "ti_span.c".into()],
            copied: vec![
                "ti_core.h".into(),
                "ti_span.c".into(),
                "ti_storage.h".into(),
                "ti_storage.c".into(),
            ],
        };
        assert_eq!(outcome.added_headers(), vec!["ti_storage.h"]);
    }
}
