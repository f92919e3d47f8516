//! Sync error types.

use std::path::PathBuf;

use crate::properties::PropertiesError;

/// Errors from a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A required command-line input was absent or empty.
    #[error("{flag} not provided")]
    MissingInput {
        /// The flag that was missing, e.g. `--sdk-version`.
        flag: &'static str,
    },

    /// The configuration could not be turned into sync rules.
    #[error("invalid {rule} rule: {message}")]
    InvalidRule {
        /// Which rule set was rejected (`selection` or `rewrite`).
        rule: &'static str,
        /// Why it was rejected.
        message: String,
    },

    /// The `git` executable could not be located.
    #[error("git executable not found: {0}")]
    GitNotFound(String),

    /// `git clone` exited unsuccessfully.
    #[error("git clone of '{revision}' failed:\n{stderr}")]
    FetchFailed {
        /// Requested tag or branch.
        revision: String,
        /// Captured stderr of the clone.
        stderr: String,
    },

    /// `git clone` did not finish in time.
    #[error("git clone timed out after {secs}s")]
    FetchTimeout {
        /// Timeout that elapsed.
        secs: u64,
    },

    /// A step that needs the scratch clone ran before it existed.
    #[error("scratch clone not available at {0}")]
    ScratchMissing(PathBuf),

    /// Nothing under the SDK subtree matched the selection rules.
    #[error("no source files selected under {0}")]
    EmptySelection(PathBuf),

    /// Two selected files share a file name and would overwrite each other
    /// once flattened.
    #[error("file name collision while flattening '{name}': {first} and {second}")]
    NameCollision {
        /// The shared file name.
        name: String,
        /// First path (relative to the clone root).
        first: String,
        /// Second path (relative to the clone root).
        second: String,
    },

    /// Copying a selected file into the destination failed.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file system operation on a known path failed.
    #[error("failed to {action} {path}: {source}")]
    FileIo {
        /// What was attempted (`read`, `write`, `remove`, ...).
        action: &'static str,
        /// The path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The metadata file could not be edited.
    #[error("cannot update {path}: {source}")]
    Properties {
        /// Path to the properties file.
        path: PathBuf,
        /// Edit failure.
        #[source]
        source: PropertiesError,
    },

    /// A background copy task panicked or was cancelled.
    #[error("copy task failed: {0}")]
    Task(String),

    /// A pipeline step failed; the run stopped there.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the failing step.
        step: &'static str,
        /// The step's error.
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileIo {
            action,
            path: path.into(),
            source,
        }
    }

    /// The innermost error, looking through [`SyncError::StepFailed`].
    #[must_use]
    pub fn root_cause(&self) -> &SyncError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the step that failed, if the error came from the pipeline.
    #[must_use]
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            Self::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message() {
        let err = SyncError::MissingInput {
            flag: "--sdk-version",
        };
        assert_eq!(err.to_string(), "--sdk-version not provided");
    }

    #[test]
    fn test_root_cause_unwraps_step() {
        let err = SyncError::StepFailed {
            step: "fetch",
            source: Box::new(SyncError::FetchTimeout { secs: 5 }),
        };
        assert_eq!(err.failed_step(), Some("fetch"));
        assert!(matches!(err.root_cause(), SyncError::FetchTimeout { secs: 5 }));
        assert!(err.to_string().starts_with("step 'fetch' failed"));
    }
}
