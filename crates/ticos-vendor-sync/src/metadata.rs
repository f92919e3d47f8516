//! Stamping the synced versions into `library.properties`.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::properties::{PropertiesDocument, SetOutcome};

/// The two fields a sync owns in the metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdate {
    /// Key holding the library version.
    pub version_key: String,
    /// New library version.
    pub version: String,
    /// Key holding the upstream tree URL.
    pub url_key: String,
    /// New tree URL.
    pub url: String,
}

/// Before/after values of the owned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataChange {
    /// Version before the update, if the key existed.
    pub previous_version: Option<String>,
    /// URL before the update, if the key existed.
    pub previous_url: Option<String>,
    /// Version now recorded.
    pub version: String,
    /// URL now recorded.
    pub url: String,
    /// Whether the file was rewritten.
    pub written: bool,
}

/// Set the version and URL fields of the properties file at `path`.
///
/// All other lines are preserved byte for byte. The file is only written
/// when a value actually changes.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, not UTF-8, or
/// cannot be written back.
pub async fn update_metadata(path: &Path, update: &MetadataUpdate) -> SyncResult<MetadataChange> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SyncError::io("read", path, e))?;
    let mut doc = PropertiesDocument::parse(&text);

    let previous_version = doc.get(&update.version_key).map(str::to_owned);
    let previous_url = doc.get(&update.url_key).map(str::to_owned);

    let properties_err = |source| SyncError::Properties {
        path: path.to_path_buf(),
        source,
    };
    let version_outcome = doc
        .set(&update.version_key, &update.version)
        .map_err(properties_err)?;
    let url_outcome = doc.set(&update.url_key, &update.url).map_err(properties_err)?;

    let written =
        version_outcome != SetOutcome::Unchanged || url_outcome != SetOutcome::Unchanged;
    if written {
        tokio::fs::write(path, doc.render())
            .await
            .map_err(|e| SyncError::io("write", path, e))?;
        info!(
            path = %path.display(),
            version = %update.version,
            url = %update.url,
            "updated library metadata"
        );
    } else {
        debug!(path = %path.display(), "library metadata already current");
    }

    Ok(MetadataChange {
        previous_version,
        previous_url,
        version: update.version.clone(),
        url: update.url.clone(),
        written,
    })
}
