#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Sync engine that vendors the Ticos C SDK into an Arduino library.
//!
//! A run validates its two inputs, then executes a fixed pipeline:
//!
//! - [`FetchStep`]: shallow clone of the requested revision into a scratch
//!   directory, through a [`Fetcher`] ([`GitFetcher`] in production)
//! - [`SelectStep`]: `*.c`/`*.h` under the SDK subtree, minus test, sample
//!   and unsupported-backend files ([`FileSelector`])
//! - [`FlattenStep`]: clear the source directory and copy every selected
//!   file into it by name ([`flatten`])
//! - [`RewriteStep`]: collapse namespaced includes ([`IncludeRewriter`])
//! - [`CleanupStep`]: remove the scratch clone
//! - [`MetadataStep`]: record version and tree URL in `library.properties`
//!
//! The first failing step stops the run; partial state is left in place.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use ticos_vendor_config::Config;
//! use ticos_vendor_sync::{
//!     GitFetcher, SyncLayout, SyncOptions, SyncRequest, SyncSettings, run_sync,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let root = std::path::Path::new(".");
//! let config = Config::load(root, None)?.config;
//! let request = SyncRequest::new(Some("v1.2.0".into()), Some("2.3.0".into()))?;
//! let fetcher = GitFetcher::locate(
//!     config.upstream.repo_url.clone(),
//!     Duration::from_secs(config.upstream.clone_timeout_secs),
//! )?;
//! let report = run_sync(
//!     request,
//!     SyncLayout::resolve(root, &config.layout),
//!     SyncSettings::from_config(&config)?,
//!     Arc::new(fetcher),
//!     SyncOptions::default(),
//! )
//! .await?;
//! println!("copied {} files", report.copied.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fetch;
pub mod flatten;
pub mod metadata;
pub mod pipeline;
pub mod properties;
pub mod request;
pub mod rewrite;
pub mod select;

pub use error::{SyncError, SyncResult};
pub use fetch::{Fetcher, GitFetcher, prepare_scratch, remove_scratch};
pub use flatten::{FlattenOutcome, clear_directory, flatten};
pub use metadata::{MetadataChange, MetadataUpdate, update_metadata};
pub use pipeline::{
    CleanupStep, FetchStep, FlattenStep, MetadataStep, Pipeline, RewriteStep, SelectStep, Step,
    SyncContext, SyncOptions, SyncReport, SyncSettings, run_sync,
};
pub use properties::{PropertiesDocument, PropertiesError, SetOutcome};
pub use request::{SyncLayout, SyncRequest};
pub use rewrite::{IncludeRewriter, RewriteRules, RewriteSummary};
pub use select::{FileSelector, Selection, SelectionRules};
