//! The ordered sync pipeline.
//!
//! A run is a fixed list of [`Step`]s sharing one [`SyncContext`]. Steps run
//! strictly one after another; the first failure stops the run and is
//! returned wrapped in [`SyncError::StepFailed`]. Nothing is rolled back.

mod steps;

use std::sync::Arc;

use serde::Serialize;
use ticos_vendor_config::{Config, UpstreamSection};
use tracing::{Instrument, info, info_span};

use crate::error::{SyncError, SyncResult};
use crate::fetch::Fetcher;
use crate::metadata::MetadataChange;
use crate::request::{SyncLayout, SyncRequest};
use crate::rewrite::{IncludeRewriter, RewriteRules};
use crate::select::{FileSelector, Selection, SelectionRules};

pub use steps::{CleanupStep, FetchStep, FlattenStep, MetadataStep, RewriteStep, SelectStep};

/// Switches that change which steps run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Fetch and select only; leave the destination and metadata alone.
    pub dry_run: bool,
    /// Leave the scratch clone on disk after the run.
    pub keep_scratch: bool,
}

/// Compiled rules derived from the configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// File selection.
    pub selector: FileSelector,
    /// Include rewriting.
    pub rewriter: IncludeRewriter,
    /// Upstream repository settings (tree URL template).
    pub upstream: UpstreamSection,
    /// Metadata key receiving the library version.
    pub version_key: String,
    /// Metadata key receiving the tree URL.
    pub url_key: String,
}

impl SyncSettings {
    /// Compile the selection and rewrite rules of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRule`] if a rule cannot be compiled.
    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Ok(Self {
            selector: FileSelector::new(&SelectionRules::from(&config.selection))?,
            rewriter: IncludeRewriter::new(&RewriteRules::from(&config.rewrite))?,
            upstream: config.upstream.clone(),
            version_key: config.metadata.version_key.clone(),
            url_key: config.metadata.url_key.clone(),
        })
    }
}

/// What a run did, filled in step by step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Upstream revision synced.
    pub sdk_version: String,
    /// Library version recorded.
    pub lib_version: String,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Selected paths relative to the clone root.
    pub selected: Vec<String>,
    /// Destination entries removed before copying.
    pub removed: Vec<String>,
    /// File names copied into the destination.
    pub copied: Vec<String>,
    /// File names whose includes were rewritten.
    pub rewritten: Vec<String>,
    /// Headers that did not exist in the destination before this run.
    pub added_headers: Vec<String>,
    /// Metadata values before and after the update.
    pub metadata: Option<MetadataChange>,
    /// Whether the scratch clone was deleted.
    pub scratch_removed: bool,
    /// Steps that finished, in order.
    pub completed_steps: Vec<&'static str>,
}

/// State shared by the steps of one run.
pub struct SyncContext {
    /// Validated inputs.
    pub request: SyncRequest,
    /// Absolute paths.
    pub layout: SyncLayout,
    /// Compiled rules.
    pub settings: SyncSettings,
    /// Snapshot source.
    pub fetcher: Arc<dyn Fetcher>,
    /// Set by [`SelectStep`].
    pub selection: Option<Selection>,
    /// Accumulated results.
    pub report: SyncReport,
}

impl SyncContext {
    /// Create a context for a run that has not started yet.
    #[must_use]
    pub fn new(
        request: SyncRequest,
        layout: SyncLayout,
        settings: SyncSettings,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let report = SyncReport {
            sdk_version: request.sdk_version.clone(),
            lib_version: request.lib_version.clone(),
            ..SyncReport::default()
        };
        Self {
            request,
            layout,
            settings,
            fetcher,
            selection: None,
            report,
        }
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("request", &self.request)
            .field("layout", &self.layout)
            .field("fetcher", &self.fetcher.describe())
            .field("selection", &self.selection.as_ref().map(Selection::len))
            .finish_non_exhaustive()
    }
}

/// One stage of the pipeline.
#[async_trait::async_trait]
pub trait Step: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Run the step against the shared context.
    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()>;
}

/// An ordered list of steps.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    /// Build a pipeline from explicit steps.
    #[must_use]
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    /// The regular run: fetch, select, flatten, rewrite, cleanup, metadata.
    ///
    /// A dry run stops after selection. `keep_scratch` drops the cleanup.
    #[must_use]
    pub fn standard(options: &SyncOptions) -> Self {
        let mut steps: Vec<Box<dyn Step>> = vec![Box::new(FetchStep), Box::new(SelectStep)];
        if !options.dry_run {
            steps.push(Box::new(FlattenStep));
            steps.push(Box::new(RewriteStep));
        }
        if !options.keep_scratch {
            steps.push(Box::new(CleanupStep));
        }
        if !options.dry_run {
            steps.push(Box::new(MetadataStep));
        }
        Self { steps }
    }

    /// Step names in execution order.
    #[must_use]
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StepFailed`] naming the step that failed.
    pub async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        for step in &self.steps {
            let name = step.name();
            let span = info_span!("sync_step", step = name);
            async {
                info!("starting");
                step.run(&mut *ctx).await?;
                info!("finished");
                Ok::<(), SyncError>(())
            }
            .instrument(span)
            .await
            .map_err(|e| SyncError::StepFailed {
                step: name,
                source: Box::new(e),
            })?;
            ctx.report.completed_steps.push(name);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

/// Run the standard pipeline for an already validated request.
///
/// # Errors
///
/// Returns the first step failure; see [`Pipeline::run`].
pub async fn run_sync(
    request: SyncRequest,
    layout: SyncLayout,
    settings: SyncSettings,
    fetcher: Arc<dyn Fetcher>,
    options: SyncOptions,
) -> SyncResult<SyncReport> {
    let mut ctx = SyncContext::new(request, layout, settings, fetcher);
    ctx.report.dry_run = options.dry_run;
    Pipeline::standard(&options).run(&mut ctx).await?;
    Ok(ctx.report)
}

#[cfg(test)]
mod tests;
