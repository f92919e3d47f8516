use tracing::{debug, info};

use super::{Step, SyncContext};
use crate::error::{SyncError, SyncResult};
use crate::fetch::{prepare_scratch, remove_scratch};
use crate::flatten::flatten;
use crate::metadata::{MetadataUpdate, update_metadata};

/// Shallow-clone the requested revision into the scratch directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStep;

#[async_trait::async_trait]
impl Step for FetchStep {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let scratch = &ctx.layout.scratch_dir;
        prepare_scratch(scratch).await?;
        info!(
            source = %ctx.fetcher.describe(),
            revision = %ctx.request.sdk_version,
            dest = %scratch.display(),
            "fetching SDK"
        );
        ctx.fetcher.fetch(&ctx.request.sdk_version, scratch).await
    }
}

/// Pick the vendored files out of the clone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectStep;

#[async_trait::async_trait]
impl Step for SelectStep {
    fn name(&self) -> &'static str {
        "select"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let scratch = &ctx.layout.scratch_dir;
        if !scratch.is_dir() {
            return Err(SyncError::ScratchMissing(scratch.clone()));
        }

        let selection = ctx.settings.selector.select(scratch)?;
        if selection.is_empty() {
            return Err(SyncError::EmptySelection(scratch.clone()));
        }
        selection.check_collisions()?;

        info!(files = selection.len(), "selected SDK files");
        ctx.report.selected = selection.display_paths();
        ctx.selection = Some(selection);
        Ok(())
    }
}

/// Replace the destination with a flat copy of the selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenStep;

#[async_trait::async_trait]
impl Step for FlattenStep {
    fn name(&self) -> &'static str {
        "flatten"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let Some(selection) = ctx.selection.as_ref() else {
            return Err(SyncError::ScratchMissing(ctx.layout.scratch_dir.clone()));
        };

        let outcome = flatten(selection, &ctx.layout.source_dir).await?;
        info!(
            dest = %ctx.layout.source_dir.display(),
            removed = outcome.removed.len(),
            copied = outcome.copied.len(),
            "flattened sources"
        );

        ctx.report.added_headers = outcome.added_headers();
        ctx.report.removed = outcome.removed;
        ctx.report.copied = outcome.copied;
        Ok(())
    }
}

/// Collapse namespaced includes in the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteStep;

#[async_trait::async_trait]
impl Step for RewriteStep {
    fn name(&self) -> &'static str {
        "rewrite"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let summary = ctx
            .settings
            .rewriter
            .rewrite_directory(&ctx.layout.source_dir)
            .await?;
        info!(
            scanned = summary.scanned,
            rewritten = summary.rewritten.len(),
            "rewrote include paths"
        );
        ctx.report.rewritten = summary.rewritten;
        Ok(())
    }
}

/// Delete the scratch clone.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanupStep;

#[async_trait::async_trait]
impl Step for CleanupStep {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        remove_scratch(&ctx.layout.scratch_dir).await?;
        debug!(path = %ctx.layout.scratch_dir.display(), "removed scratch clone");
        ctx.report.scratch_removed = true;
        Ok(())
    }
}

/// Record the library version and tree URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataStep;

#[async_trait::async_trait]
impl Step for MetadataStep {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn run(&self, ctx: &mut SyncContext) -> SyncResult<()> {
        let update = MetadataUpdate {
            version_key: ctx.settings.version_key.clone(),
            version: ctx.request.lib_version.clone(),
            url_key: ctx.settings.url_key.clone(),
            url: ctx.settings.upstream.tree_url(&ctx.request.sdk_version),
        };
        let change = update_metadata(&ctx.layout.metadata_file, &update).await?;
        ctx.report.metadata = Some(change);
        Ok(())
    }
}
