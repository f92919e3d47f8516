use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

struct NoopFetcher;

#[async_trait::async_trait]
impl Fetcher for NoopFetcher {
    async fn fetch(&self, _revision: &str, dest: &Path) -> SyncResult<()> {
        std::fs::create_dir_all(dest.join("sdk/src")).unwrap();
        std::fs::write(dest.join("sdk/src/ti_a.c"), "int a;\n").unwrap();
        Ok(())
    }

    fn describe(&self) -> String {
        "noop".to_owned()
    }
}

struct Counting(&'static str, Arc<AtomicUsize>);

#[async_trait::async_trait]
impl Step for Counting {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn run(&self, _ctx: &mut SyncContext) -> SyncResult<()> {
        self.1.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Failing;

#[async_trait::async_trait]
impl Step for Failing {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn run(&self, _ctx: &mut SyncContext) -> SyncResult<()> {
        Err(SyncError::FetchTimeout { secs: 1 })
    }
}

fn context(root: &Path) -> SyncContext {
    let config = Config::default();
    SyncContext::new(
        SyncRequest::new(Some("v1.2.0".into()), Some("2.3.0".into())).unwrap(),
        SyncLayout::resolve(root, &config.layout),
        SyncSettings::from_config(&config).unwrap(),
        Arc::new(NoopFetcher),
    )
}

#[test]
fn test_standard_order() {
    let pipeline = Pipeline::standard(&SyncOptions::default());
    assert_eq!(
        pipeline.step_names(),
        vec!["fetch", "select", "flatten", "rewrite", "cleanup", "metadata"]
    );
}

#[test]
fn test_dry_run_steps() {
    let pipeline = Pipeline::standard(&SyncOptions {
        dry_run: true,
        keep_scratch: false,
    });
    assert_eq!(pipeline.step_names(), vec!["fetch", "select", "cleanup"]);
}

#[test]
fn test_keep_scratch_skips_cleanup() {
    let pipeline = Pipeline::standard(&SyncOptions {
        dry_run: false,
        keep_scratch: true,
    });
    assert!(!pipeline.step_names().contains(&"cleanup"));
    assert_eq!(pipeline.step_names().last(), Some(&"metadata"));
}

#[tokio::test]
async fn test_run_stops_at_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));
    let pipeline = Pipeline::new(vec![
        Box::new(Counting("first", Arc::clone(&counter))),
        Box::new(Failing),
        Box::new(Counting("never", Arc::clone(&counter))),
    ]);

    let mut ctx = context(dir.path());
    let err = pipeline.run(&mut ctx).await.unwrap_err();
    assert_eq!(err.failed_step(), Some("failing"));
    assert!(matches!(err.root_cause(), SyncError::FetchTimeout { .. }));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.report.completed_steps, vec!["first"]);
}

#[tokio::test]
async fn test_select_without_fetch_reports_missing_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    let err = SelectStep.run(&mut ctx).await.unwrap_err();
    assert!(matches!(err, SyncError::ScratchMissing(_)));
}

#[tokio::test]
async fn test_flatten_without_selection_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    let err = FlattenStep.run(&mut ctx).await.unwrap_err();
    assert!(matches!(err, SyncError::ScratchMissing(_)));
    assert!(!dir.path().join("src").exists());
}

#[tokio::test]
async fn test_dry_run_leaves_library_untouched() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/old.c"), "old").unwrap();

    let ctx = context(dir.path());
    let report = run_sync(
        ctx.request,
        ctx.layout,
        ctx.settings,
        ctx.fetcher,
        SyncOptions {
            dry_run: true,
            keep_scratch: false,
        },
    )
    .await
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.selected, vec!["sdk/src/ti_a.c"]);
    assert!(report.copied.is_empty());
    assert!(report.scratch_removed);
    assert!(dir.path().join("src/old.c").exists());
    assert!(!dir.path().join("sdkrepo").exists());
}

#[tokio::test]
async fn test_empty_selection_is_an_error() {
    struct EmptyFetcher;

    #[async_trait::async_trait]
    impl Fetcher for EmptyFetcher {
        async fn fetch(&self, _revision: &str, dest: &Path) -> SyncResult<()> {
            std::fs::create_dir_all(dest.join("sdk/docs")).unwrap();
            std::fs::write(dest.join("sdk/docs/README.md"), "docs").unwrap();
            Ok(())
        }

        fn describe(&self) -> String {
            "empty".to_owned()
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(dir.path());
    ctx.fetcher = Arc::new(EmptyFetcher);
    let err = Pipeline::standard(&SyncOptions::default())
        .run(&mut ctx)
        .await
        .unwrap_err();
    assert_eq!(err.failed_step(), Some("select"));
    assert!(matches!(err.root_cause(), SyncError::EmptySelection(_)));
}
