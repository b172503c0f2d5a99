//! End-to-end pipeline tests over a scripted fake page

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tagwatch_core::{
    Action, ActionDriver, Annotator, Callout, CapturedVariable, Checkpoint, ConsentState,
    DataLayerEntry, FiredTag, MonitorError, PreviewPage, Report, Result, Session,
    SessionConfig, TagSnapshot, CHECKPOINTS_FILENAME,
};

/// A page whose observations are fixed. Captures start failing once
/// `fail_after` screenshots were taken, when a limit is set.
struct FakePage {
    screenshots: AtomicUsize,
    fail_after: Option<usize>,
}

impl FakePage {
    fn healthy() -> Self {
        Self { screenshots: AtomicUsize::new(0), fail_after: None }
    }

    fn failing_after(n: usize) -> Self {
        Self { screenshots: AtomicUsize::new(0), fail_after: Some(n) }
    }
}

#[async_trait]
impl PreviewPage for FakePage {
    async fn capture_tags(&self) -> Result<TagSnapshot> {
        Ok(TagSnapshot {
            fired: vec![FiredTag {
                name: "GA4 - Page View".into(),
                tag_type: Some("GA4 Event".into()),
                trigger: Some("All Pages".into()),
                bounding_box: None,
            }],
            not_fired: Vec::new(),
        })
    }

    async fn capture_variables(&self) -> Result<BTreeMap<String, CapturedVariable>> {
        let mut variables = BTreeMap::new();
        variables.insert(
            "txn_id".to_string(),
            CapturedVariable { value: Some("A123".into()), bounding_box: None },
        );
        Ok(variables)
    }

    async fn capture_consent(&self) -> Result<BTreeMap<String, ConsentState>> {
        let mut consent = BTreeMap::new();
        consent.insert("analytics_storage".to_string(), ConsentState::Granted);
        Ok(consent)
    }

    async fn capture_datalayer(&self) -> Result<Vec<DataLayerEntry>> {
        Ok(vec![DataLayerEntry {
            index: 0,
            event: Some("page_view".into()),
            data: serde_json::json!({"event": "page_view"}),
            timestamp: None,
        }])
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let taken = self.screenshots.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if taken >= limit {
                return Err(MonitorError::Capture("page went away".into()));
            }
        }
        std::fs::write(path, b"png-bytes")?;
        Ok(())
    }
}

struct RecordingDriver {
    performed: AtomicUsize,
}

#[async_trait]
impl ActionDriver for RecordingDriver {
    async fn perform(&self, _action: &Action) -> Result<()> {
        self.performed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct CopyAnnotator;

impl Annotator for CopyAnnotator {
    fn annotate(&self, screenshot: &Path, _callouts: &[Callout]) -> Result<PathBuf> {
        let annotated = screenshot.with_extension("annotated.png");
        std::fs::copy(screenshot, &annotated)?;
        Ok(annotated)
    }
}

fn config(output_dir: &Path) -> SessionConfig {
    let yaml = format!(
        r##"
container_id: GTM-ABC1234
target_url: https://shop.example.com
output_dir: {}
expectations:
  tags:
    - GA4 - Page View
  events:
    - page_view
  variables:
    - name: txn_id
      value: "*"
  consent:
    - signal: analytics_storage
      state: granted
actions:
  - type: wait
    duration_ms: 100
  - type: capture
    name: page_load
  - type: click
    selector: "#add-to-cart"
  - type: capture
    name: add_to_cart
"##,
        output_dir.display()
    );
    SessionConfig::from_yaml(&yaml).unwrap()
}

#[tokio::test]
async fn full_session_produces_a_successful_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(config(dir.path()));
    let driver = RecordingDriver { performed: AtomicUsize::new(0) };

    session.run(&FakePage::healthy(), &driver, None).await.unwrap();

    assert_eq!(session.checkpoints().len(), 2);
    assert_eq!(driver.performed.load(Ordering::SeqCst), 2);

    let report = session.build_report().unwrap();
    assert_eq!(report.summary.total_captures, 2);
    assert_eq!(report.summary.validations_passed, 8);
    assert_eq!(report.summary.validations_failed, 0);
    assert!(report.summary.success);

    let paths = session.write_reports().unwrap();
    assert!(paths.json.exists());
    assert!(paths.markdown.exists());
}

#[tokio::test]
async fn capture_failure_keeps_prior_checkpoints_for_a_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(config(dir.path()));
    let driver = RecordingDriver { performed: AtomicUsize::new(0) };

    let err = session
        .run(&FakePage::failing_after(1), &driver, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::Capture(_)));

    // The first checkpoint survived, already validated.
    assert_eq!(session.checkpoints().len(), 1);
    assert!(session.checkpoints()[0].is_validated());

    let report = session.build_report().unwrap();
    assert_eq!(report.summary.total_captures, 1);
    assert!(report.summary.success);
}

#[tokio::test]
async fn annotator_output_lands_on_the_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        r#"
container_id: GTM-ABC1234
target_url: https://shop.example.com
output_dir: {}
expectations:
  tags:
    - GA4 - Page View
actions:
  - type: capture
    name: page_load
"#,
        dir.path().display()
    );
    let config = SessionConfig::from_yaml(&yaml).unwrap();
    let mut session = Session::new(config);
    let driver = RecordingDriver { performed: AtomicUsize::new(0) };

    session
        .run(&BoxedTagPage, &driver, Some(&CopyAnnotator))
        .await
        .unwrap();

    let checkpoint = &session.checkpoints()[0];
    let annotated = checkpoint.annotated.as_ref().expect("annotated path set");
    assert!(annotated.exists());
}

/// Like FakePage but the fired tag carries a bounding box, so the
/// annotation plan is non-empty.
struct BoxedTagPage;

#[async_trait]
impl PreviewPage for BoxedTagPage {
    async fn capture_tags(&self) -> Result<TagSnapshot> {
        Ok(TagSnapshot {
            fired: vec![FiredTag {
                name: "GA4 - Page View".into(),
                tag_type: None,
                trigger: None,
                bounding_box: Some(tagwatch_core::BoundingBox {
                    x: 10.0,
                    y: 40.0,
                    width: 200.0,
                    height: 24.0,
                }),
            }],
            not_fired: Vec::new(),
        })
    }

    async fn capture_variables(&self) -> Result<BTreeMap<String, CapturedVariable>> {
        Ok(BTreeMap::new())
    }

    async fn capture_consent(&self) -> Result<BTreeMap<String, ConsentState>> {
        Ok(BTreeMap::new())
    }

    async fn capture_datalayer(&self) -> Result<Vec<DataLayerEntry>> {
        Ok(Vec::new())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        std::fs::write(path, b"png-bytes")?;
        Ok(())
    }
}

#[tokio::test]
async fn persisted_checkpoints_rebuild_the_same_report() {
    let dir = tempfile::tempdir().unwrap();
    let session_config = config(dir.path());
    let mut session = Session::new(session_config.clone());
    let driver = RecordingDriver { performed: AtomicUsize::new(0) };

    session.run(&FakePage::healthy(), &driver, None).await.unwrap();
    let live_report = session.build_report().unwrap();

    let path = session.persist_checkpoints().unwrap();
    assert!(path.ends_with(CHECKPOINTS_FILENAME));

    let raw = std::fs::read_to_string(&path).unwrap();
    let restored: Vec<Checkpoint> = serde_json::from_str(&raw).unwrap();
    let rebuilt = Report::build(&session_config, &restored).unwrap();

    assert_eq!(rebuilt.to_json().unwrap(), live_report.to_json().unwrap());
    assert_eq!(rebuilt.to_markdown(), live_report.to_markdown());
}
