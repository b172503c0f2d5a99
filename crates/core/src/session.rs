//! Session orchestration: scripted actions around checkpoint captures

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::annotate::{annotation_plan, Annotator};
use crate::capture::PreviewPage;
use crate::checkpoint::{Checkpoint, CheckpointRecorder};
use crate::config::{Action, SessionConfig};
use crate::error::Result;
use crate::report::{Report, ReportPaths};
use crate::validate::validate;

/// Fixed filename of the raw checkpoint sequence inside the output
/// location. Lets reports be rebuilt offline.
pub const CHECKPOINTS_FILENAME: &str = "checkpoints.json";

/// Performs the scripted non-capture actions. The pipeline does not
/// interpret action semantics beyond sequencing checkpoints around them.
#[async_trait]
pub trait ActionDriver: Send + Sync {
    async fn perform(&self, action: &Action) -> Result<()>;
}

/// One monitoring session: a config, a recorder, and the append-only
/// checkpoint sequence.
pub struct Session {
    config: SessionConfig,
    recorder: CheckpointRecorder,
    checkpoints: Vec<Checkpoint>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let recorder = CheckpointRecorder::new(&config.output_dir);
        Self { config, recorder, checkpoints: Vec::new() }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Checkpoints recorded so far, in capture order.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Walk the scripted actions in order. `capture` actions record,
    /// validate, and annotate a checkpoint; everything else goes to the
    /// driver.
    ///
    /// The first failure aborts the remaining actions, but checkpoints
    /// recorded (and validated) before it stay intact, so the caller can
    /// still build a partial report.
    pub async fn run(
        &mut self,
        page: &dyn PreviewPage,
        driver: &dyn ActionDriver,
        annotator: Option<&dyn Annotator>,
    ) -> Result<()> {
        info!(
            "Starting monitoring session for {} against {}",
            self.config.container_id, self.config.target_url
        );

        let actions = self.config.actions.clone();
        for action in &actions {
            match action {
                Action::Capture { name } => self.capture(page, annotator, name).await?,
                other => driver.perform(other).await?,
            }
        }

        info!(
            "Session complete: {} checkpoint(s) recorded",
            self.checkpoints.len()
        );
        Ok(())
    }

    async fn capture(
        &mut self,
        page: &dyn PreviewPage,
        annotator: Option<&dyn Annotator>,
        label: &str,
    ) -> Result<()> {
        let mut checkpoint = self.recorder.record(page, label).await?;
        validate(&mut checkpoint, &self.config.expectations)?;

        if let Some(annotator) = annotator {
            let plan = annotation_plan(&checkpoint, &self.config.expectations);
            if !plan.is_empty() {
                match annotator.annotate(&checkpoint.screenshot, &plan) {
                    Ok(path) => checkpoint.annotated = Some(path),
                    // Advisory: a failed render never aborts the session.
                    Err(e) => warn!("Annotation failed for '{}': {}", label, e),
                }
            }
        }

        if let Some(validation) = &checkpoint.validation {
            info!(
                "Checkpoint '{}': {} passed, {} failed",
                label,
                validation.passed.len(),
                validation.failed.len()
            );
        }

        self.checkpoints.push(checkpoint);
        Ok(())
    }

    /// Aggregate the recorded checkpoints into a report.
    pub fn build_report(&self) -> Result<Report> {
        Report::build(&self.config, &self.checkpoints)
    }

    /// Build the report and persist both renderings to the output location.
    pub fn write_reports(&self) -> Result<ReportPaths> {
        self.build_report()?.write(&self.config.output_dir)
    }

    /// Persist the raw checkpoint sequence for offline report rebuilds.
    pub fn persist_checkpoints(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(CHECKPOINTS_FILENAME);
        std::fs::write(&path, serde_json::to_string_pretty(&self.checkpoints)?)?;
        Ok(path)
    }
}
