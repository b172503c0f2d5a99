//! Report aggregation and its two renderings
//!
//! A [`Report`] is a derived, read-only view over a session's validated
//! checkpoint sequence. Building one is a pure function of (config,
//! checkpoints); rendering JSON or Markdown from it is a pure function of
//! the report, so rebuilding from the same inputs is byte-identical.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capture::ConsentState;
use crate::checkpoint::{Checkpoint, ValidationOutcome};
use crate::config::SessionConfig;
use crate::error::{MonitorError, Result};

/// Fixed filename of the structured rendering inside the output location.
pub const JSON_REPORT_FILENAME: &str = "monitoring_report.json";

/// Fixed filename of the narrative rendering inside the output location.
pub const MARKDOWN_REPORT_FILENAME: &str = "monitoring_report.md";

/// Session-level counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub container_id: String,
    pub target_url: String,

    /// Timestamp of the first checkpoint. Derived from the input, never
    /// the wall clock, so rebuilding a report stays idempotent.
    pub started_at: Option<DateTime<Utc>>,

    /// Timestamp of the last checkpoint.
    pub finished_at: Option<DateTime<Utc>>,

    pub total_captures: usize,
    pub validations_passed: usize,
    pub validations_failed: usize,

    /// True exactly when no assertion failed anywhere in the session.
    pub success: bool,
}

/// Screenshot references for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotRefs {
    pub original: PathBuf,
    pub annotated: Option<PathBuf>,
}

/// Flattened projection of one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub screenshots: ScreenshotRefs,
    pub tags_fired: Vec<String>,
    pub tags_not_fired: Vec<String>,
    pub consent: BTreeMap<String, ConsentState>,
    pub datalayer_events: Vec<String>,
    pub validations: ValidationOutcome,
}

/// The complete monitoring report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ReportSummary,
    pub captures: Vec<CaptureReport>,
}

/// Where [`Report::write`] persisted the two renderings.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

impl Report {
    /// Aggregate a validated checkpoint sequence into a report.
    ///
    /// Every checkpoint must already be validated; an unvalidated one is a
    /// usage error. Zero checkpoints aggregate to zero totals and a
    /// vacuously true success flag.
    pub fn build(config: &SessionConfig, checkpoints: &[Checkpoint]) -> Result<Self> {
        let mut captures = Vec::with_capacity(checkpoints.len());
        let mut validations_passed = 0;
        let mut validations_failed = 0;

        for checkpoint in checkpoints {
            let Some(validation) = &checkpoint.validation else {
                return Err(MonitorError::NotValidated(checkpoint.event_label.clone()));
            };
            validations_passed += validation.passed.len();
            validations_failed += validation.failed.len();

            captures.push(CaptureReport {
                event: checkpoint.event_label.clone(),
                timestamp: checkpoint.timestamp,
                screenshots: ScreenshotRefs {
                    original: checkpoint.screenshot.clone(),
                    annotated: checkpoint.annotated.clone(),
                },
                tags_fired: checkpoint.fired_tag_names().into_iter().map(String::from).collect(),
                tags_not_fired: checkpoint
                    .tags_not_fired
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
                consent: checkpoint.consent.clone(),
                datalayer_events: checkpoint
                    .event_names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
                validations: validation.clone(),
            });
        }

        Ok(Report {
            summary: ReportSummary {
                container_id: config.container_id.clone(),
                target_url: config.target_url.clone(),
                started_at: checkpoints.first().map(|c| c.timestamp),
                finished_at: checkpoints.last().map(|c| c.timestamp),
                total_captures: checkpoints.len(),
                validations_passed,
                validations_failed,
                success: validations_failed == 0,
            },
            captures,
        })
    }

    /// Structured rendering: pretty-printed JSON with stable key order.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Narrative rendering: a linear Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let summary = &self.summary;

        let _ = writeln!(md, "# Tag Monitoring Report");
        let _ = writeln!(md);
        let _ = writeln!(md, "**Container:** {}", summary.container_id);
        let _ = writeln!(md, "**URL:** {}", summary.target_url);
        if let Some(finished) = summary.finished_at {
            let _ = writeln!(md, "**Finished:** {}", finished.to_rfc3339());
        }
        let _ = writeln!(md);
        let _ = writeln!(md, "## Summary");
        let _ = writeln!(md);
        let _ = writeln!(md, "| Metric | Value |");
        let _ = writeln!(md, "|--------|-------|");
        let _ = writeln!(md, "| Captures | {} |", summary.total_captures);
        let _ = writeln!(md, "| Validations Passed | {} |", summary.validations_passed);
        let _ = writeln!(md, "| Validations Failed | {} |", summary.validations_failed);
        let _ = writeln!(
            md,
            "| Overall Status | {} |",
            if summary.success { "✅ PASSED" } else { "❌ FAILED" }
        );
        let _ = writeln!(md);

        for (i, capture) in self.captures.iter().enumerate() {
            let _ = writeln!(md, "## Capture {}: {}", i + 1, capture.event);
            let _ = writeln!(md);
            let _ = writeln!(md, "**Timestamp:** {}", capture.timestamp.to_rfc3339());
            let _ = writeln!(md);
            let _ = writeln!(md, "### Tags Fired");
            let _ = writeln!(md);
            if capture.tags_fired.is_empty() {
                let _ = writeln!(md, "- (none)");
            } else {
                for tag in &capture.tags_fired {
                    let _ = writeln!(md, "- ✅ {tag}");
                }
            }
            let _ = writeln!(md);
            let _ = writeln!(md, "### Consent State");
            let _ = writeln!(md);
            for (signal, state) in &capture.consent {
                let _ = writeln!(md, "- {} {}: {}", state.glyph(), signal, state);
            }
            let _ = writeln!(md);
            let _ = writeln!(md, "### dataLayer Events");
            let _ = writeln!(md);
            if capture.datalayer_events.is_empty() {
                let _ = writeln!(md, "- (none)");
            } else {
                for event in &capture.datalayer_events {
                    let _ = writeln!(md, "- {event}");
                }
            }
            let _ = writeln!(md);
            let _ = writeln!(md, "### Validation Results");
            let _ = writeln!(md);
            for passed in &capture.validations.passed {
                let _ = writeln!(md, "- ✅ {passed}");
            }
            for failed in &capture.validations.failed {
                let _ = writeln!(md, "- ❌ {failed}");
            }
            if let Some(annotated) = &capture.screenshots.annotated {
                let _ = writeln!(md);
                let _ = writeln!(md, "### Screenshot");
                let _ = writeln!(md);
                let _ = writeln!(md, "![Annotated Screenshot]({})", annotated.display());
            }
            let _ = writeln!(md);
        }

        md
    }

    /// Persist both renderings under their fixed filenames.
    ///
    /// This is the only I/O the aggregator performs.
    pub fn write(&self, output_dir: &Path) -> Result<ReportPaths> {
        std::fs::create_dir_all(output_dir)?;

        let json_path = output_dir.join(JSON_REPORT_FILENAME);
        std::fs::write(&json_path, self.to_json()?)?;

        let markdown_path = output_dir.join(MARKDOWN_REPORT_FILENAME);
        std::fs::write(&markdown_path, self.to_markdown())?;

        info!(
            "Reports written to {} and {}",
            json_path.display(),
            markdown_path.display()
        );

        Ok(ReportPaths { json: json_path, markdown: markdown_path })
    }
}
