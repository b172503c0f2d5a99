//! Checkpoint record and the capture-cycle recorder

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::capture::{
    BlockedTag, CapturedVariable, ConsentState, DataLayerEntry, FiredTag, PreviewPage,
    KNOWN_CONSENT_SIGNALS,
};
use crate::error::{MonitorError, Result};

static NON_SLUG_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern compiles"));

/// Validation outcome attached to a checkpoint: the append-only passed and
/// failed assertion messages, populated exactly once by the validation
/// engine and never mutated afterward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

/// One discrete capture of all four monitored dimensions at a point in a
/// scripted session.
///
/// A checkpoint owns all of its nested structures exclusively; no two
/// checkpoints share mutable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Creation instant, UTC.
    pub timestamp: DateTime<Utc>,

    /// Caller-supplied label identifying what triggered this capture.
    pub event_label: String,

    /// Viewport screenshot taken at the start of the capture cycle.
    pub screenshot: PathBuf,

    /// Integrity hash of the screenshot file. Advisory; absent when the
    /// file could not be read back.
    #[serde(default)]
    pub screenshot_sha256: Option<String>,

    /// Annotated copy of the screenshot, populated later by the renderer.
    #[serde(default)]
    pub annotated: Option<PathBuf>,

    pub tags_fired: Vec<FiredTag>,
    pub tags_not_fired: Vec<BlockedTag>,
    pub variables: BTreeMap<String, CapturedVariable>,

    /// Consent states, normalized to cover the full known signal set.
    pub consent: BTreeMap<String, ConsentState>,

    /// The dataLayer event log, in push order.
    pub datalayer: Vec<DataLayerEntry>,

    /// `None` until the validation engine has processed this checkpoint.
    #[serde(default)]
    pub validation: Option<ValidationOutcome>,
}

impl Checkpoint {
    pub fn is_validated(&self) -> bool {
        self.validation.is_some()
    }

    /// Names of the tags that fired.
    pub fn fired_tag_names(&self) -> Vec<&str> {
        self.tags_fired.iter().map(|t| t.name.as_str()).collect()
    }

    /// Event names present in the dataLayer log, in push order.
    pub fn event_names(&self) -> Vec<&str> {
        self.datalayer
            .iter()
            .filter_map(|e| e.event.as_deref())
            .collect()
    }
}

/// Orchestrates one capture cycle per [`record`](CheckpointRecorder::record)
/// call: screenshot first, then the four observations, then a fully
/// populated, unvalidated [`Checkpoint`].
///
/// The screenshot counter is a field of the recorder, not process-wide
/// state, so sessions running in the same process never collide.
#[derive(Debug)]
pub struct CheckpointRecorder {
    output_dir: PathBuf,
    screenshot_count: u32,
}

impl CheckpointRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), screenshot_count: 0 }
    }

    /// Record one checkpoint.
    ///
    /// If the screenshot or any observation fails, the error propagates and
    /// no partial checkpoint is produced. The sequence number is consumed
    /// either way, so filenames stay monotonic across retries.
    pub async fn record(
        &mut self,
        page: &dyn PreviewPage,
        event_label: &str,
    ) -> Result<Checkpoint> {
        if event_label.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("capture label is empty".into()));
        }

        std::fs::create_dir_all(&self.output_dir)?;

        self.screenshot_count += 1;
        let filename = format!("{:03}_{}.png", self.screenshot_count, slug(event_label));
        let screenshot = self.output_dir.join(filename);

        debug!("Recording checkpoint '{}' -> {}", event_label, screenshot.display());

        page.screenshot(&screenshot).await?;
        let screenshot_sha256 = match hash_file(&screenshot) {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!("Could not hash screenshot {}: {}", screenshot.display(), e);
                None
            }
        };

        let tags = page.capture_tags().await?;
        let variables = page.capture_variables().await?;
        let mut consent = page.capture_consent().await?;
        let datalayer = page.capture_datalayer().await?;

        for signal in KNOWN_CONSENT_SIGNALS {
            consent.entry(signal.to_string()).or_default();
        }

        Ok(Checkpoint {
            timestamp: Utc::now(),
            event_label: event_label.to_string(),
            screenshot,
            screenshot_sha256,
            annotated: None,
            tags_fired: tags.fired,
            tags_not_fired: tags.not_fired,
            variables,
            consent,
            datalayer,
            validation: None,
        })
    }
}

/// Filename-safe slug of a capture label.
fn slug(label: &str) -> String {
    let lowered = label.trim().to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "capture".to_string()
    } else {
        slug.to_string()
    }
}

fn hash_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
