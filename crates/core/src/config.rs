//! Declarative YAML session configuration

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::capture::ConsentState;
use crate::error::{MonitorError, Result};

static CONTAINER_ID_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^GTM-[A-Z0-9]{4,}$").expect("container id pattern compiles"));

/// A complete monitoring session parsed from YAML.
///
/// Immutable for the session's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Container identifier, e.g. `GTM-ABC1234`. Treated as opaque; a
    /// non-GTM shape only draws a warning from [`SessionConfig::validate`].
    pub container_id: String,

    /// URL the preview session debugs.
    pub target_url: String,

    /// Where screenshots, checkpoints, and reports land.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Expected outcomes every checkpoint is validated against.
    #[serde(default)]
    pub expectations: ExpectationSet,

    /// Scripted actions to perform, in order. `capture` actions record a
    /// checkpoint; the rest are handed to the browser layer.
    #[serde(default)]
    pub actions: Vec<Action>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./tagwatch_output")
}

/// The caller-declared ground truth a checkpoint is validated against.
///
/// Four independent collections, each optional; an absent collection means
/// no constraint on that dimension. `variables` and `consent` are sequences
/// rather than mappings so the declaration order is preserved; assertion
/// messages follow that order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectationSet {
    /// Tag names that must appear among the fired tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Event names that must appear in the dataLayer log.
    #[serde(default)]
    pub events: Vec<String>,

    /// Variable expectations, in declaration order.
    #[serde(default)]
    pub variables: Vec<VariableExpectation>,

    /// Consent expectations, in declaration order.
    #[serde(default)]
    pub consent: Vec<ConsentExpectation>,
}

impl ExpectationSet {
    /// Total number of expected items across all four dimensions. Equals
    /// the number of assertions a validation pass will produce.
    pub fn len(&self) -> usize {
        self.tags.len() + self.events.len() + self.variables.len() + self.consent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One expected variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableExpectation {
    pub name: String,
    pub value: ExpectedValue,
}

/// Expected value of a variable: a literal, or the `*` wildcard meaning
/// "must exist, value unconstrained".
///
/// The sentinel is the single character `*`, as in the expectation files
/// this tool consumes. A captured value that is literally `*` can therefore
/// not be asserted literally; see the validation tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExpectedValue {
    Any,
    Literal(String),
}

impl From<String> for ExpectedValue {
    fn from(raw: String) -> Self {
        if raw == "*" {
            ExpectedValue::Any
        } else {
            ExpectedValue::Literal(raw)
        }
    }
}

impl From<ExpectedValue> for String {
    fn from(value: ExpectedValue) -> Self {
        match value {
            ExpectedValue::Any => "*".to_string(),
            ExpectedValue::Literal(s) => s,
        }
    }
}

/// One expected consent signal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentExpectation {
    pub signal: String,
    pub state: ConsentState,
}

/// A single scripted action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Load a URL and wait for the network to settle.
    Navigate { url: String },

    /// Click an element.
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field.
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Scroll the page.
    Scroll {
        #[serde(default)]
        target: ScrollTarget,
    },

    /// Wait for a selector, or for a fixed amount of time.
    Wait {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },

    /// Record a checkpoint. `name` labels the capture in reports and in
    /// screenshot filenames; it need not be unique.
    Capture { name: String },
}

/// Scroll destination: a page edge or an absolute pixel offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollTarget {
    Pixels(i64),
    Edge(ScrollEdge),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEdge {
    Top,
    Bottom,
}

impl Default for ScrollTarget {
    fn default() -> Self {
        ScrollTarget::Edge(ScrollEdge::Bottom)
    }
}

impl SessionConfig {
    /// Parse a session config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MonitorError::from)
    }

    /// Parse a session config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load every session config under a directory.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut configs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            configs.push(Self::from_file(entry.path())?);
        }

        Ok(configs)
    }

    /// Check the config for problems a run would only hit mid-session.
    pub fn validate(&self) -> Result<()> {
        if self.container_id.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("container_id is empty".into()));
        }
        if !CONTAINER_ID_SHAPE.is_match(&self.container_id) {
            warn!(
                "Container id '{}' does not look like a GTM container id",
                self.container_id
            );
        }
        if self.target_url.trim().is_empty() {
            return Err(MonitorError::InvalidConfig("target_url is empty".into()));
        }
        for action in &self.actions {
            if let Action::Capture { name } = action {
                if name.trim().is_empty() {
                    return Err(MonitorError::InvalidConfig(
                        "capture action with an empty name".into(),
                    ));
                }
            }
        }
        for expectation in &self.expectations.consent {
            if expectation.signal.trim().is_empty() {
                return Err(MonitorError::InvalidConfig(
                    "consent expectation with an empty signal name".into(),
                ));
            }
        }
        Ok(())
    }

    /// Number of checkpoints a full run of this config records.
    pub fn capture_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::Capture { .. }))
            .count()
    }
}
