//! Observation data model and the capture capability boundary
//!
//! A preview session is monitored across four independent dimensions: tag
//! firing status, resolved variable values, consent-signal state, and the
//! pushed dataLayer event log. The browser layer produces raw observations
//! through the [`PreviewPage`] trait; everything in this module is plain
//! data the rest of the pipeline consumes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Consent signals every capture reports on, whether or not the page ever
/// set them. Signals the page never mentioned default to `unknown`.
pub const KNOWN_CONSENT_SIGNALS: [&str; 7] = [
    "analytics_storage",
    "ad_storage",
    "ad_user_data",
    "ad_personalization",
    "functionality_storage",
    "personalization_storage",
    "security_storage",
];

/// Screen rectangle of a preview-panel element, in CSS pixels.
///
/// Advisory data for the annotation renderer. Validation never requires it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Center of the rectangle, rounded to whole pixels.
    pub fn center(&self) -> (i64, i64) {
        (
            (self.x + self.width / 2.0).round() as i64,
            (self.y + self.height / 2.0).round() as i64,
        )
    }
}

/// A tag the preview panel reports as fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiredTag {
    pub name: String,

    /// Tag template type as shown in the panel (e.g. "GA4 Event").
    #[serde(rename = "type", default)]
    pub tag_type: Option<String>,

    /// Name of the trigger that fired the tag.
    #[serde(default)]
    pub trigger: Option<String>,

    #[serde(rename = "boundingBox", default)]
    pub bounding_box: Option<BoundingBox>,
}

/// A tag the preview panel reports as not fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTag {
    pub name: String,

    /// Blocking reason as shown in the panel.
    #[serde(default)]
    pub reason: Option<String>,

    #[serde(rename = "boundingBox", default)]
    pub bounding_box: Option<BoundingBox>,
}

/// Tag firing status scraped from the preview panel in one read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagSnapshot {
    #[serde(default)]
    pub fired: Vec<FiredTag>,

    #[serde(rename = "notFired", default)]
    pub not_fired: Vec<BlockedTag>,
}

/// A variable value resolved at capture time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedVariable {
    /// Resolved value as displayed by the panel. Absent when the panel
    /// shows the variable without a value.
    #[serde(default)]
    pub value: Option<String>,

    #[serde(rename = "boundingBox", default)]
    pub bounding_box: Option<BoundingBox>,
}

/// State of one consent signal.
///
/// Anything the page reports outside the closed set maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsentState {
    Granted,
    Denied,
    #[default]
    Unknown,
}

impl From<String> for ConsentState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "granted" => ConsentState::Granted,
            "denied" => ConsentState::Denied,
            _ => ConsentState::Unknown,
        }
    }
}

impl From<ConsentState> for String {
    fn from(state: ConsentState) -> Self {
        state.as_str().to_string()
    }
}

impl ConsentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentState::Granted => "granted",
            ConsentState::Denied => "denied",
            ConsentState::Unknown => "unknown",
        }
    }

    /// Status glyph used in the narrative report.
    pub fn glyph(&self) -> &'static str {
        match self {
            ConsentState::Granted => "✅",
            ConsentState::Denied => "❌",
            ConsentState::Unknown => "⚠️",
        }
    }
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the page's dataLayer at capture time.
///
/// The payload is an opaque bag of key/value pairs: the pipeline only ever
/// reads the `event` field by name and passes the rest through untouched
/// into reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataLayerEntry {
    /// Position in the dataLayer array.
    pub index: usize,

    /// Event name, when the entry pushed one.
    #[serde(default)]
    pub event: Option<String>,

    /// Full entry payload, untyped.
    #[serde(default)]
    pub data: serde_json::Value,

    /// When the entry was observed.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One live preview page: the observation capture adapter plus the
/// screenshot capability.
///
/// The four captures are independent reads with no side effects on each
/// other and may run in any order. Every method failure is an infrastructure
/// error (surfaced as [`MonitorError::Capture`](crate::MonitorError::Capture)
/// by implementations), never a validation outcome.
#[async_trait]
pub trait PreviewPage: Send + Sync {
    /// Fired and not-fired tags as currently shown by the preview panel.
    async fn capture_tags(&self) -> Result<TagSnapshot>;

    /// Resolved variable values, keyed by variable name.
    async fn capture_variables(&self) -> Result<BTreeMap<String, CapturedVariable>>;

    /// Consent-signal states. Implementations report the full known signal
    /// set, defaulting to `unknown`; the recorder re-normalizes regardless.
    async fn capture_consent(&self) -> Result<BTreeMap<String, ConsentState>>;

    /// The full dataLayer event log, in push order.
    async fn capture_datalayer(&self) -> Result<Vec<DataLayerEntry>>;

    /// Write a viewport screenshot to `path`.
    async fn screenshot(&self, path: &Path) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_center_rounds_to_pixels() {
        let bb = BoundingBox { x: 10.0, y: 20.0, width: 5.0, height: 9.0 };
        assert_eq!(bb.center(), (13, 25));
    }

    #[test]
    fn consent_state_parses_known_strings() {
        let state: ConsentState = serde_json::from_str("\"granted\"").unwrap();
        assert_eq!(state, ConsentState::Granted);
    }

    #[test]
    fn consent_state_unknown_catches_unexpected_strings() {
        let state: ConsentState = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(state, ConsentState::Unknown);
    }

    #[test]
    fn fired_tag_parses_probe_shape() {
        let json = r#"{
            "name": "GA4 - Page View",
            "type": "GA4 Event",
            "trigger": "All Pages",
            "boundingBox": {"x": 10.0, "y": 40.0, "width": 200.0, "height": 24.0}
        }"#;
        let tag: FiredTag = serde_json::from_str(json).unwrap();
        assert_eq!(tag.name, "GA4 - Page View");
        assert_eq!(tag.tag_type.as_deref(), Some("GA4 Event"));
        assert!(tag.bounding_box.is_some());
    }

    #[test]
    fn datalayer_entry_keeps_payload_opaque() {
        let json = r#"{"index": 2, "event": "purchase", "data": {"value": 9.99, "items": []}}"#;
        let entry: DataLayerEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.event.as_deref(), Some("purchase"));
        assert_eq!(entry.data["value"], 9.99);
        assert!(entry.timestamp.is_none());
    }
}
