//! Capture and action trait implementations for the Playwright session

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tagwatch_core::{
    Action, ActionDriver, CapturedVariable, ConsentState, DataLayerEntry, MonitorError,
    PreviewPage, Result, ScrollEdge, ScrollTarget, TagSnapshot,
};

use crate::driver::PlaywrightSession;
use crate::probes;
use crate::protocol::Command;

const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;

#[async_trait]
impl PreviewPage for PlaywrightSession {
    async fn capture_tags(&self) -> Result<TagSnapshot> {
        let raw = self.evaluate(probes::TAG_PROBE).await.map_err(MonitorError::from)?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn capture_variables(&self) -> Result<BTreeMap<String, CapturedVariable>> {
        let raw = self
            .evaluate(probes::VARIABLE_PROBE)
            .await
            .map_err(MonitorError::from)?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn capture_consent(&self) -> Result<BTreeMap<String, ConsentState>> {
        let raw = self
            .evaluate(probes::CONSENT_PROBE)
            .await
            .map_err(MonitorError::from)?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn capture_datalayer(&self) -> Result<Vec<DataLayerEntry>> {
        let raw = self
            .evaluate(probes::DATALAYER_PROBE)
            .await
            .map_err(MonitorError::from)?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.command(&Command::Screenshot { path: path.to_string_lossy().into_owned() })
            .await
            .map_err(MonitorError::from)?;
        Ok(())
    }
}

#[async_trait]
impl ActionDriver for PlaywrightSession {
    async fn perform(&self, action: &Action) -> Result<()> {
        let command = match action {
            Action::Navigate { url } => Command::Goto { url: url.clone() },
            Action::Click { selector, timeout_ms } => Command::Click {
                selector: selector.clone(),
                timeout_ms: timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            },
            Action::Fill { selector, value, timeout_ms } => Command::Fill {
                selector: selector.clone(),
                value: value.clone(),
                timeout_ms: timeout_ms.unwrap_or(DEFAULT_ACTION_TIMEOUT_MS),
            },
            Action::Scroll { target } => Command::Scroll {
                target: match target {
                    ScrollTarget::Pixels(y) => serde_json::json!(y),
                    ScrollTarget::Edge(ScrollEdge::Top) => serde_json::json!("top"),
                    ScrollTarget::Edge(ScrollEdge::Bottom) => serde_json::json!("bottom"),
                },
            },
            Action::Wait { selector, duration_ms } => {
                Command::Wait { selector: selector.clone(), ms: *duration_ms }
            }
            // Handled by the session runner, never forwarded here.
            Action::Capture { name } => {
                return Err(MonitorError::InvalidConfig(format!(
                    "capture action '{name}' reached the browser driver"
                )));
            }
        };

        self.command(&command).await.map_err(MonitorError::from)?;
        Ok(())
    }
}
