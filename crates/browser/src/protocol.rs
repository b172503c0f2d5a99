//! JSON line protocol spoken with the node driver process
//!
//! One command per line on the driver's stdin, one response per line on its
//! stdout, strictly request/response. The driver announces itself with a
//! `ready` event line before accepting commands.

use serde::{Deserialize, Serialize};

/// A command sent to the driver.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Load a URL and wait for the network to settle.
    Goto { url: String },

    Click { selector: String, timeout_ms: u64 },

    Fill { selector: String, value: String, timeout_ms: u64 },

    /// Scroll to `"top"`, `"bottom"`, or an absolute pixel offset.
    Scroll { target: serde_json::Value },

    Wait {
        #[serde(skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        ms: Option<u64>,
    },

    /// Evaluate a function expression in the page and return its value.
    Evaluate { script: String },

    Screenshot { path: String },

    Close,
}

/// A response line from the driver.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub ok: bool,

    /// Payload of an `evaluate` command.
    #[serde(default)]
    pub result: serde_json::Value,

    #[serde(default)]
    pub error: Option<String>,

    /// Out-of-band event name; only `ready` is emitted today.
    #[serde(default)]
    pub event: Option<String>,
}

impl Response {
    pub fn is_ready(&self) -> bool {
        self.ok && self.event.as_deref() == Some("ready")
    }
}
