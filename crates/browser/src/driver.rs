//! Playwright driver process management
//!
//! Spawns a persistent node process running the embedded driver script and
//! speaks the JSON line protocol with it. One driver process per preview
//! session; the browser dies with the process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{BrowserError, BrowserResult};
use crate::probes::{self, DRIVER_JS};
use crate::protocol::{Command, Response};

/// Configuration for launching the driver.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Node binary to run the driver with.
    pub node_binary: PathBuf,

    pub headless: bool,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Per-command response timeout.
    pub command_timeout: Duration,

    /// How long to wait for the driver's ready handshake.
    pub startup_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            command_timeout: Duration::from_secs(30),
            startup_timeout: Duration::from_secs(60),
        }
    }
}

struct DriverIo {
    // Spawned with kill_on_drop, so the browser dies with the session.
    _child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
}

/// A live preview session backed by a Playwright chromium instance.
pub struct PlaywrightSession {
    io: Mutex<DriverIo>,
    command_timeout: Duration,

    // Keeps the driver script on disk for the process's lifetime.
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Spawn the driver and wait for its ready handshake.
    pub async fn launch(config: BrowserConfig) -> BrowserResult<Self> {
        Self::check_node_installed(&config)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_JS)?;

        info!(
            "Launching playwright driver ({}, {}x{})",
            if config.headless { "headless" } else { "headed" },
            config.viewport_width,
            config.viewport_height
        );

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .env("TAGWATCH_HEADLESS", if config.headless { "1" } else { "0" })
            .env(
                "TAGWATCH_VIEWPORT",
                format!("{}x{}", config.viewport_width, config.viewport_height),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Startup(format!("failed to spawn node: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BrowserError::Startup("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BrowserError::Startup("driver stdout unavailable".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        let ready = tokio::time::timeout(config.startup_timeout, lines.next_line())
            .await
            .map_err(|_| BrowserError::Startup("timed out waiting for ready".into()))?
            .map_err(BrowserError::Io)?
            .ok_or_else(|| BrowserError::Startup("driver exited before ready".into()))?;

        let response: Response = serde_json::from_str(&ready)
            .map_err(|e| BrowserError::Startup(format!("bad ready line '{ready}': {e}")))?;
        if !response.is_ready() {
            return Err(BrowserError::Startup(
                response.error.unwrap_or_else(|| "driver refused to start".into()),
            ));
        }

        debug!("Driver is ready");

        Ok(Self {
            io: Mutex::new(DriverIo { _child: child, stdin, lines }),
            command_timeout: config.command_timeout,
            _script_dir: script_dir,
        })
    }

    /// Check that node is on the path before paying the spawn cost.
    fn check_node_installed(config: &BrowserConfig) -> BrowserResult<()> {
        let status = std::process::Command::new(&config.node_binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) if s.success() => Ok(()),
            _ => Err(BrowserError::NodeNotFound),
        }
    }

    /// Send one command and wait for its response line.
    pub async fn command(&self, command: &Command) -> BrowserResult<serde_json::Value> {
        let mut io = self.io.lock().await;

        let line = serde_json::to_string(command)?;
        debug!("driver <- {}", line);
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        let reply = tokio::time::timeout(self.command_timeout, io.lines.next_line())
            .await
            .map_err(|_| BrowserError::Timeout)?
            .map_err(BrowserError::Io)?
            .ok_or_else(|| BrowserError::Protocol("driver closed its stdout".into()))?;

        let response: Response = serde_json::from_str(&reply)
            .map_err(|e| BrowserError::Protocol(format!("bad response '{reply}': {e}")))?;

        if response.ok {
            Ok(response.result)
        } else {
            Err(BrowserError::Command(
                response.error.unwrap_or_else(|| "unspecified driver error".into()),
            ))
        }
    }

    /// Evaluate a function expression in the page.
    pub async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value> {
        self.command(&Command::Evaluate { script: script.to_string() }).await
    }

    /// Open the Tag Assistant preview for a container and debug target.
    pub async fn open_preview(
        &self,
        container_id: &str,
        target_url: &str,
    ) -> BrowserResult<()> {
        let url = probes::preview_url(container_id, target_url);
        info!("Opening preview: {}", url);
        self.command(&Command::Goto { url }).await?;
        Ok(())
    }

    /// Ask the driver to close the browser and exit. Best effort; the
    /// process is killed on drop regardless.
    pub async fn close(&self) -> BrowserResult<()> {
        match self.command(&Command::Close).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Driver close was not clean: {}", e);
                Ok(())
            }
        }
    }
}
