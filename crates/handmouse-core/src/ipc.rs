//! Client for the tracking engine's control socket.
//!
//! The engine listens on a UNIX stream socket and serves one JSON request per
//! connection:
//!
//! ```text
//! → {"command": "set_asl", "value": true}
//! ← {"status": "ok", "asl_enabled": true}
//! ```
//!
//! Replies carry `"status": "ok"` or `"status": "error"` with a `message`;
//! `get_status` puts its readings under `data`. The engine closes the
//! connection after replying, so a reply is read to end of stream.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DEFAULT_SOCKET_PATH;
use crate::shortcut::EngineCommand;
use crate::telemetry::TelemetrySample;

#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("cannot reach the engine at {} after {attempts} attempt(s): {source}", path.display())]
    Connect {
        path: PathBuf,
        attempts: u32,
        source: std::io::Error,
    },
    #[error("engine socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed engine reply: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("engine rejected the request: {0}")]
    Engine(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One request to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            value: None,
        }
    }

    pub fn with_value(command: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            command: command.into(),
            value: Some(value.into()),
        }
    }
}

/// The engine's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Top-level keys besides the ones above (`asl_enabled`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// `Err(IpcError::Engine)` unless the status is `"ok"`.
    pub fn into_result(self) -> Result<Self, IpcError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(IpcError::Engine(
                self.message
                    .unwrap_or_else(|| format!("status '{}'", self.status)),
            ))
        }
    }

    /// Look `key` up in `data`, then among the top-level keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data
            .as_ref()
            .and_then(|d| d.get(key))
            .or_else(|| self.extra.get(key))
    }
}

/// Readings returned by `get_status`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineStatus {
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub asl_enabled: bool,
    #[serde(default)]
    pub fps: f64,
}

impl EngineStatus {
    pub fn gesture_label(&self) -> &'static str {
        if self.asl_enabled {
            "ASL mode"
        } else {
            "Standard gestures"
        }
    }

    pub fn action_label(&self) -> &'static str {
        if self.is_processing {
            "Tracking"
        } else {
            "Paused"
        }
    }

    /// Sample for the dashboard; the engine does not report CPU load, so the
    /// caller supplies it.
    pub fn to_sample(&self, cpu_percent: f64) -> TelemetrySample {
        TelemetrySample::new(
            cpu_percent,
            self.fps.trunc(),
            self.gesture_label(),
            self.action_label(),
        )
    }

    /// Sample shown while the engine cannot be reached.
    pub fn disconnected_sample(cpu_percent: f64) -> TelemetrySample {
        TelemetrySample::new(cpu_percent, 0.0, "N/A", "Disconnected")
    }
}

/// Command token the engine understands for a dashboard command.
pub fn wire_command(command: EngineCommand) -> &'static str {
    match command {
        EngineCommand::ToggleTracking => "toggle_tracking",
        EngineCommand::Recalibrate => "recalibrate",
        EngineCommand::SaveSettings => "save_settings",
        EngineCommand::StopEngine => "stop",
    }
}

// ---------------------------------------------------------------------------
// EngineClient
// ---------------------------------------------------------------------------

/// Connects to the engine socket for each request.
#[derive(Debug, Clone)]
pub struct EngineClient {
    socket_path: PathBuf,
    attempts: u32,
    retry_delay: Duration,
    io_timeout: Duration,
}

impl Default for EngineClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_PATH)
    }
}

impl EngineClient {
    /// Single connection attempt, two second I/O timeout.
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            attempts: 1,
            retry_delay: Duration::from_millis(500),
            io_timeout: Duration::from_secs(2),
        }
    }

    /// Try to connect up to `attempts` times, sleeping `delay` in between.
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request and return the raw reply, whatever its status.
    pub fn send(&self, request: &Request) -> Result<Response, IpcError> {
        let mut stream = self.connect()?;
        stream.set_read_timeout(Some(self.io_timeout))?;
        stream.set_write_timeout(Some(self.io_timeout))?;

        let mut payload = serde_json::to_vec(request).map_err(IpcError::Encode)?;
        payload.push(b'\n');
        stream.write_all(&payload)?;
        stream.flush()?;

        let mut raw = String::new();
        stream.read_to_string(&mut raw)?;
        serde_json::from_str(raw.trim()).map_err(IpcError::Decode)
    }

    /// Send one request and fail unless the engine answers `"ok"`.
    pub fn call(&self, request: &Request) -> Result<Response, IpcError> {
        self.send(request)?.into_result()
    }

    pub fn get_status(&self) -> Result<EngineStatus, IpcError> {
        let reply = self.call(&Request::new("get_status"))?;
        let data = Value::Object(reply.data.unwrap_or_default());
        serde_json::from_value(data).map_err(IpcError::Decode)
    }

    /// Flip ASL recognition; returns the new state.
    pub fn toggle_asl(&self) -> Result<bool, IpcError> {
        let reply = self.call(&Request::new("toggle_asl"))?;
        Ok(asl_flag(&reply))
    }

    /// Set ASL recognition; returns the state the engine reports.
    pub fn set_asl(&self, enabled: bool) -> Result<bool, IpcError> {
        let reply = self.call(&Request::with_value("set_asl", enabled))?;
        Ok(asl_flag(&reply))
    }

    pub fn set_camera(&self, index: u32) -> Result<Response, IpcError> {
        self.call(&Request::with_value("set_camera", index))
    }

    pub fn start(&self) -> Result<Response, IpcError> {
        self.call(&Request::new("start"))
    }

    pub fn stop(&self) -> Result<Response, IpcError> {
        self.call(&Request::new("stop"))
    }

    /// Forward a dashboard command.
    pub fn execute(&self, command: EngineCommand) -> Result<Response, IpcError> {
        self.call(&Request::new(wire_command(command)))
    }

    fn connect(&self) -> Result<UnixStream, IpcError> {
        let mut attempt = 1;
        loop {
            match UnixStream::connect(&self.socket_path) {
                Ok(stream) => return Ok(stream),
                Err(source) if attempt >= self.attempts => {
                    return Err(IpcError::Connect {
                        path: self.socket_path.clone(),
                        attempts: self.attempts,
                        source,
                    });
                }
                Err(e) => {
                    debug!(
                        "connect to {} failed (attempt {attempt}/{}): {e}",
                        self.socket_path.display(),
                        self.attempts
                    );
                    attempt += 1;
                    thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

fn asl_flag(reply: &Response) -> bool {
    reply
        .get("asl_enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
