//! Dashboard configuration file.
//!
//! ```toml
//! fields = ["cpu", "fps", "gesture", "action"]
//! log_capacity = 50
//! refresh_secs = 0.1
//! socket_path = "/tmp/handmouse.sock"
//!
//! [shortcuts]
//! "Ctrl+Q" = "stop_engine"
//! "shift+ctrl+C" = "recalibrate"
//! ```
//!
//! Every key is optional. Unknown keys, unknown field names and unknown
//! command names are rejected when the file is parsed; chords are parsed and
//! canonicalized when the file is validated. A letter held with Ctrl or Alt
//! is stored uppercase, as the terminal reports it, so `"Ctrl+q"` and
//! `"Ctrl+Q"` name the same chord.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::event_log::MAX_LOG_ENTRIES;
use crate::shortcut::{EngineCommand, KeyChord, ParseChordError};
use crate::telemetry::Field;

/// Engine control socket used when nothing else is configured.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/handmouse.sock";

/// Default dashboard refresh interval.
pub const DEFAULT_REFRESH_SECS: f64 = 0.1;

/// Largest `log_capacity` a config file may ask for.
pub const MAX_LOG_CAPACITY: usize = 10_000;

/// Longest `refresh_secs` a config file may ask for.
pub const MAX_REFRESH_SECS: f64 = 3600.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid shortcut '{chord}': {source}")]
    InvalidChord {
        chord: String,
        source: ParseChordError,
    },
    #[error("log_capacity must be between 1 and {max}, got {0}", max = MAX_LOG_CAPACITY)]
    InvalidLogCapacity(usize),
    #[error("refresh_secs must be above 0 and at most {max}, got {0}", max = MAX_REFRESH_SECS)]
    InvalidRefresh(f64),
}

/// What the dashboard shows and where it finds the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Telemetry fields given a place on screen, in display order.
    pub fields: Vec<Field>,
    /// Whether the event log panel is shown.
    pub show_log: bool,
    /// Entries the event log retains.
    pub log_capacity: usize,
    /// Seconds between telemetry polls.
    pub refresh_secs: f64,
    /// Engine control socket.
    pub socket_path: PathBuf,
    /// Extra chord bindings layered over the defaults.
    pub shortcuts: BTreeMap<String, EngineCommand>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            fields: Field::ALL.to_vec(),
            show_log: true,
            log_capacity: MAX_LOG_ENTRIES,
            refresh_secs: DEFAULT_REFRESH_SECS,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            shortcuts: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("loaded dashboard config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_LOG_CAPACITY).contains(&self.log_capacity) {
            return Err(ConfigError::InvalidLogCapacity(self.log_capacity));
        }
        if !(self.refresh_secs > 0.0 && self.refresh_secs <= MAX_REFRESH_SECS) {
            return Err(ConfigError::InvalidRefresh(self.refresh_secs));
        }
        self.resolved_shortcuts().map(|_| ())
    }

    /// Configured shortcuts with their chords parsed and canonicalized.
    pub fn resolved_shortcuts(&self) -> Result<Vec<(KeyChord, EngineCommand)>, ConfigError> {
        self.shortcuts
            .iter()
            .map(|(chord, &command)| {
                chord
                    .parse::<KeyChord>()
                    .map(|parsed| (fold_letter_case(parsed), command))
                    .map_err(|source| ConfigError::InvalidChord {
                        chord: chord.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn shows(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

/// Uppercase a single letter key held with Ctrl or Alt.
fn fold_letter_case(mut chord: KeyChord) -> KeyChord {
    let is_letter = chord.key.len() == 1 && chord.key.chars().all(|c| c.is_ascii_alphabetic());
    if (chord.ctrl || chord.alt) && is_letter {
        chord.key.make_ascii_uppercase();
    }
    chord
}
