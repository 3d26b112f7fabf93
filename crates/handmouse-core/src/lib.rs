//! # handmouse-core
//!
//! **Live-state synchronization and command dispatch for the Hand Mouse OS
//! operator dashboard.**
//!
//! The tracking engine (camera capture, gesture recognition, input injection)
//! lives in another process. This crate is the narrow layer between that
//! engine and whatever surface displays it:
//!
//! - [`TelemetryBinder`] keeps a set of optional display targets consistent
//!   with the latest [`TelemetrySample`] and maintains a bounded, newest-first
//!   [`EventLog`].
//! - [`ShortcutDispatcher`] turns key presses into canonical chord strings and
//!   runs the command registered for an exact match, leaving every other key
//!   untouched.
//!
//! ## Quick Start
//!
//! ```
//! use handmouse_core::{DisplayBindings, Field, TelemetryBinder, TelemetrySample, TextCell};
//!
//! let cpu = TextCell::default();
//! let mut binder = TelemetryBinder::new();
//! binder.bind(DisplayBindings::new().with_text(Field::Cpu, cpu.clone()));
//!
//! binder.update(&TelemetrySample::new(42.0, 30.0, "Palm", "Tracking"));
//! assert_eq!(cpu.text(), "42%");
//! ```
//!
//! ## Architecture
//!
//! Sample source → `TelemetryBinder::update` → display targets
//!
//! Key press → `ShortcutDispatcher::handle_key_event` → command
//!
//! The two components share no state and never call each other; a
//! composition root owns both.

pub mod binder;
pub mod config;
pub mod event_log;
#[cfg(unix)]
pub mod ipc;
pub mod shortcut;
pub mod source;
pub mod telemetry;

pub use binder::{
    DisplayBindings, GaugeCell, GaugeTarget, LogCell, LogTarget, TelemetryBinder, TextCell,
    TextTarget,
};
pub use config::{
    ConfigError, DEFAULT_REFRESH_SECS, DEFAULT_SOCKET_PATH, DashboardConfig, MAX_LOG_CAPACITY,
    MAX_REFRESH_SECS,
};
pub use event_log::{EventLog, LogEntry, MAX_LOG_ENTRIES, Severity};
#[cfg(unix)]
pub use ipc::{EngineClient, EngineStatus, IpcError, Request, Response};
pub use shortcut::{
    Command, Dispatch, EngineCommand, KeyChord, KeyPress, ParseChordError, ShortcutDispatcher,
};
#[cfg(unix)]
pub use source::EngineSource;
pub use source::{CpuMeter, SampleSource, SimulatedSource};
pub use telemetry::{Field, ParseFieldError, TelemetrySample, format_number};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
