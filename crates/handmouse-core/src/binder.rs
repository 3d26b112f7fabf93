//! Telemetry binding: samples in, display targets out.
//!
//! A display surface exposes any subset of the recognized [`Field`]s plus an
//! optional CPU gauge and an optional log view. [`DisplayBindings`] records
//! which of those targets exist; [`TelemetryBinder`] writes to the ones that
//! do and silently skips the rest. Nothing here returns an error, so a
//! partial or slow surface never pushes back on the sample source.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Local};
use log::trace;

use crate::event_log::{EventLog, LogEntry, MAX_LOG_ENTRIES, Severity};
use crate::telemetry::{Field, TelemetrySample};

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// A place on the display surface that shows one line of text.
pub trait TextTarget {
    fn set_text(&mut self, text: &str);
}

/// A fill bar. `ratio` is in `[0, 1]`.
pub trait GaugeTarget {
    fn set_ratio(&mut self, ratio: f64);
}

/// A newest-first list of log entries.
pub trait LogTarget {
    /// Show `entry` above everything already shown.
    fn prepend(&mut self, entry: &LogEntry);
    /// Drop the bottom (oldest) entry.
    fn remove_last(&mut self);
    /// Drop everything.
    fn clear(&mut self);
}

/// Shared text slot, handy for surfaces that redraw from their own state.
#[derive(Debug, Clone, Default)]
pub struct TextCell(Rc<RefCell<String>>);

impl TextCell {
    pub fn text(&self) -> String {
        self.0.borrow().clone()
    }
}

impl TextTarget for TextCell {
    fn set_text(&mut self, text: &str) {
        let mut slot = self.0.borrow_mut();
        slot.clear();
        slot.push_str(text);
    }
}

/// Shared gauge ratio.
#[derive(Debug, Clone, Default)]
pub struct GaugeCell(Rc<Cell<f64>>);

impl GaugeCell {
    pub fn ratio(&self) -> f64 {
        self.0.get()
    }
}

impl GaugeTarget for GaugeCell {
    fn set_ratio(&mut self, ratio: f64) {
        self.0.set(ratio);
    }
}

/// Shared newest-first entry list.
#[derive(Debug, Clone, Default)]
pub struct LogCell(Rc<RefCell<VecDeque<LogEntry>>>);

impl LogCell {
    /// Snapshot of the shown entries, newest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.0.borrow().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl LogTarget for LogCell {
    fn prepend(&mut self, entry: &LogEntry) {
        self.0.borrow_mut().push_front(entry.clone());
    }

    fn remove_last(&mut self) {
        self.0.borrow_mut().pop_back();
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// DisplayBindings
// ---------------------------------------------------------------------------

/// The set of display targets a surface exposes. Every target is optional.
pub struct DisplayBindings {
    text: [Option<Box<dyn TextTarget>>; Field::COUNT],
    cpu_gauge: Option<Box<dyn GaugeTarget>>,
    logs: Option<Box<dyn LogTarget>>,
    log_capacity: usize,
}

impl Default for DisplayBindings {
    fn default() -> Self {
        Self {
            text: std::array::from_fn(|_| None),
            cpu_gauge: None,
            logs: None,
            log_capacity: MAX_LOG_ENTRIES,
        }
    }
}

impl DisplayBindings {
    /// No targets bound.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, field: Field, target: impl TextTarget + 'static) -> Self {
        self.text[field.index()] = Some(Box::new(target));
        self
    }

    pub fn with_cpu_gauge(mut self, target: impl GaugeTarget + 'static) -> Self {
        self.cpu_gauge = Some(Box::new(target));
        self
    }

    pub fn with_logs(mut self, target: impl LogTarget + 'static) -> Self {
        self.logs = Some(Box::new(target));
        self
    }

    /// Number of entries the log view retains. Defaults to [`MAX_LOG_ENTRIES`].
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn is_bound(&self, field: Field) -> bool {
        self.text[field.index()].is_some()
    }

    pub fn has_cpu_gauge(&self) -> bool {
        self.cpu_gauge.is_some()
    }

    pub fn has_logs(&self) -> bool {
        self.logs.is_some()
    }
}

impl std::fmt::Debug for DisplayBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bound: Vec<&str> = Field::ALL
            .into_iter()
            .filter(|&field| self.is_bound(field))
            .map(Field::name)
            .collect();
        f.debug_struct("DisplayBindings")
            .field("fields", &bound)
            .field("cpu_gauge", &self.has_cpu_gauge())
            .field("logs", &self.has_logs())
            .field("log_capacity", &self.log_capacity)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TelemetryBinder
// ---------------------------------------------------------------------------

struct BoundLog {
    target: Box<dyn LogTarget>,
    log: EventLog,
}

/// Keeps bound display targets in step with the latest sample and owns the
/// bounded event log.
pub struct TelemetryBinder {
    text: [Option<Box<dyn TextTarget>>; Field::COUNT],
    cpu_gauge: Option<Box<dyn GaugeTarget>>,
    logs: Option<BoundLog>,
}

impl Default for TelemetryBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryBinder {
    /// A binder with nothing bound. Every operation is a no-op until [`bind`](Self::bind).
    pub fn new() -> Self {
        Self::with_bindings(DisplayBindings::new())
    }

    pub fn with_bindings(bindings: DisplayBindings) -> Self {
        let mut binder = Self {
            text: std::array::from_fn(|_| None),
            cpu_gauge: None,
            logs: None,
        };
        binder.bind(bindings);
        binder
    }

    /// Register the surface's targets, replacing any previous set.
    ///
    /// The event log lives with its target, so rebinding starts a fresh log.
    pub fn bind(&mut self, bindings: DisplayBindings) {
        let DisplayBindings {
            text,
            cpu_gauge,
            logs,
            log_capacity,
        } = bindings;

        for field in Field::ALL {
            if text[field.index()].is_none() {
                trace!("display field '{field}' has no target");
            }
        }

        self.text = text;
        self.cpu_gauge = cpu_gauge;
        self.logs = logs.map(|mut target| {
            target.clear();
            BoundLog {
                target,
                log: EventLog::with_capacity(log_capacity),
            }
        });
    }

    /// Write every bound field from `sample`.
    ///
    /// Unbound fields are skipped. Optional readings the sample does not carry
    /// leave their target untouched.
    pub fn update(&mut self, sample: &TelemetrySample) {
        for field in Field::ALL {
            let Some(target) = self.text[field.index()].as_mut() else {
                continue;
            };
            if let Some(text) = field.format(sample) {
                target.set_text(&text);
            }
        }

        if let Some(gauge) = self.cpu_gauge.as_mut() {
            gauge.set_ratio(gauge_ratio(sample.cpu_percent));
        }
    }

    /// Record `message` stamped with the current local time.
    pub fn add_log(&mut self, message: impl Into<String>, severity: Severity) {
        self.add_log_at(Local::now(), message, severity);
    }

    /// Record `message` with an explicit timestamp.
    ///
    /// Without a log target the entry is discarded.
    pub fn add_log_at(
        &mut self,
        timestamp: DateTime<Local>,
        message: impl Into<String>,
        severity: Severity,
    ) {
        let Some(bound) = self.logs.as_mut() else {
            trace!("no log target bound, dropping entry");
            return;
        };

        let entry = LogEntry::at(timestamp, message, severity);
        bound.target.prepend(&entry);
        if bound.log.push(entry).is_some() {
            bound.target.remove_last();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.add_log(message, Severity::Info);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.add_log(message, Severity::Warn);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.add_log(message, Severity::Error);
    }

    /// The retained entries, or `None` when no log target is bound.
    pub fn log(&self) -> Option<&EventLog> {
        self.logs.as_ref().map(|b| &b.log)
    }

    pub fn is_bound(&self, field: Field) -> bool {
        self.text[field.index()].is_some()
    }
}

fn gauge_ratio(cpu_percent: f64) -> f64 {
    if cpu_percent.is_nan() {
        return 0.0;
    }
    (cpu_percent / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palm() -> TelemetrySample {
        TelemetrySample::new(42.0, 30.0, "Palm", "Tracking")
    }

    #[test]
    fn update_writes_formatted_values() {
        let cpu = TextCell::default();
        let fps = TextCell::default();
        let gesture = TextCell::default();
        let action = TextCell::default();
        let mut binder = TelemetryBinder::with_bindings(
            DisplayBindings::new()
                .with_text(Field::Cpu, cpu.clone())
                .with_text(Field::Fps, fps.clone())
                .with_text(Field::Gesture, gesture.clone())
                .with_text(Field::Action, action.clone()),
        );

        binder.update(&palm());

        assert_eq!(cpu.text(), "42%");
        assert_eq!(fps.text(), "30");
        assert_eq!(gesture.text(), "Palm");
        assert_eq!(action.text(), "Tracking");
    }

    #[test]
    fn update_without_bindings_is_a_no_op() {
        let mut binder = TelemetryBinder::new();
        binder.update(&palm());
        binder.update(&TelemetrySample::new(f64::NAN, -5.0, "", ""));
        for field in Field::ALL {
            assert!(!binder.is_bound(field));
        }
        assert!(binder.log().is_none());
    }

    #[test]
    fn partial_bindings_only_touch_bound_fields() {
        let fps = TextCell::default();
        let mut binder =
            TelemetryBinder::with_bindings(DisplayBindings::new().with_text(Field::Fps, fps.clone()));
        binder.update(&palm());
        assert_eq!(fps.text(), "30");
        assert!(!binder.is_bound(Field::Cpu));
    }

    #[test]
    fn missing_optional_reading_keeps_previous_text() {
        let memory = TextCell::default();
        let mut binder = TelemetryBinder::with_bindings(
            DisplayBindings::new().with_text(Field::Memory, memory.clone()),
        );
        binder.update(&palm().with_memory(128.0));
        assert_eq!(memory.text(), "128 MB");
        binder.update(&palm());
        assert_eq!(memory.text(), "128 MB");
    }

    #[test]
    fn gauge_is_clamped_but_text_is_not() {
        let cpu = TextCell::default();
        let gauge = GaugeCell::default();
        let mut binder = TelemetryBinder::with_bindings(
            DisplayBindings::new()
                .with_text(Field::Cpu, cpu.clone())
                .with_cpu_gauge(gauge.clone()),
        );

        binder.update(&TelemetrySample::new(150.0, 30.0, "Palm", ""));
        assert_eq!(cpu.text(), "150%");
        assert_eq!(gauge.ratio(), 1.0);

        binder.update(&TelemetrySample::new(-10.0, 30.0, "Palm", ""));
        assert_eq!(cpu.text(), "-10%");
        assert_eq!(gauge.ratio(), 0.0);

        binder.update(&TelemetrySample::new(25.0, 30.0, "Palm", ""));
        assert!((gauge.ratio() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn update_does_not_log() {
        let logs = LogCell::default();
        let mut binder =
            TelemetryBinder::with_bindings(DisplayBindings::new().with_logs(logs.clone()));
        binder.update(&palm());
        assert!(logs.is_empty());
        assert_eq!(binder.log().map(EventLog::len), Some(0));
    }

    #[test]
    fn add_log_shows_newest_first_and_stays_bounded() {
        let logs = LogCell::default();
        let mut binder = TelemetryBinder::with_bindings(
            DisplayBindings::new()
                .with_logs(logs.clone())
                .with_log_capacity(4),
        );

        for n in 0..10 {
            binder.info(format!("event {n}"));
            assert!(logs.len() <= 4);
        }

        let shown: Vec<String> = logs.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(shown, vec!["event 9", "event 8", "event 7", "event 6"]);

        let kept: Vec<&str> = binder
            .log()
            .expect("log bound")
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(kept, vec!["event 9", "event 8", "event 7", "event 6"]);
    }

    #[test]
    fn default_capacity_is_fifty() {
        let logs = LogCell::default();
        let mut binder =
            TelemetryBinder::with_bindings(DisplayBindings::new().with_logs(logs.clone()));
        for n in 0..120 {
            binder.add_log(format!("event {n}"), Severity::Info);
        }
        assert_eq!(logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(
            logs.entries().last().map(|e| e.message.clone()),
            Some("event 70".to_string())
        );
    }

    #[test]
    fn add_log_without_target_discards() {
        let mut binder = TelemetryBinder::new();
        for n in 0..1000 {
            binder.add_log(format!("event {n}"), Severity::Warn);
        }
        assert!(binder.log().is_none());
    }

    #[test]
    fn severity_is_preserved() {
        let logs = LogCell::default();
        let mut binder =
            TelemetryBinder::with_bindings(DisplayBindings::new().with_logs(logs.clone()));
        binder.warn("Engine disconnected");
        binder.error("Command failed");
        let sev: Vec<Severity> = logs.entries().into_iter().map(|e| e.severity).collect();
        assert_eq!(sev, vec![Severity::Error, Severity::Warn]);
    }

    #[test]
    fn rebinding_starts_a_fresh_log() {
        let logs = LogCell::default();
        let mut binder =
            TelemetryBinder::with_bindings(DisplayBindings::new().with_logs(logs.clone()));
        binder.info("first");
        binder.bind(DisplayBindings::new().with_logs(logs.clone()));
        assert!(logs.is_empty());
        binder.info("second");
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn debug_lists_bound_fields() {
        let bindings = DisplayBindings::new()
            .with_text(Field::Cpu, TextCell::default())
            .with_text(Field::Action, TextCell::default());
        let dbg = format!("{bindings:?}");
        assert!(dbg.contains("\"cpu\""));
        assert!(dbg.contains("\"action\""));
        assert!(!dbg.contains("\"fps\""));
    }
}
