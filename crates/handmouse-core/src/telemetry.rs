//! Telemetry samples and the closed set of display fields they feed.
//!
//! A [`TelemetrySample`] is one snapshot of engine state. Every value it
//! carries maps to exactly one [`Field`], and every field has a fixed
//! rendering rule in [`Field::format`]. Values are never validated here: a
//! negative CPU load is rendered as a negative CPU load.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One discrete snapshot of engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// CPU load in percent (nominally 0–100).
    #[serde(rename = "cpu")]
    pub cpu_percent: f64,
    /// Processed frames per second.
    pub fps: f64,
    /// Label of the currently detected gesture.
    pub gesture: String,
    /// Label of the action mapped to the gesture (may be empty).
    #[serde(default)]
    pub action: String,
    /// Resident memory in megabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    /// Device temperature in degrees Celsius.
    #[serde(
        default,
        alias = "temp",
        skip_serializing_if = "Option::is_none"
    )]
    pub temperature: Option<f64>,
    /// Engine uptime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<f64>,
}

impl TelemetrySample {
    /// Sample with the four mandatory readings and no optional ones.
    pub fn new(
        cpu_percent: f64,
        fps: f64,
        gesture: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            cpu_percent,
            fps,
            gesture: gesture.into(),
            action: action.into(),
            memory: None,
            temperature: None,
            uptime: None,
        }
    }

    pub fn with_memory(mut self, megabytes: f64) -> Self {
        self.memory = Some(megabytes);
        self
    }

    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature = Some(celsius);
        self
    }

    pub fn with_uptime(mut self, uptime: Duration) -> Self {
        self.uptime = Some(uptime.as_secs_f64());
        self
    }
}

/// A recognized display field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Cpu,
    Fps,
    Gesture,
    Action,
    Memory,
    Temperature,
    Uptime,
}

impl Field {
    /// Number of recognized fields.
    pub const COUNT: usize = 7;

    /// Every field, in display order.
    pub const ALL: [Field; Self::COUNT] = [
        Field::Cpu,
        Field::Fps,
        Field::Gesture,
        Field::Action,
        Field::Memory,
        Field::Temperature,
        Field::Uptime,
    ];

    /// Stable position of this field in [`Field::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Fps => "fps",
            Self::Gesture => "gesture",
            Self::Action => "action",
            Self::Memory => "memory",
            Self::Temperature => "temperature",
            Self::Uptime => "uptime",
        }
    }

    /// Human-readable label for the display surface.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Fps => "FPS",
            Self::Gesture => "Gesture",
            Self::Action => "Action",
            Self::Memory => "Memory",
            Self::Temperature => "Temp",
            Self::Uptime => "Uptime",
        }
    }

    /// Render this field's value from `sample`.
    ///
    /// Returns `None` when the sample does not carry the field (optional
    /// readings only); mandatory fields always render.
    pub fn format(self, sample: &TelemetrySample) -> Option<String> {
        match self {
            Self::Cpu => Some(format!("{}%", format_number(sample.cpu_percent))),
            Self::Fps => Some(format_number(sample.fps)),
            Self::Gesture => Some(sample.gesture.clone()),
            Self::Action => Some(sample.action.clone()),
            Self::Memory => sample.memory.map(|mb| format!("{} MB", format_number(mb))),
            Self::Temperature => sample
                .temperature
                .map(|c| format!("{}°C", format_number(c))),
            Self::Uptime => sample.uptime.map(format_uptime),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a field name is not one of [`Field::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown display field '{0}' (expected one of: cpu, fps, gesture, action, memory, temperature, uptime)")]
pub struct ParseFieldError(pub String);

impl std::str::FromStr for Field {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ParseFieldError(s.to_string()))
    }
}

/// Plain text for a numeric reading: integers without a fractional part,
/// everything else at shortest round-trip precision.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}

/// `H:MM:SS` for a span of seconds. Negative or non-finite spans render as zero.
fn format_uptime(secs: f64) -> String {
    let total = secs as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_renders_with_percent_suffix() {
        let s = TelemetrySample::new(42.0, 30.0, "Palm", "Tracking");
        assert_eq!(Field::Cpu.format(&s).as_deref(), Some("42%"));
        assert_eq!(Field::Fps.format(&s).as_deref(), Some("30"));
    }

    #[test]
    fn fractional_values_keep_their_digits() {
        let s = TelemetrySample::new(12.5, 29.75, "Fist", "");
        assert_eq!(Field::Cpu.format(&s).as_deref(), Some("12.5%"));
        assert_eq!(Field::Fps.format(&s).as_deref(), Some("29.75"));
    }

    #[test]
    fn out_of_range_values_are_written_as_given() {
        let s = TelemetrySample::new(-3.0, -1.0, "Palm", "Tracking");
        assert_eq!(Field::Cpu.format(&s).as_deref(), Some("-3%"));
        assert_eq!(Field::Fps.format(&s).as_deref(), Some("-1"));
        let s = TelemetrySample::new(250.0, 0.0, "Palm", "Tracking");
        assert_eq!(Field::Cpu.format(&s).as_deref(), Some("250%"));
    }

    #[test]
    fn labels_pass_through_unchanged() {
        let s = TelemetrySample::new(1.0, 1.0, "Index_Pinch", "");
        assert_eq!(Field::Gesture.format(&s).as_deref(), Some("Index_Pinch"));
        assert_eq!(Field::Action.format(&s).as_deref(), Some(""));
    }

    #[test]
    fn optional_fields_absent_from_sample_render_nothing() {
        let s = TelemetrySample::new(1.0, 1.0, "Palm", "Tracking");
        assert_eq!(Field::Memory.format(&s), None);
        assert_eq!(Field::Temperature.format(&s), None);
        assert_eq!(Field::Uptime.format(&s), None);
    }

    #[test]
    fn optional_fields_render_with_units() {
        let s = TelemetrySample::new(1.0, 1.0, "Palm", "Tracking")
            .with_memory(512.0)
            .with_temperature(61.5)
            .with_uptime(Duration::from_secs(3 * 3600 + 7 * 60 + 9));
        assert_eq!(Field::Memory.format(&s).as_deref(), Some("512 MB"));
        assert_eq!(Field::Temperature.format(&s).as_deref(), Some("61.5°C"));
        assert_eq!(Field::Uptime.format(&s).as_deref(), Some("3:07:09"));
    }

    #[test]
    fn field_names_round_trip_through_from_str() {
        for field in Field::ALL {
            assert_eq!(field.name().parse::<Field>(), Ok(field));
        }
    }

    #[test]
    fn unknown_field_name_is_rejected() {
        let err = "container".parse::<Field>().unwrap_err();
        assert_eq!(err, ParseFieldError("container".into()));
        assert!("CPU".parse::<Field>().is_err());
    }

    #[test]
    fn field_index_matches_position_in_all() {
        for (i, field) in Field::ALL.into_iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }

    #[test]
    fn sample_deserializes_ignoring_unknown_keys() {
        let json = r#"{"cpu": 42, "fps": 30, "gesture": "Palm", "action": "Tracking",
                       "temp": 55.0, "container": "glass"}"#;
        let s: TelemetrySample = serde_json::from_str(json).unwrap();
        assert_eq!(s.cpu_percent, 42.0);
        assert_eq!(s.temperature, Some(55.0));
        assert_eq!(s.memory, None);
    }

    #[test]
    fn sample_deserializes_without_action() {
        let s: TelemetrySample =
            serde_json::from_str(r#"{"cpu": 5, "fps": 0, "gesture": "None"}"#).unwrap();
        assert_eq!(s.action, "");
    }
}
