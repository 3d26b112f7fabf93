//! Telemetry sample sources.
//!
//! A [`SampleSource`] produces one [`TelemetrySample`] per call at whatever
//! cadence its caller polls it. Two implementations ship here:
//!
//! - [`SimulatedSource`]: plausible random readings for running the
//!   dashboard without an engine.
//! - [`EngineSource`] (unix only): the engine's `get_status` reply combined
//!   with host CPU load from [`CpuMeter`].

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::telemetry::TelemetrySample;

/// Anything that can be polled for telemetry.
pub trait SampleSource {
    /// Short name for logs and the title bar.
    fn name(&self) -> &str;

    /// The next reading, or `None` if the source has nothing to report.
    fn next_sample(&mut self) -> Option<TelemetrySample>;
}

// ---------------------------------------------------------------------------
// SimulatedSource
// ---------------------------------------------------------------------------

/// Random readings in the ranges a healthy engine reports.
pub struct SimulatedSource {
    rng: StdRng,
    started: Instant,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic readings for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            started: Instant::now(),
        }
    }
}

impl SampleSource for SimulatedSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn next_sample(&mut self) -> Option<TelemetrySample> {
        let cpu = self.rng.random_range(5..20) as f64;
        let fps = self.rng.random_range(28..32) as f64;
        let gesture = if self.rng.random_bool(0.5) {
            "Palm_Open"
        } else {
            "Index_Pinch"
        };
        Some(TelemetrySample::new(cpu, fps, gesture, "Tracking").with_uptime(self.started.elapsed()))
    }
}

// ---------------------------------------------------------------------------
// CpuMeter
// ---------------------------------------------------------------------------

/// Aggregate CPU jiffies from the first line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
pub fn parse_proc_stat(raw: &str) -> Option<CpuTimes> {
    let line = raw.lines().find(|l| l.starts_with("cpu "))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse().ok())
        .collect::<Option<_>>()?;
    if values.len() < 4 {
        return None;
    }
    // user nice system idle iowait irq softirq steal (guest time is already in user)
    let total: u64 = values.iter().take(8).sum();
    let idle = values[3] + values.get(4).copied().unwrap_or(0);
    Some(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

/// Host CPU load between successive calls to [`CpuMeter::sample`].
#[derive(Debug, Clone, Default)]
pub struct CpuMeter {
    last: Option<CpuTimes>,
}

impl CpuMeter {
    pub fn new() -> Self {
        Self { last: read_cpu_times() }
    }

    /// Percent busy since the previous call, or `None` when the platform
    /// exposes no counters or no time has passed.
    pub fn sample(&mut self) -> Option<f64> {
        let now = read_cpu_times()?;
        let percent = self.last.and_then(|prev| load_between(prev, now));
        self.last = Some(now);
        percent
    }
}

/// Percent busy between two counter readings.
pub fn load_between(prev: CpuTimes, now: CpuTimes) -> Option<f64> {
    let total = now.total.checked_sub(prev.total)?;
    if total == 0 {
        return None;
    }
    let busy = now.busy.saturating_sub(prev.busy);
    Some((busy as f64 / total as f64 * 100.0).round())
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Option<CpuTimes> {
    let raw = std::fs::read_to_string("/proc/stat").ok()?;
    parse_proc_stat(&raw)
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Option<CpuTimes> {
    None
}

// ---------------------------------------------------------------------------
// EngineSource
// ---------------------------------------------------------------------------

#[cfg(unix)]
pub use engine::EngineSource;

#[cfg(unix)]
mod engine {
    use super::{CpuMeter, SampleSource};
    use crate::ipc::{EngineClient, EngineStatus, IpcError};
    use crate::telemetry::TelemetrySample;

    /// Polls the engine's status and pairs it with host CPU load.
    pub struct EngineSource {
        client: EngineClient,
        cpu: CpuMeter,
        last_cpu: f64,
    }

    impl EngineSource {
        pub fn new(client: EngineClient) -> Self {
            Self {
                client,
                cpu: CpuMeter::new(),
                last_cpu: 0.0,
            }
        }

        /// Current CPU load; repeats the last reading when no new one exists.
        fn cpu_percent(&mut self) -> f64 {
            if let Some(p) = self.cpu.sample() {
                self.last_cpu = p;
            }
            self.last_cpu
        }

        /// One status round trip. The error is returned so callers can tell
        /// a disconnected engine from a quiet one.
        pub fn poll(&mut self) -> Result<TelemetrySample, IpcError> {
            let cpu = self.cpu_percent();
            self.client.get_status().map(|status| status.to_sample(cpu))
        }

        /// The sample to show while the engine cannot be reached.
        pub fn disconnected(&self) -> TelemetrySample {
            EngineStatus::disconnected_sample(self.last_cpu)
        }
    }

    impl SampleSource for EngineSource {
        fn name(&self) -> &str {
            "engine"
        }

        fn next_sample(&mut self) -> Option<TelemetrySample> {
            let sample = match self.poll() {
                Ok(sample) => sample,
                Err(e) => {
                    log::debug!("engine poll failed: {e}");
                    self.disconnected()
                }
            };
            Some(sample)
        }
    }
}
