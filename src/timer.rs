//! Named wall-clock timers collected in a process-wide registry.
//!
//! A [`Timer`] records its elapsed time when it is stopped or dropped. Recorded timings are
//! aggregated per name and can be listed with [`timings`].
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

static REGISTRY: Lazy<Mutex<BTreeMap<String, TimingSummary>>> = Lazy::new(|| Mutex::new(BTreeMap::new()));

/// Aggregated timings of all timers sharing a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingSummary {
    pub count: usize,
    pub total: Duration,
    pub max: Duration,
}

impl TimingSummary {
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count as u32
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.count += 1;
        self.total += elapsed;
        self.max = self.max.max(elapsed);
    }
}

#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    stopped: bool,
}

impl Timer {
    /// Creates and starts a new timer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stops the timer and records the elapsed time. Stopping twice records only once.
    pub fn stop(&mut self) -> Duration {
        let elapsed = self.elapsed();
        if !self.stopped {
            self.stopped = true;
            debug!("Timer \"{}\" stopped after {:.3?}", self.name, elapsed);
            REGISTRY
                .lock()
                .entry(self.name.clone())
                .or_default()
                .record(elapsed);
        }
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A snapshot of the registry, sorted by timer name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimingTable {
    pub entries: Vec<(String, TimingSummary)>,
}

impl TimingTable {
    pub fn get(&self, name: &str) -> Option<&TimingSummary> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, summary)| summary)
    }
}

impl Display for TimingTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name_width = self
            .entries
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Timer".len());
        writeln!(
            f,
            "{:<name_width$} | {:>6} | {:>12} | {:>12} | {:>12}",
            "Timer", "reps", "avg [s]", "max [s]", "total [s]"
        )?;
        writeln!(f, "{}", "-".repeat(name_width + 53))?;
        for (name, summary) in &self.entries {
            writeln!(
                f,
                "{:<name_width$} | {:>6} | {:>12.6} | {:>12.6} | {:>12.6}",
                name,
                summary.count,
                summary.average().as_secs_f64(),
                summary.max.as_secs_f64(),
                summary.total.as_secs_f64()
            )?;
        }
        Ok(())
    }
}

/// Returns the timings recorded so far.
pub fn timings() -> TimingTable {
    let entries = REGISTRY
        .lock()
        .iter()
        .map(|(name, summary)| (name.clone(), *summary))
        .collect();
    TimingTable { entries }
}

pub fn reset_timings() {
    REGISTRY.lock().clear();
}
