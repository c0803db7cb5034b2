use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pass/fail counts for one named check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    pub passes: u64,
    pub fails: u64,
}

impl CheckTally {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    /// Fraction of passing evaluations, 0.0 when nothing was recorded.
    pub fn pass_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passes as f64 / total as f64,
        }
    }
}

/// Shared sink for named boolean checks recorded by every VU.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    tallies: Mutex<BTreeMap<String, CheckTally>>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation and hand the result back.
    pub fn record(&self, name: &str, passed: bool) -> bool {
        let mut tallies = self.tallies.lock();
        let tally = tallies.entry(name.to_string()).or_default();
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
        passed
    }

    pub fn tally(&self, name: &str) -> Option<CheckTally> {
        self.tallies.lock().get(name).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, CheckTally> {
        self.tallies.lock().clone()
    }
}
