use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A timed segment of a run and the VU count reached by its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u32,
}

impl Stage {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// Stage as written in configuration: `{ duration = "10s", target = 5 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub duration: String,
    pub target: u32,
}

impl StageSpec {
    pub fn new(duration: impl Into<String>, target: u32) -> Self {
        Self {
            duration: duration.into(),
            target,
        }
    }
}

impl TryFrom<&StageSpec> for Stage {
    type Error = anyhow::Error;

    fn try_from(spec: &StageSpec) -> Result<Self> {
        let duration = parse_duration(&spec.duration)
            .with_context(|| format!("invalid stage duration {:?}", spec.duration))?;
        Ok(Stage::new(duration, spec.target))
    }
}

/// Parse `"500ms"`, `"10s"`, `"2m"` or `"1h"` into a [`Duration`].
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let s = raw.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        bail!("missing numeric value");
    }
    let value: u64 = digits.parse().context("numeric value out of range")?;
    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.checked_mul(60).context("duration out of range")?),
        "h" => Duration::from_secs(value.checked_mul(3600).context("duration out of range")?),
        "" => bail!("missing unit (expected ms, s, m or h)"),
        other => bail!("unknown unit {other:?}"),
    };
    Ok(duration)
}

/// Ordered stage list driving the number of active virtual users over time.
///
/// Each stage ramps linearly from the previous stage's target (zero before
/// the first stage) to its own target. A zero-length stage jumps straight to
/// its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    stages: Vec<Stage>,
}

impl Default for Schedule {
    /// Ramp to 5 VUs over 10s, on to 20 over 30s, then drain over 10s.
    fn default() -> Self {
        Self {
            stages: vec![
                Stage::new(Duration::from_secs(10), 5),
                Stage::new(Duration::from_secs(30), 20),
                Stage::new(Duration::from_secs(10), 0),
            ],
        }
    }
}

impl Schedule {
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            bail!("schedule needs at least one stage");
        }
        // Partial sums in the lookups below stay within this total.
        let mut total = Duration::ZERO;
        for stage in &stages {
            total = match total.checked_add(stage.duration) {
                Some(total) => total,
                None => bail!("total schedule duration overflows"),
            };
        }
        Ok(Self { stages })
    }

    pub fn from_specs(specs: &[StageSpec]) -> Result<Self> {
        let stages = specs
            .iter()
            .map(Stage::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(stages)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.total_duration()
    }

    pub fn peak_target(&self) -> u32 {
        self.stages.iter().map(|s| s.target).max().unwrap_or(0)
    }

    /// Index of the stage active at `elapsed`, `None` once the schedule is over.
    pub fn stage_index_at(&self, elapsed: Duration) -> Option<usize> {
        let mut end = Duration::ZERO;
        for (idx, stage) in self.stages.iter().enumerate() {
            end += stage.duration;
            if elapsed < end {
                return Some(idx);
            }
        }
        None
    }

    /// Target VU count at `elapsed` since the start of the run.
    pub fn target_at(&self, elapsed: Duration) -> u32 {
        let mut start = Duration::ZERO;
        let mut prev = 0u32;
        for stage in &self.stages {
            let end = start + stage.duration;
            if elapsed < end {
                let progress =
                    (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
                let from = f64::from(prev);
                let to = f64::from(stage.target);
                return (from + (to - from) * progress).floor() as u32;
            }
            start = end;
            prev = stage.target;
        }
        prev
    }
}
