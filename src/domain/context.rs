use chrono::{DateTime, Utc};

/// Identity of a single iteration, handed to the iteration function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationContext {
    /// Virtual user id, starting at 1 and stable for the VU's lifetime
    pub vu_id: u32,
    /// Per-VU iteration counter, starting at 0
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
}

impl IterationContext {
    pub fn new(vu_id: u32, iteration: u64) -> Self {
        Self::at(vu_id, iteration, Utc::now())
    }

    pub fn at(vu_id: u32, iteration: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            vu_id,
            iteration,
            timestamp,
        }
    }
}
