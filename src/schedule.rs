//! Time intervals and the half-open overlap rule used by event conflict checks.

use chrono::{DateTime, Utc};

/// A reserved span of time. A missing end means the interval occupies only
/// its start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// End used for comparisons; equal to the start when no end is set.
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end.unwrap_or(self.start)
    }

    /// Half-open overlap: `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2` and
    /// `s2 < e1`. Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.effective_end() && other.start < self.effective_end()
    }
}
