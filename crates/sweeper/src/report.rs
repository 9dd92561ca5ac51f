use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

/// Outcome of one sweep over a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Eligible files examined.
    pub scanned: u64,
    /// Files deleted because they were past retention.
    pub removed: u64,
    /// Entries that could not be examined or deleted.
    pub failed: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.scanned == 0 && self.failed == 0
    }
}

impl AddAssign for SweepReport {
    fn add_assign(&mut self, rhs: Self) {
        self.scanned += rhs.scanned;
        self.removed += rhs.removed;
        self.failed += rhs.failed;
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {}, removed {}, failed {}",
            self.scanned, self.removed, self.failed
        )
    }
}
