use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WaitTotals {
    pub total_wait: Duration,
    pub boarded: u64,
}

impl WaitTotals {
    /// Mean wait per boarded passenger, zero before anyone has boarded.
    pub fn average(&self) -> Duration {
        if self.boarded == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_wait.as_nanos() / u128::from(self.boarded);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Running waiting-time totals, shared between the scheduler (writer) and
/// any number of observers (readers).
///
/// Both totals live under one lock so a reader never sees a wait total
/// without its matching count.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    totals: Mutex<WaitTotals>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_boarding(&self, wait: Duration) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.total_wait = totals.total_wait.saturating_add(wait);
        totals.boarded = totals.boarded.saturating_add(1);
    }

    /// Recomputed from the totals on every call.
    pub fn average_wait(&self) -> Duration {
        self.totals().average()
    }

    pub fn totals(&self) -> WaitTotals {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
