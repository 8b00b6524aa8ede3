use crate::bus::{Bus, BusPhase};
use crate::ids::{BusId, StopId};
use crate::metrics::MetricsAggregator;
use crate::scheduler::{MovementScheduler, TickReport};
use crate::stops::StopRegistry;
use heapless::HistoryBuffer;
use serde::{Deserialize, Serialize};

const WAIT_HISTORY_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusTelemetry {
    pub id: BusId,
    pub phase: BusPhase,
    pub location: StopId,
    pub position: usize,
    pub load: usize,
    pub capacity: usize,
    pub route: Vec<StopId>,
}

impl From<&Bus> for BusTelemetry {
    fn from(bus: &Bus) -> Self {
        Self {
            id: bus.id(),
            phase: bus.phase(),
            location: bus.location(),
            position: bus.position(),
            load: bus.load(),
            capacity: bus.capacity(),
            route: bus.route().stops().to_vec(),
        }
    }
}

/// Snapshot of the whole system after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetTelemetry {
    pub tick: u64,
    pub timestamp: u64,
    pub boarded_this_tick: usize,
    pub total_boarded: u64,
    pub average_wait_ms: u64,
    /// Change in average wait across the recent sample window.
    pub wait_trend_ms: i64,
    pub total_waiting: usize,
    pub queue_lengths: Vec<usize>,
    pub buses: Vec<BusTelemetry>,
}

/// Builds per-tick telemetry and keeps a short history of the average wait.
pub struct TelemetryCollector {
    wait_history: HistoryBuffer<u64, WAIT_HISTORY_SIZE>,
    packets_generated: u64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            wait_history: HistoryBuffer::new(),
            packets_generated: 0,
        }
    }

    pub fn collect(
        &mut self,
        report: &TickReport,
        scheduler: &MovementScheduler,
        registry: &StopRegistry,
        metrics: &MetricsAggregator,
    ) -> FleetTelemetry {
        let totals = metrics.totals();
        let average_wait_ms = u64::try_from(totals.average().as_millis()).unwrap_or(u64::MAX);
        self.wait_history.write(average_wait_ms);
        self.packets_generated += 1;

        let queue_lengths = registry.queue_lengths();

        FleetTelemetry {
            tick: report.tick,
            timestamp: report.timestamp,
            boarded_this_tick: report.total_boarded(),
            total_boarded: totals.boarded,
            average_wait_ms,
            wait_trend_ms: self.wait_trend_ms(),
            total_waiting: queue_lengths.iter().sum(),
            queue_lengths,
            buses: scheduler.fleet().iter().map(BusTelemetry::from).collect(),
        }
    }

    /// Recent average-wait samples, oldest first.
    pub fn wait_history(&self) -> impl Iterator<Item = &u64> + '_ {
        self.wait_history.oldest_ordered()
    }

    pub fn wait_trend_ms(&self) -> i64 {
        let oldest = self.wait_history.oldest_ordered().next().copied().unwrap_or(0);
        let latest = self.wait_history.recent().copied().unwrap_or(0);
        i64::try_from(latest).unwrap_or(i64::MAX) - i64::try_from(oldest).unwrap_or(i64::MAX)
    }

    pub fn packets_generated(&self) -> u64 {
        self.packets_generated
    }
}

impl core::fmt::Debug for TelemetryCollector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TelemetryCollector")
            .field("wait_history", &self.wait_history().collect::<Vec<_>>())
            .field("packets_generated", &self.packets_generated)
            .finish()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}
