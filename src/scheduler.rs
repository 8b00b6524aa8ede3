use crate::bus::Bus;
use crate::config::{ConfigError, SimConfig};
use crate::dispatch::{dispatch, DispatchPolicy};
use crate::ids::{BusId, StopId};
use crate::metrics::MetricsAggregator;
use crate::pickup::board_eligible;
use crate::route::RouteGenerator;
use crate::stops::StopRegistry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What one bus did during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStep {
    pub bus: BusId,
    /// Priority stop of the new route, if the bus was dispatched this tick.
    pub dispatched: Option<StopId>,
    pub arrived_at: StopId,
    pub boarded: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub timestamp: u64,
    pub steps: Vec<BusStep>,
}

impl TickReport {
    pub fn total_boarded(&self) -> usize {
        self.steps.iter().map(|step| step.boarded).sum()
    }

    pub fn dispatch_count(&self) -> usize {
        self.steps.iter().filter(|step| step.dispatched.is_some()).count()
    }
}

/// Advances the fleet one route hop per tick.
///
/// Buses are handled strictly one after another in fleet order, so each
/// dispatch decision sees the queues as the previous bus left them.
pub struct MovementScheduler {
    fleet: Vec<Bus>,
    policy: Box<dyn DispatchPolicy>,
    generator: RouteGenerator,
    tick_count: u64,
}

impl MovementScheduler {
    pub fn new(fleet: Vec<Bus>, policy: Box<dyn DispatchPolicy>, generator: RouteGenerator) -> Self {
        Self {
            fleet,
            policy,
            generator,
            tick_count: 0,
        }
    }

    /// Build the configured fleet, every bus parked at the terminal with an
    /// initial random route.
    pub fn from_config(
        config: &SimConfig,
        policy: Box<dyn DispatchPolicy>,
        route_seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut generator =
            RouteGenerator::new(config.terminal, config.route_length, config.stop_count, route_seed)?;
        let fleet = (0..config.fleet_size)
            .map(|id| Bus::new(BusId(id), generator.generate(), config.bus_capacity))
            .collect();

        Ok(Self::new(fleet, policy, generator))
    }

    pub fn fleet(&self) -> &[Bus] {
        &self.fleet
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn terminal(&self) -> StopId {
        self.generator.terminal()
    }

    /// Run one tick at time `now` (ms since simulation start). For each bus:
    /// dispatch if it is at the terminal, move one hop, then board.
    pub fn tick(
        &mut self,
        registry: &StopRegistry,
        metrics: &MetricsAggregator,
        now: u64,
    ) -> TickReport {
        self.tick_count += 1;
        let mut steps = Vec::with_capacity(self.fleet.len());

        for bus in &mut self.fleet {
            let dispatched = dispatch(bus, self.policy.as_ref(), registry, &mut self.generator);
            let arrived_at = bus.advance();
            let boarded = board_eligible(bus, registry, metrics, now);

            debug!(
                tick = self.tick_count,
                bus = %bus.id(),
                stop = %arrived_at,
                boarded,
                load = bus.load(),
                waiting_here = registry.queue_len(arrived_at).unwrap_or(0),
                average_wait_ms = metrics.average_wait().as_millis() as u64,
                "bus step"
            );

            steps.push(BusStep {
                bus: bus.id(),
                dispatched,
                arrived_at,
                boarded,
            });
        }

        TickReport {
            tick: self.tick_count,
            timestamp: now,
            steps,
        }
    }
}

impl core::fmt::Debug for MovementScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MovementScheduler")
            .field("fleet", &self.fleet)
            .field("policy", &self.policy.name())
            .field("generator", &self.generator)
            .field("tick_count", &self.tick_count)
            .finish()
    }
}
