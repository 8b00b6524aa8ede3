use crate::arrivals::ArrivalFeed;
use crate::config::{ConfigError, SimConfig};
use crate::dispatch::{DispatchPolicy, LongestQueueFirst};
use crate::metrics::MetricsAggregator;
use crate::scheduler::MovementScheduler;
use crate::stops::StopRegistry;
use crate::telemetry::{FleetTelemetry, TelemetryCollector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

const TELEMETRY_BROADCAST_BUFFER_SIZE: usize = 256;

// 64-bit fractional golden ratio; decorrelates the arrival RNG from the route RNG.
const SEED_MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("simulation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Milliseconds since the simulation started. Shared by the arrival feed and
/// the scheduler so their timestamps are comparable.
#[derive(Debug, Clone, Copy)]
pub struct SimClock {
    start: Instant,
}

impl SimClock {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimSummary {
    pub ticks: u64,
    pub passengers_generated: u64,
    pub total_boarded: u64,
    pub average_wait: Duration,
    pub still_waiting: usize,
}

/// One simulation run: the shared stop registry and metrics, plus the
/// scheduler and arrival feed that run against them as separate tasks.
pub struct Simulation {
    config: SimConfig,
    registry: Arc<StopRegistry>,
    metrics: Arc<MetricsAggregator>,
    scheduler: MovementScheduler,
    arrivals: ArrivalFeed,
    collector: TelemetryCollector,
    telemetry_tx: broadcast::Sender<FleetTelemetry>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_policy(config, Box::new(LongestQueueFirst))
    }

    /// Validate `config` and build every component. Nothing is running yet.
    pub fn with_policy(config: SimConfig, policy: Box<dyn DispatchPolicy>) -> Result<Self, SimError> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let scheduler = MovementScheduler::from_config(&config, policy, seed)?;
        let arrivals = ArrivalFeed::new(&config, seed ^ SEED_MIXING_CONSTANT);
        let (telemetry_tx, _) = broadcast::channel(TELEMETRY_BROADCAST_BUFFER_SIZE);

        info!(
            stops = config.stop_count,
            buses = config.fleet_size,
            capacity = config.bus_capacity,
            route_length = config.route_length,
            terminal = %config.terminal,
            policy = scheduler.policy_name(),
            seed,
            "simulation initialized"
        );

        Ok(Self {
            registry: Arc::new(StopRegistry::new(config.stop_count)),
            metrics: Arc::new(MetricsAggregator::new()),
            config,
            scheduler,
            arrivals,
            collector: TelemetryCollector::new(),
            telemetry_tx,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<StopRegistry> {
        Arc::clone(&self.registry)
    }

    /// Read-only handle for observers; safe to query while the run is live.
    pub fn metrics(&self) -> Arc<MetricsAggregator> {
        Arc::clone(&self.metrics)
    }

    pub fn scheduler(&self) -> &MovementScheduler {
        &self.scheduler
    }

    /// Receive one [`FleetTelemetry`] per tick.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetTelemetry> {
        self.telemetry_tx.subscribe()
    }

    /// Run the arrival feed and the tick loop until `shutdown` becomes `true`
    /// (or its sender is dropped).
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<SimSummary, SimError> {
        let Simulation {
            config,
            registry,
            metrics,
            mut scheduler,
            arrivals,
            mut collector,
            telemetry_tx,
        } = self;
        let clock = SimClock::start();

        let arrival_task = tokio::spawn(arrivals.run(Arc::clone(&registry), clock, shutdown.clone()));

        let tick_registry = Arc::clone(&registry);
        let tick_metrics = Arc::clone(&metrics);
        let mut tick_shutdown = shutdown;
        let tick_period = Duration::from_millis(config.tick_period_ms);
        let tick_task = tokio::spawn(async move {
            let mut interval = time::interval(tick_period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while !*tick_shutdown.borrow() {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = tick_shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                }

                let report = scheduler.tick(&tick_registry, &tick_metrics, clock.now_ms());
                let telemetry = collector.collect(&report, &scheduler, &tick_registry, &tick_metrics);

                if telemetry_tx.receiver_count() > 0 {
                    if let Err(e) = telemetry_tx.send(telemetry) {
                        warn!("Failed to broadcast telemetry: {}", e);
                    }
                }
            }

            scheduler.tick_count()
        });

        let (arrivals, ticks) = tokio::join!(arrival_task, tick_task);
        let arrivals = arrivals?;
        let ticks = ticks?;

        let totals = metrics.totals();
        let summary = SimSummary {
            ticks,
            passengers_generated: arrivals.generated(),
            total_boarded: totals.boarded,
            average_wait: totals.average(),
            still_waiting: registry.total_waiting(),
        };

        info!(
            ticks = summary.ticks,
            boarded = summary.total_boarded,
            average_wait_ms = u64::try_from(summary.average_wait.as_millis()).unwrap_or(u64::MAX),
            still_waiting = summary.still_waiting,
            "simulation stopped"
        );

        Ok(summary)
    }
}

impl core::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("metrics", &self.metrics.totals())
            .finish_non_exhaustive()
    }
}
