use crate::config::SimConfig;
use crate::ids::StopId;
use crate::simulation::SimClock;
use crate::stops::{Passenger, StopError, StopRegistry};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Random passenger source: uniform source stop, uniform destination among
/// the other stops, uniform delay between arrivals.
#[derive(Debug)]
pub struct ArrivalFeed {
    rng: SmallRng,
    stop_count: u16,
    min_interval_ms: u64,
    max_interval_ms: u64,
    generated: u64,
}

impl ArrivalFeed {
    /// `config` must already be validated.
    pub fn new(config: &SimConfig, seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            stop_count: config.stop_count,
            min_interval_ms: config.arrival_min_interval_ms,
            max_interval_ms: config.arrival_max_interval_ms,
            generated: 0,
        }
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    pub fn draw_passenger(&mut self, now: u64) -> Passenger {
        let source = self.rng.gen_range(0..self.stop_count);
        // Draw from the remaining stops and skip over the source.
        let mut destination = self.rng.gen_range(0..self.stop_count - 1);
        if destination >= source {
            destination += 1;
        }
        Passenger::new(StopId(source), StopId(destination), now)
    }

    pub fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.gen_range(self.min_interval_ms..=self.max_interval_ms))
    }

    /// Draw one passenger and queue them at their source stop.
    pub fn arrive(&mut self, registry: &StopRegistry, now: u64) -> Result<Passenger, StopError> {
        let passenger = self.draw_passenger(now);
        registry.enqueue(passenger)?;
        self.generated += 1;
        Ok(passenger)
    }

    /// Feed passengers into `registry` until `shutdown` flips to `true` or its
    /// sender is dropped. Returns the feed so its counters can be read.
    pub async fn run(
        mut self,
        registry: Arc<StopRegistry>,
        clock: SimClock,
        mut shutdown: watch::Receiver<bool>,
    ) -> Self {
        while !*shutdown.borrow() {
            match self.arrive(&registry, clock.now_ms()) {
                Ok(passenger) => debug!(
                    source = %passenger.source,
                    destination = %passenger.destination,
                    at = passenger.arrival_time,
                    "passenger arrived"
                ),
                Err(e) => warn!(error = %e, "arrival dropped"),
            }

            let delay = self.next_delay();
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self
    }
}
