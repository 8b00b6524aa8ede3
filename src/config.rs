use crate::ids::StopId;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_STOP_COUNT: u16 = 10;
pub const DEFAULT_FLEET_SIZE: u16 = 5;
pub const DEFAULT_BUS_CAPACITY: usize = 20;
pub const DEFAULT_ROUTE_LENGTH: usize = 7;
pub const DEFAULT_TERMINAL: u16 = 0;
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1000;
pub const DEFAULT_ARRIVAL_MIN_INTERVAL_MS: u64 = 0;
pub const DEFAULT_ARRIVAL_MAX_INTERVAL_MS: u64 = 4000;

// Defaults must pass `SimConfig::validate`.
const_assert!(DEFAULT_STOP_COUNT >= 2);
const_assert!(DEFAULT_TERMINAL < DEFAULT_STOP_COUNT);
const_assert!(DEFAULT_ROUTE_LENGTH >= 2);
const_assert!(DEFAULT_ROUTE_LENGTH <= DEFAULT_STOP_COUNT as usize + 1);
const_assert!(DEFAULT_ARRIVAL_MIN_INTERVAL_MS <= DEFAULT_ARRIVAL_MAX_INTERVAL_MS);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least 2 stops are required, got {0}")]
    TooFewStops(u16),

    #[error("terminal stop {terminal} is outside the valid range 0..{stop_count}")]
    TerminalOutOfRange { terminal: StopId, stop_count: u16 },

    #[error("route length {0} is too short; a route needs at least the terminal twice")]
    RouteTooShort(usize),

    #[error("route length {route_length} needs more intermediate stops than the {stop_count} registered stops provide")]
    RouteTooLong { route_length: usize, stop_count: u16 },

    #[error("fleet must contain at least one bus")]
    EmptyFleet,

    #[error("bus capacity must be positive")]
    ZeroCapacity,

    #[error("tick period must be positive")]
    ZeroTickPeriod,

    #[error("arrival interval is inverted: min {min_ms} ms > max {max_ms} ms")]
    InvertedArrivalInterval { min_ms: u64, max_ms: u64 },

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fixed parameters of a simulation run.
///
/// Every field has a default, so a JSON config file only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Size of the stop registry; valid stop ids are `0..stop_count`.
    pub stop_count: u16,
    /// Number of buses in the fleet.
    pub fleet_size: u16,
    /// Maximum passengers per bus.
    pub bus_capacity: usize,
    /// Stops per generated route, both terminal entries included.
    pub route_length: usize,
    /// Stop at which every route starts and ends.
    pub terminal: StopId,
    /// Wall-clock interval between scheduler ticks.
    pub tick_period_ms: u64,
    pub arrival_min_interval_ms: u64,
    pub arrival_max_interval_ms: u64,
    /// Seed for route and arrival randomness. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            stop_count: DEFAULT_STOP_COUNT,
            fleet_size: DEFAULT_FLEET_SIZE,
            bus_capacity: DEFAULT_BUS_CAPACITY,
            route_length: DEFAULT_ROUTE_LENGTH,
            terminal: StopId(DEFAULT_TERMINAL),
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            arrival_min_interval_ms: DEFAULT_ARRIVAL_MIN_INTERVAL_MS,
            arrival_max_interval_ms: DEFAULT_ARRIVAL_MAX_INTERVAL_MS,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would break the route invariants mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_route_params(self.terminal, self.route_length, self.stop_count)?;

        if self.fleet_size == 0 {
            return Err(ConfigError::EmptyFleet);
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.arrival_min_interval_ms > self.arrival_max_interval_ms {
            return Err(ConfigError::InvertedArrivalInterval {
                min_ms: self.arrival_min_interval_ms,
                max_ms: self.arrival_max_interval_ms,
            });
        }

        Ok(())
    }
}

/// Checks shared by config validation and the route generator.
pub(crate) fn validate_route_params(
    terminal: StopId,
    route_length: usize,
    stop_count: u16,
) -> Result<(), ConfigError> {
    if stop_count < 2 {
        return Err(ConfigError::TooFewStops(stop_count));
    }
    if terminal.0 >= stop_count {
        return Err(ConfigError::TerminalOutOfRange { terminal, stop_count });
    }
    if route_length < 2 {
        return Err(ConfigError::RouteTooShort(route_length));
    }
    if route_length - 2 > usize::from(stop_count) - 1 {
        return Err(ConfigError::RouteTooLong { route_length, stop_count });
    }
    Ok(())
}
