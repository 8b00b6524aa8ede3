use crate::config::{validate_route_params, ConfigError};
use crate::ids::StopId;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ordered cyclic sequence of stops, first and last entry being the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(Vec<StopId>);

impl Route {
    /// Wrap an explicit stop sequence. Returns `None` unless the sequence has
    /// at least two entries and starts and ends at the same stop.
    pub fn from_stops(stops: Vec<StopId>) -> Option<Self> {
        match (stops.first(), stops.last()) {
            (Some(first), Some(last)) if stops.len() >= 2 && first == last => Some(Self(stops)),
            _ => None,
        }
    }

    pub fn stops(&self) -> &[StopId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> StopId {
        self.0[0]
    }

    pub fn last(&self) -> StopId {
        self.0[self.0.len() - 1]
    }

    pub fn terminal(&self) -> StopId {
        self.first()
    }

    pub fn get(&self, position: usize) -> Option<StopId> {
        self.0.get(position).copied()
    }

    pub fn contains(&self, stop: StopId) -> bool {
        self.0.contains(&stop)
    }

    /// True when `destination` occurs somewhere after the first occurrence of
    /// `source`. Scans the whole route, not just the part ahead of the bus.
    pub fn is_direct(&self, source: StopId, destination: StopId) -> bool {
        self.0
            .iter()
            .position(|&stop| stop == source)
            .is_some_and(|at| self.0[at + 1..].contains(&destination))
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    InvalidParams(#[from] ConfigError),

    #[error("target stop {target} is outside the valid range 0..{stop_count}")]
    UnknownTarget { target: StopId, stop_count: u16 },
}

/// Build a route of exactly `length` entries: the terminal, `length - 2`
/// distinct non-terminal stops in random order, then the terminal again.
pub fn generate_route<R: Rng + ?Sized>(
    rng: &mut R,
    terminal: StopId,
    length: usize,
    total_stops: u16,
) -> Result<Route, RouteError> {
    validate_route_params(terminal, length, total_stops)?;
    Ok(build_route(rng, terminal, length, total_stops))
}

/// Like [`generate_route`], but `target` is guaranteed to appear. If the random
/// draw missed it, it is spliced in just before the closing terminal, so the
/// route is one entry longer than requested.
pub fn generate_route_including<R: Rng + ?Sized>(
    rng: &mut R,
    terminal: StopId,
    target: StopId,
    length: usize,
    total_stops: u16,
) -> Result<Route, RouteError> {
    if target.0 >= total_stops {
        return Err(RouteError::UnknownTarget {
            target,
            stop_count: total_stops,
        });
    }

    let mut route = generate_route(rng, terminal, length, total_stops)?;
    splice_before_closing_terminal(&mut route, target);
    Ok(route)
}

// Callers have already validated the parameters.
fn build_route<R: Rng + ?Sized>(
    rng: &mut R,
    terminal: StopId,
    length: usize,
    total_stops: u16,
) -> Route {
    let mut candidates: Vec<StopId> = (0..total_stops)
        .map(StopId)
        .filter(|&stop| stop != terminal)
        .collect();
    let (picked, _) = candidates.partial_shuffle(rng, length - 2);

    let mut stops = Vec::with_capacity(length + 1);
    stops.push(terminal);
    stops.extend_from_slice(picked);
    stops.push(terminal);
    Route(stops)
}

fn splice_before_closing_terminal(route: &mut Route, target: StopId) {
    if !route.contains(target) {
        let closing = route.0.len() - 1;
        route.0.insert(closing, target);
    }
}

/// Route source for one simulation run, holding validated parameters and its
/// own seeded RNG.
#[derive(Debug)]
pub struct RouteGenerator {
    rng: SmallRng,
    terminal: StopId,
    route_length: usize,
    stop_count: u16,
}

impl RouteGenerator {
    pub fn new(
        terminal: StopId,
        route_length: usize,
        stop_count: u16,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        validate_route_params(terminal, route_length, stop_count)?;

        Ok(Self {
            rng: SmallRng::seed_from_u64(seed),
            terminal,
            route_length,
            stop_count,
        })
    }

    pub fn terminal(&self) -> StopId {
        self.terminal
    }

    pub fn generate(&mut self) -> Route {
        build_route(&mut self.rng, self.terminal, self.route_length, self.stop_count)
    }

    /// Stops outside the registry are ignored and yield a plain random route.
    pub fn generate_including(&mut self, target: StopId) -> Route {
        let mut route = self.generate();
        if target.0 < self.stop_count {
            splice_before_closing_terminal(&mut route, target);
        }
        route
    }
}
