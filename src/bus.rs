use crate::ids::{BusId, StopId};
use crate::route::Route;
use crate::stops::Passenger;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusPhase {
    AtTerminal,
    EnRoute,
}

#[derive(Debug, Clone)]
pub struct Bus {
    id: BusId,
    route: Route,
    position: usize,
    capacity: usize,
    passengers: Vec<Passenger>,
}

impl Bus {
    /// New bus parked at the start of `route`.
    pub fn new(id: BusId, route: Route, capacity: usize) -> Self {
        Self {
            id,
            route,
            position: 0,
            capacity,
            passengers: Vec::with_capacity(capacity),
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn location(&self) -> StopId {
        self.route.stops()[self.position]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn load(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_full(&self) -> bool {
        self.passengers.len() >= self.capacity
    }

    pub fn at_terminal(&self) -> bool {
        self.location() == self.route.terminal()
    }

    pub fn phase(&self) -> BusPhase {
        if self.at_terminal() {
            BusPhase::AtTerminal
        } else {
            BusPhase::EnRoute
        }
    }

    /// Move one hop along the route, wrapping past the closing terminal.
    pub fn advance(&mut self) -> StopId {
        self.position = (self.position + 1) % self.route.len();
        self.location()
    }

    /// Replace the route and restart from its first entry. A bus only learns a
    /// new route at the terminal; anywhere else the call is refused.
    pub fn assign_route(&mut self, route: Route) -> bool {
        if !self.at_terminal() {
            return false;
        }
        self.route = route;
        self.position = 0;
        true
    }

    /// Board one passenger. Refused when the bus is full.
    pub fn board(&mut self, passenger: Passenger) -> Result<(), Passenger> {
        if self.is_full() {
            return Err(passenger);
        }
        self.passengers.push(passenger);

        debug_assert!(
            self.passengers.len() <= self.capacity,
            "Bus {} load {} exceeds capacity {}",
            self.id, self.passengers.len(), self.capacity
        );
        Ok(())
    }
}
