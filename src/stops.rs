use crate::ids::StopId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passenger {
    pub source: StopId,
    pub destination: StopId,
    /// Milliseconds since simulation start.
    pub arrival_time: u64,
}

impl Passenger {
    pub fn new(source: StopId, destination: StopId, arrival_time: u64) -> Self {
        Self {
            source,
            destination,
            arrival_time,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StopError {
    #[error("stop {0} is not registered")]
    UnknownStop(StopId),

    #[error("passenger source and destination are both stop {0}")]
    SameSourceAndDestination(StopId),
}

/// Waiting passengers at one stop, oldest first.
pub type PassengerQueue = VecDeque<Passenger>;

#[derive(Debug)]
struct Stop {
    id: StopId,
    queue: Mutex<PassengerQueue>,
}

/// Fixed set of stops, each guarding its own queue.
///
/// The arrival feed and the movement scheduler touch the same queues from
/// different tasks. Every access goes through the stop's lock, held only for
/// one append or one scan-and-remove pass.
#[derive(Debug)]
pub struct StopRegistry {
    stops: Vec<Stop>,
}

impl StopRegistry {
    pub fn new(stop_count: u16) -> Self {
        let stops = (0..stop_count)
            .map(|id| Stop {
                id: StopId(id),
                queue: Mutex::new(VecDeque::new()),
            })
            .collect();

        Self { stops }
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn contains(&self, stop: StopId) -> bool {
        stop.index() < self.stops.len()
    }

    pub fn stop_ids(&self) -> impl Iterator<Item = StopId> + '_ {
        self.stops.iter().map(|stop| stop.id)
    }

    /// Append a passenger to the queue at its source stop.
    pub fn enqueue(&self, passenger: Passenger) -> Result<(), StopError> {
        if passenger.source == passenger.destination {
            return Err(StopError::SameSourceAndDestination(passenger.source));
        }
        if !self.contains(passenger.destination) {
            return Err(StopError::UnknownStop(passenger.destination));
        }

        let mut queue = self.lock(passenger.source)?;
        queue.push_back(passenger);
        Ok(())
    }

    pub fn queue_len(&self, stop: StopId) -> Result<usize, StopError> {
        Ok(self.lock(stop)?.len())
    }

    /// Queue lengths indexed by stop id. Each stop is read under its own lock,
    /// so the snapshot is consistent per stop but not across stops.
    pub fn queue_lengths(&self) -> Vec<usize> {
        self.stops
            .iter()
            .map(|stop| lock_queue(&stop.queue).len())
            .collect()
    }

    pub fn total_waiting(&self) -> usize {
        self.queue_lengths().iter().sum()
    }

    /// Run `f` with exclusive access to one stop's queue.
    pub fn with_queue<R>(
        &self,
        stop: StopId,
        f: impl FnOnce(&mut PassengerQueue) -> R,
    ) -> Result<R, StopError> {
        let mut queue = self.lock(stop)?;
        Ok(f(&mut queue))
    }

    fn lock(&self, stop: StopId) -> Result<MutexGuard<'_, PassengerQueue>, StopError> {
        self.stops
            .get(stop.index())
            .map(|s| lock_queue(&s.queue))
            .ok_or(StopError::UnknownStop(stop))
    }
}

// A panic while holding a queue lock cannot leave a half-applied push or
// remove behind, so a poisoned queue is still usable.
fn lock_queue(queue: &Mutex<PassengerQueue>) -> MutexGuard<'_, PassengerQueue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_registry_creation() {
        let registry = StopRegistry::new(4);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.queue_lengths(), vec![0, 0, 0, 0]);
        assert_eq!(registry.stop_ids().collect::<Vec<_>>(), vec![StopId(0), StopId(1), StopId(2), StopId(3)]);
    }

    #[test]
    fn test_enqueue_preserves_arrival_order() {
        let registry = StopRegistry::new(4);
        registry.enqueue(Passenger::new(StopId(2), StopId(1), 10)).unwrap();
        registry.enqueue(Passenger::new(StopId(2), StopId(3), 11)).unwrap();

        let times: Vec<u64> = registry
            .with_queue(StopId(2), |queue| queue.iter().map(|p| p.arrival_time).collect())
            .unwrap();
        assert_eq!(times, vec![10, 11]);
        assert_eq!(registry.queue_len(StopId(2)), Ok(2));
        assert_eq!(registry.total_waiting(), 2);
    }

    #[test]
    fn test_enqueue_rejects_invalid_passengers() {
        let registry = StopRegistry::new(4);
        assert_eq!(
            registry.enqueue(Passenger::new(StopId(1), StopId(1), 0)),
            Err(StopError::SameSourceAndDestination(StopId(1)))
        );
        assert_eq!(
            registry.enqueue(Passenger::new(StopId(9), StopId(1), 0)),
            Err(StopError::UnknownStop(StopId(9)))
        );
        assert_eq!(
            registry.enqueue(Passenger::new(StopId(1), StopId(9), 0)),
            Err(StopError::UnknownStop(StopId(9)))
        );
        assert_eq!(registry.total_waiting(), 0);
    }

    #[test]
    fn test_concurrent_enqueue_loses_nothing() {
        let registry = Arc::new(StopRegistry::new(3));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for t in 0..250 {
                        registry.enqueue(Passenger::new(StopId(1), StopId(2), t)).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.queue_len(StopId(1)), Ok(1000));
    }
}
