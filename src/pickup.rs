use crate::bus::Bus;
use crate::metrics::MetricsAggregator;
use crate::stops::StopRegistry;
use std::time::Duration;
use tracing::warn;

/// Move eligible passengers from the queue at the bus's current stop onto the
/// bus, oldest first. Returns how many boarded.
///
/// A passenger is eligible when the bus's route is direct from their source
/// to their destination. Boarding stops as soon as the bus is full; anyone
/// left keeps their place in the queue. Each boarding removes the passenger,
/// adds them to the bus and records their wait while the stop's queue lock is
/// held.
pub fn board_eligible(
    bus: &mut Bus,
    registry: &StopRegistry,
    metrics: &MetricsAggregator,
    now: u64,
) -> usize {
    if bus.is_full() {
        return 0;
    }

    let stop = bus.location();
    let result = registry.with_queue(stop, |queue| {
        let mut boarded = 0;
        let mut index = 0;

        while index < queue.len() && !bus.is_full() {
            let passenger = queue[index];
            if !bus.route().is_direct(passenger.source, passenger.destination) {
                index += 1;
                continue;
            }

            let Some(passenger) = queue.remove(index) else {
                break;
            };
            if let Err(passenger) = bus.board(passenger) {
                queue.insert(index, passenger);
                break;
            }

            metrics.record_boarding(Duration::from_millis(now.saturating_sub(passenger.arrival_time)));
            boarded += 1;
        }

        boarded
    });

    result.unwrap_or_else(|e| {
        warn!(bus = %bus.id(), error = %e, "pickup skipped");
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BusId, StopId};
    use crate::route::Route;
    use crate::stops::Passenger;

    fn bus_at_stop_two(capacity: usize) -> Bus {
        let route = Route::from_stops(vec![StopId(0), StopId(2), StopId(1), StopId(3), StopId(0)]).unwrap();
        let mut bus = Bus::new(BusId(0), route, capacity);
        assert_eq!(bus.advance(), StopId(2));
        bus
    }

    #[test]
    fn test_full_bus_boards_nobody() {
        let registry = StopRegistry::new(4);
        let metrics = MetricsAggregator::new();
        registry.enqueue(Passenger::new(StopId(2), StopId(1), 0)).unwrap();

        let mut bus = bus_at_stop_two(1);
        bus.board(Passenger::new(StopId(0), StopId(2), 0)).unwrap();

        assert_eq!(board_eligible(&mut bus, &registry, &metrics, 10), 0);
        assert_eq!(registry.queue_len(StopId(2)), Ok(1));
        assert_eq!(metrics.totals().boarded, 0);
    }

    #[test]
    fn test_ineligible_passengers_keep_their_place() {
        let registry = StopRegistry::new(4);
        let metrics = MetricsAggregator::new();
        // Stop 1 is not on this route.
        registry.enqueue(Passenger::new(StopId(2), StopId(1), 0)).unwrap();

        let route = Route::from_stops(vec![StopId(0), StopId(3), StopId(2), StopId(0)]).unwrap();
        let mut bus = Bus::new(BusId(0), route, 5);
        bus.advance();
        bus.advance();
        assert_eq!(bus.location(), StopId(2));

        assert_eq!(board_eligible(&mut bus, &registry, &metrics, 5), 0);
        assert_eq!(registry.queue_len(StopId(2)), Ok(1));
        assert_eq!(bus.load(), 0);
    }

    #[test]
    fn test_mixed_queue_boards_only_eligible_in_order() {
        let registry = StopRegistry::new(5);
        let metrics = MetricsAggregator::new();
        registry.enqueue(Passenger::new(StopId(2), StopId(4), 0)).unwrap();
        registry.enqueue(Passenger::new(StopId(2), StopId(3), 1)).unwrap();
        registry.enqueue(Passenger::new(StopId(2), StopId(4), 2)).unwrap();
        registry.enqueue(Passenger::new(StopId(2), StopId(1), 3)).unwrap();

        let mut bus = bus_at_stop_two(10);
        assert_eq!(board_eligible(&mut bus, &registry, &metrics, 10), 2);

        let boarded: Vec<u64> = bus.passengers().iter().map(|p| p.arrival_time).collect();
        assert_eq!(boarded, vec![1, 3]);

        let left: Vec<u64> = registry
            .with_queue(StopId(2), |q| q.iter().map(|p| p.arrival_time).collect())
            .unwrap();
        assert_eq!(left, vec![0, 2]);

        let totals = metrics.totals();
        assert_eq!(totals.boarded, 2);
        assert_eq!(totals.total_wait, Duration::from_millis(9 + 7));
    }

    #[test]
    fn test_arrival_after_now_counts_as_zero_wait() {
        let registry = StopRegistry::new(4);
        let metrics = MetricsAggregator::new();
        registry.enqueue(Passenger::new(StopId(2), StopId(3), 50)).unwrap();

        let mut bus = bus_at_stop_two(2);
        assert_eq!(board_eligible(&mut bus, &registry, &metrics, 10), 1);
        assert_eq!(metrics.totals().total_wait, Duration::ZERO);
    }
}
