use crate::bus::Bus;
use crate::ids::StopId;
use crate::route::RouteGenerator;
use crate::stops::StopRegistry;
use tracing::info;

/// Stop chosen when no stop has anyone waiting.
pub const DEFAULT_PRIORITY_STOP: StopId = StopId(0);

/// Picks the stop a bus leaving the terminal should make sure to serve.
pub trait DispatchPolicy: Send {
    fn name(&self) -> &'static str;

    fn select_priority_stop(&self, registry: &StopRegistry) -> StopId;
}

/// Greedy policy: the stop with the longest queue right now.
///
/// Ties go to the lowest stop id. When every queue is empty the result is
/// [`DEFAULT_PRIORITY_STOP`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestQueueFirst;

impl DispatchPolicy for LongestQueueFirst {
    fn name(&self) -> &'static str {
        "longest-queue-first"
    }

    fn select_priority_stop(&self, registry: &StopRegistry) -> StopId {
        let mut best = DEFAULT_PRIORITY_STOP;
        let mut best_len = 0;

        // Strictly greater, so the first (lowest) id wins a tie.
        for (stop, len) in registry.stop_ids().zip(registry.queue_lengths()) {
            if len > best_len {
                best = stop;
                best_len = len;
            }
        }

        best
    }
}

/// Give a bus at the terminal its next route, built around the policy's
/// priority stop. Returns the chosen stop, or `None` if the bus is en route.
pub fn dispatch(
    bus: &mut Bus,
    policy: &dyn DispatchPolicy,
    registry: &StopRegistry,
    generator: &mut RouteGenerator,
) -> Option<StopId> {
    if !bus.at_terminal() {
        return None;
    }

    let target = policy.select_priority_stop(registry);
    let route = generator.generate_including(target);
    if !bus.assign_route(route) {
        return None;
    }

    info!(
        bus = %bus.id(),
        policy = policy.name(),
        target = %target,
        route = ?bus.route().stops(),
        "dispatched bus from terminal"
    );
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::BusId;
    use crate::stops::Passenger;

    fn registry_with_queues(lengths: &[usize]) -> StopRegistry {
        let stop_count = u16::try_from(lengths.len()).unwrap();
        let registry = StopRegistry::new(stop_count);
        for (source, &len) in lengths.iter().enumerate() {
            let source = StopId::try_from(source).unwrap();
            let destination = StopId((source.0 + 1) % stop_count);
            for t in 0..len {
                registry
                    .enqueue(Passenger::new(source, destination, t as u64))
                    .unwrap();
            }
        }
        registry
    }

    #[test]
    fn test_longest_queue_selected() {
        let registry = registry_with_queues(&[0, 0, 5, 3]);
        assert_eq!(LongestQueueFirst.select_priority_stop(&registry), StopId(2));
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let registry = registry_with_queues(&[4, 4, 0, 0]);
        assert_eq!(LongestQueueFirst.select_priority_stop(&registry), StopId(0));

        let registry = registry_with_queues(&[1, 6, 2, 6]);
        assert_eq!(LongestQueueFirst.select_priority_stop(&registry), StopId(1));
    }

    #[test]
    fn test_all_empty_selects_default() {
        let registry = registry_with_queues(&[0, 0, 0, 0]);
        assert_eq!(LongestQueueFirst.select_priority_stop(&registry), DEFAULT_PRIORITY_STOP);
    }

    #[test]
    fn test_dispatch_assigns_route_with_target() {
        let registry = registry_with_queues(&[0, 0, 0, 2, 0, 0]);
        let mut generator = RouteGenerator::new(StopId(0), 2, 6, 11).unwrap();
        let mut bus = Bus::new(BusId(0), generator.generate(), 4);

        let target = dispatch(&mut bus, &LongestQueueFirst, &registry, &mut generator);
        assert_eq!(target, Some(StopId(3)));
        assert_eq!(bus.route().stops(), &[StopId(0), StopId(3), StopId(0)]);
        assert_eq!(bus.position(), 0);
    }

    #[test]
    fn test_dispatch_ignored_en_route() {
        let registry = registry_with_queues(&[0, 3, 0, 0]);
        let mut generator = RouteGenerator::new(StopId(0), 4, 4, 1).unwrap();
        let mut bus = Bus::new(BusId(0), generator.generate(), 4);
        bus.advance();
        let before = bus.route().clone();

        assert_eq!(dispatch(&mut bus, &LongestQueueFirst, &registry, &mut generator), None);
        assert_eq!(bus.route(), &before);
        assert_eq!(bus.position(), 1);
    }

    struct AlwaysStop(StopId);

    impl DispatchPolicy for AlwaysStop {
        fn name(&self) -> &'static str {
            "always"
        }

        fn select_priority_stop(&self, _registry: &StopRegistry) -> StopId {
            self.0
        }
    }

    #[test]
    fn test_custom_policy_plugs_in() {
        let registry = registry_with_queues(&[0, 9, 0, 0, 0]);
        let mut generator = RouteGenerator::new(StopId(0), 2, 5, 3).unwrap();
        let mut bus = Bus::new(BusId(0), generator.generate(), 4);

        let target = dispatch(&mut bus, &AlwaysStop(StopId(4)), &registry, &mut generator);
        assert_eq!(target, Some(StopId(4)));
        assert!(bus.route().contains(StopId(4)));
    }
}
