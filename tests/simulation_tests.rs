use busdispatch::*;
use std::time::Duration;
use tokio::sync::watch;

fn fast_config(seed: u64) -> SimConfig {
    SimConfig {
        stop_count: 6,
        fleet_size: 3,
        bus_capacity: 4,
        route_length: 5,
        tick_period_ms: 5,
        arrival_min_interval_ms: 1,
        arrival_max_interval_ms: 4,
        seed: Some(seed),
        ..SimConfig::default()
    }
}

#[test]
fn test_rejects_unusable_configs() {
    let too_long = SimConfig {
        route_length: 9,
        ..fast_config(1)
    };
    assert!(matches!(
        Simulation::new(too_long),
        Err(SimError::Config(ConfigError::RouteTooLong { .. }))
    ));

    let no_buses = SimConfig {
        fleet_size: 0,
        ..fast_config(1)
    };
    assert!(matches!(
        Simulation::new(no_buses),
        Err(SimError::Config(ConfigError::EmptyFleet))
    ));
}

#[test]
fn test_initial_fleet_parked_at_terminal() {
    let sim = Simulation::new(fast_config(3)).unwrap();
    assert_eq!(sim.scheduler().fleet().len(), 3);
    for bus in sim.scheduler().fleet() {
        assert!(bus.at_terminal());
        assert_eq!(bus.load(), 0);
        assert_eq!(bus.route().len(), 5);
    }
    assert_eq!(sim.metrics().average_wait(), Duration::ZERO);
}

#[tokio::test]
async fn test_live_run_streams_telemetry_and_conserves_passengers() {
    let sim = Simulation::new(fast_config(21)).unwrap();
    let metrics = sim.metrics();
    let mut telemetry = sim.subscribe();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(sim.run(rx));

    let mut last_boarded = 0;
    let mut last_tick = 0;
    for _ in 0..10 {
        let snapshot = telemetry.recv().await.unwrap();
        assert!(snapshot.tick > last_tick);
        assert!(snapshot.total_boarded >= last_boarded);
        assert_eq!(snapshot.buses.len(), 3);
        assert_eq!(snapshot.queue_lengths.len(), 6);
        assert!(snapshot.buses.iter().all(|bus| bus.load <= bus.capacity));
        last_tick = snapshot.tick;
        last_boarded = snapshot.total_boarded;
    }

    // Observers can read metrics while the run is live.
    let live = metrics.totals();
    tx.send(true).unwrap();
    let summary = handle.await.unwrap().unwrap();

    assert!(summary.ticks >= 10);
    assert!(summary.total_boarded >= live.boarded);
    assert_eq!(
        summary.total_boarded + summary.still_waiting as u64,
        summary.passengers_generated
    );
}

#[tokio::test]
async fn test_dropped_shutdown_sender_stops_run() {
    let sim = Simulation::new(fast_config(5)).unwrap();
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(sim.run(rx));

    tokio::time::sleep(Duration::from_millis(30)).await;
    drop(tx);

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(summary.ticks > 0);
}
