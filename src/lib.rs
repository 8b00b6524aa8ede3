//! # Bus Dispatch Simulator
//!
//! A small fixed-size bus fleet serving random passenger demand across a
//! fixed set of stops, used to study how a dynamic dispatch policy affects
//! average passenger waiting time.
//!
//! ## Features
//!
//! - **Route generation**: random cyclic routes through a terminal, optionally
//!   forced to include a priority stop
//! - **Dispatch policies**: pluggable [`DispatchPolicy`] trait with a greedy
//!   longest-queue-first default
//! - **Pickup**: capacity-bounded, arrival-ordered boarding of passengers the
//!   route can carry directly
//! - **Metrics**: running average waiting time, safe to read while the
//!   simulation is live
//! - **Telemetry**: one JSON-serializable fleet snapshot per tick
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use busdispatch::{SimConfig, Simulation};
//! use tokio::sync::watch;
//!
//! # async fn demo() -> Result<(), busdispatch::SimError> {
//! let sim = Simulation::new(SimConfig::default())?;
//! let metrics = sim.metrics();
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let run = tokio::spawn(sim.run(shutdown_rx));
//! tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//! println!("average wait so far: {:?}", metrics.average_wait());
//!
//! let _ = shutdown_tx.send(true);
//! let summary = run.await.expect("simulation task panicked")?;
//! println!("boarded {} passengers", summary.total_boarded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`stops`] - Stop registry and per-stop passenger queues
//! - [`route`] - Route representation and generation
//! - [`dispatch`] - Priority stop selection at the terminal
//! - [`pickup`] - Boarding rules
//! - [`scheduler`] - Per-tick fleet movement
//! - [`metrics`] - Waiting-time aggregation
//! - [`telemetry`] - Per-tick fleet snapshots
//! - [`arrivals`] - Random passenger arrival feed
//! - [`simulation`] - Task wiring and shutdown

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod arrivals;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod ids;
pub mod metrics;
pub mod pickup;
pub mod route;
pub mod scheduler;
pub mod simulation;
pub mod stops;
pub mod telemetry;

// Re-export main public types for convenience
pub use bus::{Bus, BusPhase};
pub use config::{ConfigError, SimConfig};
pub use dispatch::{DispatchPolicy, LongestQueueFirst};
pub use ids::{BusId, StopId};
pub use metrics::MetricsAggregator;
pub use route::{Route, RouteGenerator};
pub use scheduler::{MovementScheduler, TickReport};
pub use simulation::{SimError, SimSummary, Simulation};
pub use stops::{Passenger, StopRegistry};
pub use telemetry::FleetTelemetry;
