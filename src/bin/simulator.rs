use busdispatch::config::SimConfig;
use busdispatch::ids::StopId;
use busdispatch::simulation::{SimSummary, Simulation};
use clap::{App, Arg, ArgMatches};
use colored::*;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("busdispatch-simulator")
        .version("0.1.0")
        .author("Transit Systems Engineering Team")
        .about("🚌 Bus Dispatch Simulator - greedy fleet dispatch against random passenger demand")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON config file; command-line flags override its values")
                .takes_value(true),
        )
        .arg(numeric_arg("stops", "Number of stops"))
        .arg(numeric_arg("buses", "Number of buses in the fleet"))
        .arg(numeric_arg("capacity", "Passengers per bus"))
        .arg(numeric_arg("route-length", "Stops per generated route, terminal included twice"))
        .arg(numeric_arg("terminal", "Terminal stop id"))
        .arg(numeric_arg("tick-ms", "Milliseconds between scheduler ticks"))
        .arg(numeric_arg("seed", "RNG seed for reproducible runs"))
        .arg(numeric_arg("ticks", "Stop after this many ticks instead of waiting for Ctrl+C"))
        .arg(
            Arg::with_name("json")
                .long("json")
                .help("Print one telemetry JSON line per tick"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log every bus step"),
        )
        .get_matches();

    let level = if matches.is_present("verbose") { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = build_config(&matches)?;

    println!("{}", "🚌 Bus Dispatch Simulator".bold());
    println!("==========================");

    let sim = Simulation::new(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let max_ticks: Option<u64> = parse_opt(&matches, "ticks")?;
    let print_json = matches.is_present("json");

    let observer = tokio::spawn(observe(sim.subscribe(), Arc::clone(&shutdown_tx), max_ticks, print_json));
    let run = tokio::spawn(sim.run(shutdown_rx));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
        () = wait_for_shutdown(shutdown_tx.subscribe()) => {}
    }

    let summary = run.await??;
    observer.abort();
    print_summary(&summary);

    Ok(())
}

fn numeric_arg<'a>(name: &'a str, help: &'a str) -> Arg<'a, 'a> {
    Arg::with_name(name)
        .long(name)
        .value_name("N")
        .help(help)
        .takes_value(true)
        .validator(|v| match v.parse::<u64>() {
            Ok(_) => Ok(()),
            Err(_) => Err("Value must be a non-negative integer".into()),
        })
}

fn parse_opt<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    matches
        .value_of(name)
        .map(|raw| raw.parse::<T>().map_err(|e| format!("--{}: {}", name, e)))
        .transpose()
}

fn build_config(matches: &ArgMatches) -> Result<SimConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.value_of("config") {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(v) = parse_opt(matches, "stops")? {
        config.stop_count = v;
    }
    if let Some(v) = parse_opt(matches, "buses")? {
        config.fleet_size = v;
    }
    if let Some(v) = parse_opt(matches, "capacity")? {
        config.bus_capacity = v;
    }
    if let Some(v) = parse_opt(matches, "route-length")? {
        config.route_length = v;
    }
    if let Some(v) = parse_opt(matches, "terminal")? {
        config.terminal = StopId(v);
    }
    if let Some(v) = parse_opt(matches, "tick-ms")? {
        config.tick_period_ms = v;
    }
    if let Some(v) = parse_opt(matches, "seed")? {
        config.seed = Some(v);
    }

    config.validate()?;
    Ok(config)
}

/// Print telemetry and request shutdown once `max_ticks` have run.
async fn observe(
    mut telemetry_rx: broadcast::Receiver<busdispatch::FleetTelemetry>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    max_ticks: Option<u64>,
    print_json: bool,
) {
    loop {
        match telemetry_rx.recv().await {
            Ok(telemetry) => {
                if print_json {
                    match serde_json::to_string(&telemetry) {
                        Ok(line) => println!("{}", line),
                        Err(e) => error!("Failed to encode telemetry: {}", e),
                    }
                } else {
                    info!(
                        "⏱️  tick {} | avg wait {} ms | boarded {} | waiting {}",
                        telemetry.tick,
                        telemetry.average_wait_ms,
                        telemetry.total_boarded,
                        telemetry.total_waiting
                    );
                }

                if max_ticks.is_some_and(|max| telemetry.tick >= max) {
                    let _ = shutdown_tx.send(true);
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                info!("Telemetry observer skipped {} ticks", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn wait_for_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}

fn print_summary(summary: &SimSummary) {
    println!();
    println!("{}", "📊 Simulation Summary".bold());
    println!("  Ticks run:            {}", summary.ticks.to_string().cyan());
    println!("  Passengers generated: {}", summary.passengers_generated.to_string().cyan());
    println!("  Passengers boarded:   {}", summary.total_boarded.to_string().green());
    println!("  Still waiting:        {}", summary.still_waiting.to_string().yellow());
    println!(
        "  Average wait:         {}",
        format!("{:.3} s", summary.average_wait.as_secs_f64()).bold()
    );
    println!("🛑 Bus Dispatch Simulator stopped");
}
