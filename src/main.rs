use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::time::{interval, Duration};
use tracing::{info, Level};

use tracon_sim::airport::demo_airport;
use tracon_sim::command::{ATCCommand, ControllerCommand};
use tracon_sim::config::{Density, ScenarioType, SessionConfig};
use tracon_sim::messages::{OutboundMessage, SessionAction};
use tracon_sim::performance::default_performance_database;
use tracon_sim::session::Session;

#[derive(Parser)]
#[command(name = "tracon-sim")]
#[command(about = "TRACON approach control simulation core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DensityArg {
    Light,
    Moderate,
    Heavy,
}

impl From<DensityArg> for Density {
    fn from(value: DensityArg) -> Self {
        match value {
            DensityArg::Light => Density::Light,
            DensityArg::Moderate => Density::Moderate,
            DensityArg::Heavy => Density::Heavy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    Arrivals,
    Departures,
    Mixed,
}

impl From<ScenarioArg> for ScenarioType {
    fn from(value: ScenarioArg) -> Self {
        match value {
            ScenarioArg::Arrivals => ScenarioType::Arrivals,
            ScenarioArg::Departures => ScenarioType::Departures,
            ScenarioArg::Mixed => ScenarioType::Mixed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a demo session against the bundled EGKK-like airport, printing
    /// every outbound message as it is emitted.
    Run {
        #[arg(short, long, value_enum, default_value = "moderate")]
        density: DensityArg,

        #[arg(short, long, value_enum, default_value = "mixed")]
        scenario: ScenarioArg,

        #[arg(short, long, default_value = "1.0")]
        time_scale: f64,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_target(false).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { density, scenario, time_scale, seed } => run_demo(density.into(), scenario.into(), time_scale, seed).await,
    }
}

/// Drives a `Session` at wall-clock pace, one simulated second per tick
/// scaled by `time_scale`. The tick pipeline itself is synchronous (§5) —
/// only this outer pacing loop is async, matching the donor's
/// `SimulationRunner::run` interval-driven loop.
async fn run_demo(density: Density, scenario_type: ScenarioType, time_scale: f64, seed: u64) -> Result<()> {
    let config = SessionConfig {
        airport: "EGKK".to_string(),
        density,
        scenario_type,
        ..SessionConfig::demo()
    };

    let mut session = Session::new("demo".to_string(), config, demo_airport(), default_performance_database(), seed);

    session.control(SessionAction::Start, None)?;
    for message in session.drain_outbox() {
        log_outbound(&message);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_handle = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("[MAIN] shutdown requested");
        shutdown_handle.store(true, Ordering::SeqCst);
    })?;

    let mut ticker = interval(Duration::from_secs_f64(1.0 / time_scale));

    while !shutdown.load(Ordering::SeqCst) {
        ticker.tick().await;

        if let Err(err) = session.tick() {
            tracing::error!(error = %err, "[MAIN] session-fatal error, ending session");
            session.fail(err);
            for message in session.drain_outbox() {
                log_outbound(&message);
            }
            break;
        }

        for message in session.drain_outbox() {
            log_outbound(&message);
        }
    }

    session.control(SessionAction::End, None)?;
    for message in session.drain_outbox() {
        log_outbound(&message);
    }

    Ok(())
}

fn log_outbound(message: &OutboundMessage) {
    match message {
        OutboundMessage::GameState { state } => {
            info!(tick = state.clock.tick, aircraft = state.aircraft.len(), "[MAIN] game state");
        }
        OutboundMessage::Alert { alert } => {
            info!(message = %alert.message, "[MAIN] alert");
        }
        OutboundMessage::ScoreUpdate { score } => {
            info!(score = score.overall_score, grade = ?score.grade, "[MAIN] score update");
        }
        OutboundMessage::CommandResponse { success, error } => {
            if !success {
                info!(error = ?error, "[MAIN] command rejected");
            }
        }
        OutboundMessage::RadioMessage { transmission } => {
            info!(message = %transmission.message, "[MAIN] radio");
        }
        OutboundMessage::SessionInfo { session } => {
            info!(status = ?session.status, "[MAIN] session info");
        }
        OutboundMessage::AirportData { data } => {
            info!(airport = %data.icao, "[MAIN] airport data loaded");
        }
        OutboundMessage::Error { message } => {
            tracing::error!(message = %message, "[MAIN] error");
        }
    }
}

#[allow(dead_code)]
/// Demonstrates issuing a controller command; wired up for manual testing
/// via a future interactive front end, not invoked by `run_demo` itself.
fn sample_command(callsign: &str) -> ControllerCommand {
    ControllerCommand {
        callsign: callsign.to_string(),
        commands: vec![ATCCommand::Altitude { altitude_ft: 4000.0 }],
        raw_text: "descend and maintain four thousand".to_string(),
        tick: 0,
    }
}
