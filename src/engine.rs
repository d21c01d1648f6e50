//! SimulationEngine: the per-tick pipeline that owns authoritative aircraft
//! state (§2, §4.1). Grounded on the donor's `SimulationRunner::run`/
//! `update_positions` tick loop, generalized from "update positions and print
//! them" to the full seven-component ordered pipeline §4.1 specifies, and
//! from the donor's per-plane `calculate_position` call to the explicit
//! command → scenario → executor → physics → rollout → conflict → scoring →
//! removal sequence.

use tracing::{info, warn};

use crate::aircraft::manager::AircraftManager;
use crate::aircraft::state::{AircraftCategory, AircraftId, AircraftState, FlightPhase};
use crate::airport::AirportData;
use crate::command::{self, ControllerCommand};
use crate::conflict::{Alert, ConflictDetector};
use crate::config::SessionConfig;
use crate::error::CommandError;
use crate::executor::FlightPlanExecutor;
use crate::geo;
use crate::performance::PerformanceDatabase;
use crate::physics::PhysicsEngine;
use crate::scenario_generator::ScenarioGenerator;
use crate::scoring::ScoringEngine;
use crate::weather::WeatherState;

/// Aircraft beyond this range from the airport, once handed off, are
/// considered to have left the TRACON and are removed (§3 lifecycle).
const AIRSPACE_BOUNDARY_NM: f64 = 60.0;

/// Safety valve for the "aged out after rollout > N minutes" lifecycle
/// clause (§3) — ground rollout normally completes in well under a minute,
/// so this only fires for an aircraft stuck on the runway by a modeling bug.
const ROLLOUT_AGE_OUT_TICKS: u64 = 5 * 60;

/// Consecutive per-aircraft execution faults before the aircraft is removed
/// rather than merely degraded (§7.2 ambient error handling).
const DEGRADED_REMOVAL_THRESHOLD: u8 = 3;

/// Result of one `SimulationEngine::tick` call: everything the owning
/// `Session` needs to translate into outbound messages (§6).
pub struct TickOutput {
    pub new_alerts: Vec<Alert>,
    pub command_results: Vec<(ControllerCommand, Result<(), CommandError>)>,
    pub removed: Vec<AircraftState>,
}

pub struct SimulationEngine {
    pub airport: AirportData,
    pub weather: WeatherState,
    pub tick_count: u64,
    config: SessionConfig,
    performance_db: PerformanceDatabase,
    manager: AircraftManager,
    executor: FlightPlanExecutor,
    physics: PhysicsEngine,
    conflict: ConflictDetector,
    scoring: ScoringEngine,
    scenario: ScenarioGenerator,
    rollout_start_tick: std::collections::HashMap<AircraftId, u64>,
}

impl SimulationEngine {
    pub fn new(config: SessionConfig, airport: AirportData, performance_db: PerformanceDatabase, seed: u64) -> Self {
        let mut weather = config.initial_weather.clone();
        weather.clamp_for_playability();
        Self {
            airport,
            weather,
            tick_count: 0,
            config,
            performance_db,
            manager: AircraftManager::new(),
            executor: FlightPlanExecutor::new(),
            physics: PhysicsEngine::new(),
            conflict: ConflictDetector::new(),
            scoring: ScoringEngine::new(),
            scenario: ScenarioGenerator::new(seed),
            rollout_start_tick: std::collections::HashMap::new(),
        }
    }

    /// Session-start staggered population (§4.6), run once when a session
    /// transitions `lobby -> running`.
    pub fn pre_spawn(&mut self) {
        self.scenario.pre_spawn(&mut self.manager, &self.airport, &self.performance_db, &self.config);
        info!(count = self.manager.len(), "[ENGINE] pre-spawned session population");
    }

    pub fn aircraft(&self) -> impl Iterator<Item = &AircraftState> {
        self.manager.iter()
    }

    pub fn find_aircraft(&self, callsign: &str) -> Option<&AircraftState> {
        self.manager.find_by_callsign(callsign)
    }

    pub fn score(&self) -> crate::scoring::ScoreSnapshot {
        self.scoring.snapshot()
    }

    /// Allocates the next aircraft id without inserting anything — used by
    /// callers (scenario generator, or a test/fixture) that need the id
    /// before the `AircraftState` itself can be built.
    pub fn next_aircraft_id(&mut self) -> AircraftId {
        self.manager.next_id()
    }

    /// Inserts an already-built aircraft directly, bypassing the scenario
    /// generator. Used by fixture-driven scenario tests that need to place
    /// an aircraft in an exact position/configuration the generator's
    /// procedural spawning can't target.
    pub fn insert_aircraft(&mut self, aircraft: AircraftState) {
        self.manager.insert(aircraft);
    }

    /// Runs the §4.1 pipeline exactly once. `commands` are the controller
    /// commands queued since the previous tick; `time_scale` only affects
    /// the scenario generator's spawn-interval math (§4.6), since the tick
    /// itself always advances exactly one simulated second regardless of
    /// wall-clock pacing (§4.1).
    pub fn tick(&mut self, commands: Vec<ControllerCommand>, time_scale: f64) -> TickOutput {
        let command_results = self.apply_commands(commands);

        self.scenario.update(self.tick_count, time_scale, &mut self.manager, &self.airport, &self.performance_db, &self.config);

        self.run_executor();
        self.run_physics();
        self.run_ground_rollout();

        let snapshot_for_conflict: Vec<AircraftState> = self.manager.iter().cloned().collect();
        let scan = self.conflict.scan(&snapshot_for_conflict, &self.airport);

        for alert in &scan.new_alerts {
            self.scoring.record_alert(alert);
        }
        self.scoring.accumulate_violation_duration(&scan.active_violation_pairs);
        self.scoring.update();
        self.scoring.check_handoff_penalties(&snapshot_for_conflict, &self.airport, self.tick_count);

        let removed = self.apply_removals();

        self.tick_count += 1;

        TickOutput { new_alerts: scan.new_alerts, command_results, removed }
    }

    fn apply_commands(&mut self, commands: Vec<ControllerCommand>) -> Vec<(ControllerCommand, Result<(), CommandError>)> {
        let mut results = Vec::with_capacity(commands.len());
        for cmd in commands {
            self.scoring.record_command_issued();
            let result = command::dispatch(&cmd, &mut self.manager, &self.airport, &self.config.runway_config, &self.weather);
            if result.is_err() {
                self.scoring.record_bad_command();
            }
            results.push((cmd, result));
        }
        results
    }

    fn run_executor(&mut self) {
        let snapshot: Vec<AircraftState> = self.manager.iter().cloned().collect();
        let tick = self.tick_count;
        for id in self.manager.ids_in_order() {
            let Some(ac) = self.manager.get_mut(id) else { continue };
            match self.executor.execute(ac, &snapshot, &self.airport, tick) {
                Ok(()) => ac.degraded_ticks = 0,
                Err(e) => self.mark_degraded(id, &format!("executor fault: {e}")),
            }
        }
    }

    fn run_physics(&mut self) {
        let tick = self.tick_count;
        for id in self.manager.ids_in_order() {
            let Some(ac) = self.manager.get_mut(id) else { continue };
            if let Err(e) = self.physics.update_aircraft(ac, &self.weather, 1.0) {
                self.mark_degraded(id, &format!("physics fault: {e}"));
                continue;
            }
            ac.push_history(tick);
        }
    }

    fn run_ground_rollout(&mut self) {
        let tick = self.tick_count;
        for id in self.manager.ids_in_order() {
            let Some(ac) = self.manager.get_mut(id) else { continue };
            if ac.runway_occupying.is_none() {
                continue;
            }
            self.rollout_start_tick.entry(id).or_insert(tick);
            if let Err(e) = self.physics.update_ground_rollout(ac, 1.0) {
                self.mark_degraded(id, &format!("ground rollout fault: {e}"));
            }
        }
    }

    fn mark_degraded(&mut self, id: AircraftId, reason: &str) {
        let Some(ac) = self.manager.get_mut(id) else { return };
        ac.degraded_ticks = ac.degraded_ticks.saturating_add(1);
        warn!(callsign = %ac.callsign, reason, degraded_ticks = ac.degraded_ticks, "[ENGINE] per-aircraft execution fault");
        if ac.degraded_ticks >= DEGRADED_REMOVAL_THRESHOLD {
            info!(callsign = %ac.callsign, "[ENGINE] removing aircraft after repeated execution faults");
            self.manager.queue_removal(id);
        }
    }

    /// §3 lifecycle termination conditions, decided after every component
    /// has run this tick.
    fn apply_removals(&mut self) -> Vec<AircraftState> {
        let tick = self.tick_count;
        for id in self.manager.ids_in_order() {
            let Some(ac) = self.manager.get(id) else { continue };

            if ac.flight_phase == FlightPhase::Landed && ac.runway_occupying.is_none() {
                let delay_sec = tick.saturating_sub(ac.spawned_at_tick) as f64;
                self.scoring.record_aircraft_handled(delay_sec);
                self.manager.queue_removal(id);
                self.rollout_start_tick.remove(&id);
                continue;
            }

            if ac.category == AircraftCategory::Departure && ac.handing_off {
                let distance = geo::haversine_nm(ac.position, self.airport.reference_position);
                if distance > AIRSPACE_BOUNDARY_NM {
                    let delay_sec = tick.saturating_sub(ac.airborne_since_tick.unwrap_or(ac.spawned_at_tick)) as f64;
                    self.scoring.record_aircraft_handled(delay_sec);
                    self.manager.queue_removal(id);
                    continue;
                }
            }

            if let Some(&started) = self.rollout_start_tick.get(&id) {
                if ac.runway_occupying.is_some() && tick.saturating_sub(started) > ROLLOUT_AGE_OUT_TICKS {
                    warn!(callsign = %ac.callsign, "[ENGINE] aged out stuck on runway after rollout timeout");
                    self.manager.queue_removal(id);
                }
            }
        }

        let removed = self.manager.apply_removals();
        for ac in &removed {
            self.rollout_start_tick.remove(&ac.id);
        }
        removed
    }

    pub fn update_scratch_pad(&mut self, aircraft_id: AircraftId, text: String) {
        if let Some(ac) = self.manager.get_mut(aircraft_id) {
            ac.scratch_pad = text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::demo_airport;
    use crate::performance::default_performance_database;

    fn demo_engine() -> SimulationEngine {
        SimulationEngine::new(SessionConfig::demo(), demo_airport(), default_performance_database(), 1)
    }

    #[test]
    fn pre_spawn_then_tick_runs_without_panicking() {
        let mut engine = demo_engine();
        engine.pre_spawn();
        for _ in 0..50 {
            engine.tick(vec![], 1.0);
        }
        for ac in engine.aircraft() {
            assert!(ac.check_invariants().is_ok(), "{}: {:?}", ac.callsign, ac.check_invariants());
        }
    }

    #[test]
    fn landed_aircraft_is_removed_after_rollout_completes() {
        let mut engine = demo_engine();
        let rwy = engine.airport.runway("16").unwrap().clone();
        let id = engine.manager.next_id();
        let mut ac = crate::scenario_generator_test_support::arrival_on_short_final(id, &rwy);
        ac.speed = 15.0;
        ac.groundspeed = 15.0;
        ac.flight_phase = FlightPhase::Landed;
        ac.on_ground = true;
        ac.runway_occupying = Some(rwy.id.clone());
        engine.manager.insert(ac);

        for _ in 0..5 {
            engine.tick(vec![], 1.0);
        }
        assert!(engine.manager.get(id).is_none(), "aircraft should be removed once rollout completes");
        assert_eq!(engine.score().aircraft_handled, 1);
    }
}
