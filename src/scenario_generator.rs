//! ScenarioGenerator: session pre-spawn population and the ongoing spawn
//! clock (§4.6). Grounded on the donor's `scenario::Scenario` (random
//! selection via `rand::seq::SliceRandom`, builder-style fixtures) and
//! `ScenarioBuilder`'s fluent construction, generalized from a fixed route
//! table to procedurally drawn traffic since this crate spawns aircraft
//! rather than replaying a sector-file profile.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::aircraft::manager::AircraftManager;
use crate::aircraft::state::{
    AircraftCategory, AircraftState, Clearances, FlightPhase, FlightPlan, InboundHandoff, RadarHandoffState,
};
use crate::airport::AirportData;
use crate::config::{Density, ScenarioType, SessionConfig};
use crate::geo;
use crate::performance::{self, PerformanceDatabase};

/// (distance_lo, distance_hi, altitude_lo, altitude_hi) in nm / ft, the four
/// arrival distance tiers pre-spawn draws from (§4.6).
const ARRIVAL_TIERS: [(f64, f64, f64, f64); 4] = [
    (40.0, 50.0, 10000.0, 12000.0),
    (30.0, 40.0, 8000.0, 10000.0),
    (20.0, 30.0, 7000.0, 9000.0),
    (10.0, 18.0, 4000.0, 6000.0),
];

const MAINLINE_CARRIERS: &[&str] = &["AAL", "DAL", "UAL", "SWA", "JBU", "NKS", "MXY", "FFT"];
const REGIONAL_CARRIERS: &[&str] = &["RPA", "EDV", "SKW", "PDT", "JIA"];
const CARGO_CARRIERS: &[&str] = &["FDX", "UPS"];

const MAINLINE_TYPES: &[&str] = &["B738", "A320", "A21N", "B737"];
const REGIONAL_TYPES: &[&str] = &["CRJ9", "CRJ7", "CRJ2", "E75L", "E170", "E145"];
const CARGO_TYPES: &[&str] = &["B738"];
const GA_TYPES: &[&str] = &["C172", "C182", "SR22", "C56X", "CL30"];

/// Share of mixed-traffic spawns that are arrivals (§4.6: "mixed: 60%
/// arrivals, plus a small chance of a VFR N-number transit").
const MIXED_ARRIVAL_SHARE: f64 = 0.6;
const VFR_TRANSIT_CHANCE: f64 = 0.08;

pub struct ScenarioGenerator {
    rng: StdRng,
    next_spawn_tick: u64,
}

impl ScenarioGenerator {
    pub fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), next_spawn_tick: 0 }
    }

    /// Staggered population at session start (§4.6 density table). The
    /// spec only gives the mixed-traffic arrival/departure split for
    /// ongoing spawns; pre-spawn reuses the same 60/40 ratio under `mixed`
    /// rather than inventing a separate one (documented in DESIGN.md).
    pub fn pre_spawn(
        &mut self,
        manager: &mut AircraftManager,
        airport: &AirportData,
        performance_db: &PerformanceDatabase,
        config: &SessionConfig,
    ) {
        let count = config.density.pre_spawn_count();
        for i in 0..count {
            let id = manager.next_id();
            let ac = match config.scenario_type {
                ScenarioType::Arrivals => self.spawn_arrival(id, airport, performance_db, config, manager, 0, Some(i)),
                ScenarioType::Departures => {
                    self.spawn_departure(id, airport, performance_db, config, manager, 0, (i + 1) as f64 * 3.0)
                }
                ScenarioType::Mixed => {
                    if self.rng.gen_bool(MIXED_ARRIVAL_SHARE) {
                        self.spawn_arrival(id, airport, performance_db, config, manager, 0, Some(i))
                    } else {
                        self.spawn_departure(id, airport, performance_db, config, manager, 0, (i + 1) as f64 * 3.0)
                    }
                }
            };
            manager.insert(ac);
        }
    }

    /// §4.1 step 2: called once per tick, spawns at most one aircraft.
    pub fn update(
        &mut self,
        tick: u64,
        time_scale: f64,
        manager: &mut AircraftManager,
        airport: &AirportData,
        performance_db: &PerformanceDatabase,
        config: &SessionConfig,
    ) {
        if tick < self.next_spawn_tick {
            return;
        }
        self.next_spawn_tick = tick + spawn_interval_ticks(config.density, time_scale);

        let id = manager.next_id();
        let ac = match config.scenario_type {
            ScenarioType::Arrivals => self.spawn_arrival(id, airport, performance_db, config, manager, tick, None),
            ScenarioType::Departures => {
                let distance = self.rng.gen_range(1.0..5.0);
                self.spawn_departure(id, airport, performance_db, config, manager, tick, distance)
            }
            ScenarioType::Mixed => {
                if self.rng.gen_bool(VFR_TRANSIT_CHANCE) {
                    self.spawn_vfr_transit(id, airport, performance_db, manager, tick)
                } else if self.rng.gen_bool(MIXED_ARRIVAL_SHARE) {
                    self.spawn_arrival(id, airport, performance_db, config, manager, tick, None)
                } else {
                    let distance = self.rng.gen_range(1.0..5.0);
                    self.spawn_departure(id, airport, performance_db, config, manager, tick, distance)
                }
            }
        };
        info!(callsign = %ac.callsign, category = ?ac.category, "[SCENARIO] spawned aircraft");
        manager.insert(ac);
    }

    fn spawn_arrival(
        &mut self,
        id: crate::aircraft::state::AircraftId,
        airport: &AirportData,
        performance_db: &PerformanceDatabase,
        config: &SessionConfig,
        manager: &AircraftManager,
        tick: u64,
        tier_index: Option<usize>,
    ) -> AircraftState {
        let tier = ARRIVAL_TIERS[tier_index.unwrap_or_else(|| self.rng.gen_range(0..ARRIVAL_TIERS.len())) % ARRIVAL_TIERS.len()];
        let distance = self.rng.gen_range(tier.0..tier.1);
        let altitude = self.rng.gen_range(tier.2..tier.3);
        let bearing = self.rng.gen_range(0.0..360.0);
        let position = geo::destination(airport.reference_position, bearing, distance);
        let heading = geo::normalize_heading(bearing + 180.0);

        let runway = config.runway_config.arrival_runways.choose(&mut self.rng).cloned();
        let star = airport.stars.choose(&mut self.rng);
        let descend_via_star = star.is_some_and(|s| s.legs.iter().any(|leg| leg.altitude_constraint.is_some()));

        let (callsign, type_designator) = self.draw_airline_callsign(manager);
        let performance = *performance::lookup(performance_db, &type_designator);

        AircraftState {
            id,
            callsign,
            type_designator,
            wake_category: performance.wake_category,
            position,
            altitude,
            heading,
            speed: 250.0,
            groundspeed: 250.0,
            vertical_speed: 0.0,
            bank_angle: 0.0,
            target_altitude: altitude,
            target_heading: heading,
            target_speed: 250.0,
            on_ground: false,
            flight_phase: FlightPhase::Cruise,
            category: AircraftCategory::Arrival,
            flight_plan: FlightPlan {
                departure: "????".to_string(),
                arrival: airport.icao.clone(),
                cruise_altitude: altitude,
                route: vec![],
                sid: None,
                star: star.map(|s| s.name.clone()),
                runway,
                squawk: random_squawk(&mut self.rng),
            },
            clearances: Clearances { descend_via_star, ..Clearances::default() },
            current_fix_index: 0,
            on_localizer: false,
            on_glideslope: false,
            handing_off: false,
            inbound_handoff: InboundHandoff::Offered,
            inbound_handoff_offered_at: Some(tick),
            radar_handoff_state: RadarHandoffState::None,
            holding_state: None,
            sid_legs: vec![],
            sid_leg_idx: 0,
            missed_approach_leg_idx: 0,
            runway_occupying: None,
            rollout_distance_nm: 0.0,
            visual_follow_traffic_callsign: None,
            history_trail: std::collections::VecDeque::new(),
            scratch_pad: String::new(),
            degraded_ticks: 0,
            spawned_at_tick: tick,
            airborne_since_tick: Some(tick),
            performance,
            approach_geometry: None,
        }
    }

    fn spawn_departure(
        &mut self,
        id: crate::aircraft::state::AircraftId,
        airport: &AirportData,
        performance_db: &PerformanceDatabase,
        config: &SessionConfig,
        manager: &AircraftManager,
        tick: u64,
        distance_nm: f64,
    ) -> AircraftState {
        let runway_id = config
            .runway_config
            .departure_runways
            .choose(&mut self.rng)
            .cloned()
            .or_else(|| airport.runways.first().map(|r| r.id.clone()));
        let rwy = runway_id.as_deref().and_then(|id| airport.runway(id)).or_else(|| airport.runways.first());

        let (bearing, threshold) = rwy.map(|r| (r.true_bearing(), r.threshold)).unwrap_or((0.0, airport.reference_position));
        let position = geo::destination(threshold, bearing, distance_nm);
        let altitude = (500.0 + distance_nm * 400.0).min(8000.0);

        let sid = airport
            .sids
            .iter()
            .filter(|s| s.runway.as_deref().map(|r| Some(r) == runway_id.as_deref()).unwrap_or(true))
            .collect::<Vec<_>>()
            .choose(&mut self.rng)
            .copied();
        let climb_via_sid = sid.is_some_and(|s| s.legs.iter().any(|leg| leg.altitude_constraint.is_some()));

        let (callsign, type_designator) = self.draw_airline_callsign(manager);
        let performance = *performance::lookup(performance_db, &type_designator);

        AircraftState {
            id,
            callsign,
            type_designator,
            wake_category: performance.wake_category,
            position,
            altitude,
            heading: bearing,
            speed: 180.0,
            groundspeed: 180.0,
            vertical_speed: 1500.0,
            bank_angle: 0.0,
            target_altitude: 10000.0,
            target_heading: bearing,
            target_speed: 200.0,
            on_ground: false,
            flight_phase: FlightPhase::Climb,
            category: AircraftCategory::Departure,
            flight_plan: FlightPlan {
                departure: airport.icao.clone(),
                arrival: "????".to_string(),
                cruise_altitude: 30000.0,
                route: vec![],
                sid: sid.map(|s| s.name.clone()),
                runway: runway_id,
                squawk: random_squawk(&mut self.rng),
            },
            clearances: Clearances { climb_via_sid, ..Clearances::default() },
            current_fix_index: 0,
            on_localizer: false,
            on_glideslope: false,
            handing_off: false,
            inbound_handoff: InboundHandoff::None,
            inbound_handoff_offered_at: None,
            radar_handoff_state: RadarHandoffState::None,
            holding_state: None,
            sid_legs: sid.map(|s| s.legs.clone()).unwrap_or_default(),
            sid_leg_idx: 0,
            missed_approach_leg_idx: 0,
            runway_occupying: None,
            rollout_distance_nm: 0.0,
            visual_follow_traffic_callsign: None,
            history_trail: std::collections::VecDeque::new(),
            scratch_pad: String::new(),
            degraded_ticks: 0,
            spawned_at_tick: tick,
            airborne_since_tick: Some(tick),
            performance,
            approach_geometry: None,
        }
    }

    fn spawn_vfr_transit(
        &mut self,
        id: crate::aircraft::state::AircraftId,
        airport: &AirportData,
        performance_db: &PerformanceDatabase,
        manager: &AircraftManager,
        tick: u64,
    ) -> AircraftState {
        let type_designator = GA_TYPES.choose(&mut self.rng).unwrap().to_string();
        let callsign = self.draw_n_number(manager);
        let performance = *performance::lookup(performance_db, &type_designator);

        let bearing = self.rng.gen_range(0.0..360.0);
        let distance = self.rng.gen_range(15.0..35.0);
        let position = geo::destination(airport.reference_position, bearing, distance);
        let altitude = self.rng.gen_range(3000.0..6500.0);
        let heading = geo::normalize_heading(bearing + 180.0 + self.rng.gen_range(-30.0..30.0));

        AircraftState {
            id,
            callsign,
            type_designator,
            wake_category: performance.wake_category,
            position,
            altitude,
            heading,
            speed: 120.0,
            groundspeed: 120.0,
            vertical_speed: 0.0,
            bank_angle: 0.0,
            target_altitude: altitude,
            target_heading: heading,
            target_speed: 120.0,
            on_ground: false,
            flight_phase: FlightPhase::Cruise,
            category: AircraftCategory::Vfr,
            flight_plan: FlightPlan {
                departure: "VFR".to_string(),
                arrival: "VFR".to_string(),
                cruise_altitude: altitude,
                route: vec![],
                sid: None,
                star: None,
                runway: None,
                squawk: "1200".to_string(),
            },
            clearances: Clearances::default(),
            current_fix_index: 0,
            on_localizer: false,
            on_glideslope: false,
            handing_off: false,
            inbound_handoff: InboundHandoff::Offered,
            inbound_handoff_offered_at: Some(tick),
            radar_handoff_state: RadarHandoffState::None,
            holding_state: None,
            sid_legs: vec![],
            sid_leg_idx: 0,
            missed_approach_leg_idx: 0,
            runway_occupying: None,
            rollout_distance_nm: 0.0,
            visual_follow_traffic_callsign: None,
            history_trail: std::collections::VecDeque::new(),
            scratch_pad: String::new(),
            degraded_ticks: 0,
            spawned_at_tick: tick,
            airborne_since_tick: Some(tick),
            performance,
            approach_geometry: None,
        }
    }

    fn draw_airline_callsign(&mut self, manager: &AircraftManager) -> (String, String) {
        let roll: f64 = self.rng.gen_range(0.0..1.0);
        let (carriers, types) = if roll < 0.55 {
            (MAINLINE_CARRIERS, MAINLINE_TYPES)
        } else if roll < 0.85 {
            (REGIONAL_CARRIERS, REGIONAL_TYPES)
        } else {
            (CARGO_CARRIERS, CARGO_TYPES)
        };
        let icao = carriers.choose(&mut self.rng).unwrap();
        let type_designator = types.choose(&mut self.rng).unwrap().to_string();

        loop {
            let number = self.rng.gen_range(1..999);
            let candidate = format!("{icao}{number}");
            if !manager.callsign_taken(&candidate) {
                return (candidate, type_designator);
            }
        }
    }

    fn draw_n_number(&mut self, manager: &AircraftManager) -> String {
        const SUFFIX_LETTERS: &[char] = &['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z'];
        loop {
            let number = self.rng.gen_range(1..9999);
            let suffix_len = self.rng.gen_range(0..=2);
            let suffix: String = (0..suffix_len).map(|_| *SUFFIX_LETTERS.choose(&mut self.rng).unwrap()).collect();
            let candidate = format!("N{number}{suffix}");
            if !manager.callsign_taken(&candidate) {
                return candidate;
            }
        }
    }
}

fn spawn_interval_ticks(density: Density, time_scale: f64) -> u64 {
    ((3600.0 / density.ops_per_hour() / time_scale).round() as u64).max(1)
}

fn random_squawk(rng: &mut StdRng) -> String {
    format!("{:04}", rng.gen_range(0..7777))
}
