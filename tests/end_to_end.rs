//! End-to-end scenario tests driving `SimulationEngine` through many ticks
//! at once, the way `navigation_tests.rs` drives the donor's `Plane`
//! directly rather than mocking out the kinematics. Each test builds one or
//! two aircraft by hand (the engine's own scenario generator is still free
//! to spawn traffic on its own schedule in the background; fixtures are
//! looked up by callsign rather than by position in the aircraft list so a
//! background spawn never changes what a test is asserting).

use std::collections::VecDeque;

use tracon_sim::aircraft::state::*;
use tracon_sim::airport::demo_airport;
use tracon_sim::command::{ATCCommand, ControllerCommand};
use tracon_sim::config::{ScenarioType, SessionConfig};
use tracon_sim::engine::SimulationEngine;
use tracon_sim::geo::{self, Position};
use tracon_sim::performance::{default_performance_database, fallback_performance};

/// A config whose background traffic is departures-only: departures don't
/// carry an inbound handoff offer and spawn already airborne clear of any
/// runway, so the one aircraft the scenario generator always spawns at
/// tick zero never pollutes a test's handoff-penalty or runway-occupancy
/// assertions.
fn isolated_config() -> SessionConfig {
    SessionConfig { scenario_type: ScenarioType::Departures, ..SessionConfig::demo() }
}

fn engine(seed: u64) -> SimulationEngine {
    SimulationEngine::new(isolated_config(), demo_airport(), default_performance_database(), seed)
}

#[allow(clippy::too_many_arguments)]
fn sample(
    callsign: &str,
    position: Position,
    heading: f64,
    altitude: f64,
    speed: f64,
    category: AircraftCategory,
    flight_phase: FlightPhase,
) -> AircraftState {
    AircraftState {
        id: 0,
        callsign: callsign.to_string(),
        type_designator: "B738".to_string(),
        wake_category: fallback_performance().wake_category,
        position,
        altitude,
        heading,
        speed,
        groundspeed: speed,
        vertical_speed: 0.0,
        bank_angle: 0.0,
        target_altitude: altitude,
        target_heading: heading,
        target_speed: speed,
        on_ground: false,
        flight_phase,
        category,
        flight_plan: FlightPlan {
            departure: "EGLL".to_string(),
            arrival: "EGKK".to_string(),
            cruise_altitude: altitude,
            route: vec![],
            sid: None,
            star: None,
            runway: Some("16".to_string()),
            squawk: "1200".to_string(),
        },
        clearances: Clearances::default(),
        current_fix_index: 0,
        on_localizer: false,
        on_glideslope: false,
        handing_off: false,
        inbound_handoff: InboundHandoff::None,
        inbound_handoff_offered_at: None,
        radar_handoff_state: RadarHandoffState::None,
        holding_state: None,
        sid_legs: vec![],
        sid_leg_idx: 0,
        missed_approach_leg_idx: 0,
        runway_occupying: None,
        rollout_distance_nm: 0.0,
        visual_follow_traffic_callsign: None,
        history_trail: VecDeque::new(),
        scratch_pad: String::new(),
        degraded_ticks: 0,
        spawned_at_tick: 0,
        airborne_since_tick: Some(0),
        performance: fallback_performance(),
        approach_geometry: None,
    }
}

#[test]
fn ils_approach_from_ten_miles_on_centerline_lands() {
    let mut eng = engine(1);
    let rwy = eng.airport.runway("16").unwrap().clone();
    let course = rwy.true_bearing();
    let start = geo::destination(rwy.threshold, geo::normalize_heading(course + 180.0), 10.0);

    let id = eng.next_aircraft_id();
    let mut ac = sample("BAW123", start, course, 3000.0, 180.0, AircraftCategory::Arrival, FlightPhase::Approach);
    ac.id = id;
    ac.clearances.approach = Some(ApproachClearance { approach_type: ApproachType::Ils, runway: "16".to_string() });
    eng.insert_aircraft(ac);

    eng.tick(vec![], 1.0);
    let after_first_tick = eng.find_aircraft("BAW123").unwrap();
    assert!(after_first_tick.on_localizer, "expected immediate localizer capture from on-centerline intercept");

    let mut landed = false;
    for _ in 0..900 {
        eng.tick(vec![], 1.0);
        if eng.find_aircraft("BAW123").is_none() {
            landed = true;
            break;
        }
    }

    assert!(landed, "aircraft should have landed and been removed within the tick budget");
    assert_eq!(eng.score().aircraft_handled, 1);
}

#[test]
fn offset_intercept_half_mile_east_of_centerline_still_captures_and_lands() {
    let mut eng = engine(2);
    let rwy = eng.airport.runway("16").unwrap().clone();
    let course = rwy.true_bearing();
    let on_centerline = geo::destination(rwy.threshold, geo::normalize_heading(course + 180.0), 10.0);
    let start = geo::destination(on_centerline, geo::normalize_heading(course + 90.0), 0.5);

    let id = eng.next_aircraft_id();
    let mut ac = sample("BAW456", start, course, 3000.0, 180.0, AircraftCategory::Arrival, FlightPhase::Approach);
    ac.id = id;
    ac.clearances.approach = Some(ApproachClearance { approach_type: ApproachType::Ils, runway: "16".to_string() });
    eng.insert_aircraft(ac);

    let mut captured = false;
    let mut landed = false;
    for _ in 0..900 {
        eng.tick(vec![], 1.0);
        match eng.find_aircraft("BAW456") {
            Some(ac) if ac.on_localizer => captured = true,
            None => {
                landed = true;
                break;
            }
            _ => {}
        }
    }

    assert!(captured, "expected the offset intercept to eventually capture the localizer");
    assert!(landed, "aircraft should have landed and been removed within the tick budget");
    assert_eq!(eng.score().aircraft_handled, 1);
}

#[test]
fn converging_traffic_raises_a_conflict_then_clears_as_tracks_diverge() {
    let mut eng = engine(3);
    let reference = eng.airport.reference_position;
    let far = geo::destination(reference, 0.0, 20.0);

    let id_a = eng.next_aircraft_id();
    let mut a = sample("JBU01", far, 45.0, 8000.0, 250.0, AircraftCategory::Overflight, FlightPhase::Cruise);
    a.id = id_a;
    eng.insert_aircraft(a);

    let id_b = eng.next_aircraft_id();
    let near_b = geo::destination(far, 90.0, 2.5);
    let mut b = sample("JBU02", near_b, 225.0, 8000.0, 250.0, AircraftCategory::Overflight, FlightPhase::Cruise);
    b.id = id_b;
    eng.insert_aircraft(b);

    let output = eng.tick(vec![], 1.0);
    assert!(
        output.new_alerts.iter().any(|alert| alert.alert_type == tracon_sim::conflict::AlertType::Conflict
            && alert.severity == tracon_sim::conflict::AlertSeverity::Warning),
        "expected a warning-severity conflict alert on the first tick"
    );

    for _ in 0..180 {
        eng.tick(vec![], 1.0);
    }

    let a_final = eng.find_aircraft("JBU01").unwrap();
    let b_final = eng.find_aircraft("JBU02").unwrap();
    let separation = geo::haversine_nm(a_final.position, b_final.position);
    assert!(separation > 3.0, "tracks should have diverged clear of each other, got {separation:.2} nm");

    let score = eng.score();
    assert_eq!(score.separation_violations, 1);
    assert!(score.violation_duration_sec >= 1);
}

#[test]
fn missed_tower_handoff_is_penalized_once() {
    let mut eng = engine(4);

    for _ in 0..90 {
        eng.tick(vec![], 1.0);
    }
    assert_eq!(eng.tick_count, 90);

    let rwy = eng.airport.runway("16").unwrap().clone();
    let id = eng.next_aircraft_id();
    let mut ac = sample("EZY77", rwy.threshold, rwy.true_bearing(), rwy.elevation_ft, 0.0, AircraftCategory::Arrival, FlightPhase::Landed);
    ac.id = id;
    ac.on_ground = true;
    ac.runway_occupying = None;
    ac.handing_off = false;
    ac.inbound_handoff = InboundHandoff::Offered;
    ac.inbound_handoff_offered_at = Some(0);
    eng.insert_aircraft(ac);

    eng.tick(vec![], 1.0);

    assert!(eng.find_aircraft("EZY77").is_none(), "a landed aircraft clear of the runway is removed the same tick");
    assert_eq!(eng.score().missed_handoffs, 1);

    eng.tick(vec![], 1.0);
    assert_eq!(eng.score().missed_handoffs, 1, "the aircraft is gone, so the penalty must not be applied twice");
}

#[test]
fn hold_at_a_fix_cycles_through_the_racetrack_and_stays_close() {
    let mut eng = engine(5);
    let fix_pos = eng.airport.fix_position("LAM").unwrap();
    let entry = geo::destination(fix_pos, 20.0, 0.5);

    let id = eng.next_aircraft_id();
    let mut ac = sample("VJT9", entry, 200.0, 6000.0, 180.0, AircraftCategory::Overflight, FlightPhase::Cruise);
    ac.id = id;
    ac.clearances.hold_fix = Some("LAM".to_string());
    eng.insert_aircraft(ac);

    let mut seen_phases: Vec<HoldPhase> = Vec::new();
    let mut max_distance: f64 = 0.0;
    for _ in 0..400 {
        eng.tick(vec![], 1.0);
        let ac = eng.find_aircraft("VJT9").unwrap();
        if let Some(hold) = &ac.holding_state {
            if !seen_phases.contains(&hold.phase) {
                seen_phases.push(hold.phase);
            }
        }
        max_distance = max_distance.max(geo::haversine_nm(ac.position, fix_pos));
    }

    assert!(seen_phases.contains(&HoldPhase::TurningOutbound));
    assert!(seen_phases.contains(&HoldPhase::Outbound));
    assert!(seen_phases.contains(&HoldPhase::TurningInbound));
    assert!(seen_phases.contains(&HoldPhase::Inbound), "expected the hold to complete a full racetrack cycle");
    assert!(max_distance < 8.0, "aircraft strayed {max_distance:.1} nm from the hold fix");
}

#[test]
fn default_pilot_speed_schedule_decelerates_an_unmanaged_arrival() {
    let mut eng = engine(6);
    let reference = eng.airport.reference_position;
    let start = geo::destination(reference, 0.0, 25.0);

    let id = eng.next_aircraft_id();
    let mut ac = sample("DLH44", start, 180.0, 11_000.0, 300.0, AircraftCategory::Arrival, FlightPhase::Descent);
    ac.id = id;
    ac.target_altitude = 4000.0;
    eng.insert_aircraft(ac);

    let vapp = fallback_performance().vapp;
    for _ in 0..400 {
        eng.tick(vec![], 1.0);
        let Some(ac) = eng.find_aircraft("DLH44") else { break };
        let distance = geo::haversine_nm(ac.position, reference);
        if ac.altitude <= 9_900.0 {
            assert!(ac.target_speed <= 250.0, "target_speed {} above 250 kt below 10,000 ft", ac.target_speed);
        }
        if distance <= 19.0 {
            assert!(ac.target_speed <= 230.0, "target_speed {} above 230 kt inside 19 nm", ac.target_speed);
        }
        assert!(ac.target_speed >= vapp + 20.0 - 1e-6, "target_speed {} dropped below Vapp+20", ac.target_speed);
    }
}

#[test]
fn a_worked_inbound_arrival_is_accepted_and_exempt_from_the_latency_penalty() {
    let mut eng = engine(7);
    let reference = eng.airport.reference_position;
    let start = geo::destination(reference, 0.0, 30.0);

    let id = eng.next_aircraft_id();
    let mut ac = sample("RYR1", start, 180.0, 6000.0, 220.0, AircraftCategory::Arrival, FlightPhase::Descent);
    ac.id = id;
    ac.inbound_handoff = InboundHandoff::Offered;
    ac.inbound_handoff_offered_at = Some(0);
    eng.insert_aircraft(ac);

    let command = ControllerCommand {
        callsign: "RYR1".to_string(),
        commands: vec![ATCCommand::Altitude { altitude_ft: 4000.0 }],
        raw_text: "descend and maintain four thousand".to_string(),
        tick: 0,
    };
    eng.tick(vec![command], 1.0);
    assert_eq!(eng.find_aircraft("RYR1").unwrap().inbound_handoff, InboundHandoff::Accepted);

    for _ in 0..150 {
        eng.tick(vec![], 1.0);
    }

    assert_eq!(eng.score().missed_handoffs, 0, "an accepted handoff must never draw the inbound-latency penalty");
}
