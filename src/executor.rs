//! FlightPlanExecutor: LNAV/VNAV, approach capture, missed approaches, holds,
//! and default pilot speed management (§4.3). Grounded on the donor's
//! `aircraft::Aircraft::navigate_to_next_fix`/`update_phase` for route
//! progression and `simulator::plane::Plane::update_ils_mode` for approach
//! capture, generalized to the three-approach-type model and explicit
//! dispatch order the spec requires.

use crate::airport::{AirportData, AltitudeConstraint, AltitudeConstraintKind, LegType, Runway};
use crate::aircraft::state::{
    AircraftCategory, AircraftState, ApproachClearance, ApproachGeometry, ApproachType, FlightPhase,
    HoldPhase, HoldingState,
};
use crate::error::ExecutionFault;
use crate::geo;
use crate::performance::SPEED_CAP_BELOW_10K;

/// Fly-by anticipation distance: how close to a fix before the cursor
/// advances to the next one.
fn anticipation_distance_nm(speed_kt: f64) -> f64 {
    if speed_kt > 200.0 {
        1.5
    } else {
        0.8
    }
}

const HOLD_OUTBOUND_LEG_SECONDS: u64 = 60;
const HOLD_ENTRY_RADIUS_NM: f64 = 1.5;
const DEPARTURE_CENTERLINE_AGL_FT: f64 = 400.0;
const DEPARTURE_CENTERLINE_GAIN_DEG_PER_NM: f64 = 30.0;
const DEPARTURE_CENTERLINE_MAX_CORRECTION_DEG: f64 = 20.0;

pub struct FlightPlanExecutor;

impl FlightPlanExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs before physics each tick. Writes only `target*` fields and
    /// `clearances`. `snapshot` is every aircraft as of the start of this
    /// tick's executor pass, for lookups like visual-follow spacing (§9:
    /// "pass the aircraft slice as a parameter" rather than a registry).
    pub fn execute(
        &self,
        ac: &mut AircraftState,
        snapshot: &[AircraftState],
        airport: &AirportData,
        tick: u64,
    ) -> Result<(), ExecutionFault> {
        if ac.flight_phase == FlightPhase::Missed {
            return handle_missed_approach(ac, airport);
        }

        if let Some(appr) = ac.clearances.approach.clone() {
            return handle_approach(ac, snapshot, airport, &appr);
        }

        if ac.clearances.hold_fix.is_some() {
            handle_hold(ac, airport, tick)?;
        } else if let Some(fix) = ac.clearances.direct_fix.clone() {
            handle_direct_to_fix(ac, airport, &fix)?;
        } else {
            handle_route_or_sid(ac, airport)?;
        }

        apply_vnav(ac, airport);
        apply_default_pilot_speed(ac, airport);
        Ok(())
    }
}

impl Default for FlightPlanExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn height_agl(ac: &AircraftState, airport: &AirportData) -> f64 {
    ac.altitude - airport.elevation_ft
}

// ---------------------------------------------------------------------
// Route navigation, SID initial legs, departure centerline tracking
// ---------------------------------------------------------------------

fn handle_route_or_sid(ac: &mut AircraftState, airport: &AirportData) -> Result<(), ExecutionFault> {
    if ac.category == AircraftCategory::Departure && height_agl(ac, airport) < DEPARTURE_CENTERLINE_AGL_FT {
        return handle_departure_centerline_track(ac, airport);
    }

    if ac.sid_leg_idx < ac.sid_legs.len() {
        handle_sid_leg(ac, airport)
    } else {
        handle_route_navigation(ac, airport)
    }
}

fn handle_departure_centerline_track(ac: &mut AircraftState, airport: &AirportData) -> Result<(), ExecutionFault> {
    let rwy_id = ac
        .flight_plan
        .runway
        .clone()
        .ok_or_else(|| ExecutionFault::MissingRunwayData("departure runway unset".to_string()))?;
    let rwy = airport
        .runway(&rwy_id)
        .ok_or_else(|| ExecutionFault::MissingRunwayData(rwy_id))?;

    let bearing = rwy.true_bearing();
    let xtk = geo::cross_track_nm(rwy.threshold, bearing, ac.position);
    let correction = (-xtk * DEPARTURE_CENTERLINE_GAIN_DEG_PER_NM)
        .clamp(-DEPARTURE_CENTERLINE_MAX_CORRECTION_DEG, DEPARTURE_CENTERLINE_MAX_CORRECTION_DEG);
    ac.target_heading = geo::normalize_heading(bearing + correction);
    ac.clearances.turn_direction = None;
    Ok(())
}

fn handle_sid_leg(ac: &mut AircraftState, airport: &AirportData) -> Result<(), ExecutionFault> {
    let leg = ac.sid_legs[ac.sid_leg_idx].clone();

    match leg.leg_type {
        LegType::Va | LegType::Vd => {
            let course = leg
                .course
                .ok_or_else(|| ExecutionFault::InconsistentClearance("VA/VD leg missing course".to_string()))?;
            ac.target_heading = course;
            ac.clearances.turn_direction = None;
            match &leg.altitude_constraint {
                Some(constraint) => {
                    ac.target_altitude = constraint.altitude_ft;
                    if ac.altitude >= constraint.altitude_ft - 50.0 {
                        ac.sid_leg_idx += 1;
                    }
                }
                None => ac.sid_leg_idx += 1,
            }
        }
        LegType::Vi => {
            let course = leg.course.unwrap_or(ac.heading);
            ac.target_heading = course;
            ac.clearances.turn_direction = None;
            if let Some(next_fix) = ac.flight_plan.route.get(ac.current_fix_index) {
                if let Some(next_pos) = airport.fix_position(next_fix) {
                    let bearing_to_next = geo::true_bearing(ac.position, next_pos);
                    let dist_from_airport = geo::haversine_nm(ac.position, airport.reference_position);
                    if geo::heading_diff(ac.heading, bearing_to_next).abs() <= 60.0 && dist_from_airport > 3.0 {
                        ac.sid_leg_idx += 1;
                    }
                }
            }
        }
        _ => ac.sid_leg_idx += 1,
    }
    Ok(())
}

fn handle_route_navigation(ac: &mut AircraftState, airport: &AirportData) -> Result<(), ExecutionFault> {
    if ac.current_fix_index >= ac.flight_plan.route.len() {
        return Ok(());
    }
    let fix_name = ac.flight_plan.route[ac.current_fix_index].clone();
    let pos = airport
        .fix_position(&fix_name)
        .ok_or(ExecutionFault::MissingFixData(fix_name))?;

    ac.target_heading = geo::true_bearing(ac.position, pos);
    ac.clearances.turn_direction = None;

    if geo::haversine_nm(ac.position, pos) < anticipation_distance_nm(ac.speed) {
        ac.current_fix_index += 1;
    }
    Ok(())
}

fn handle_direct_to_fix(ac: &mut AircraftState, airport: &AirportData, fix_name: &str) -> Result<(), ExecutionFault> {
    let pos = airport
        .fix_position(fix_name)
        .ok_or_else(|| ExecutionFault::MissingFixData(fix_name.to_string()))?;

    ac.target_heading = geo::true_bearing(ac.position, pos);
    ac.clearances.turn_direction = None;

    if geo::haversine_nm(ac.position, pos) < anticipation_distance_nm(ac.speed) {
        ac.clearances.direct_fix = None;
        if let Some(idx) = ac.flight_plan.route.iter().position(|f| f == fix_name) {
            ac.current_fix_index = idx + 1;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// VNAV
// ---------------------------------------------------------------------

fn apply_vnav(ac: &mut AircraftState, airport: &AirportData) {
    if !(ac.clearances.climb_via_sid || ac.clearances.descend_via_star) {
        return;
    }
    let procedure_name = if ac.clearances.descend_via_star {
        ac.flight_plan.star.clone()
    } else {
        ac.flight_plan.sid.clone()
    };
    let Some(name) = procedure_name else { return };
    let procedure = if ac.clearances.descend_via_star {
        airport.star(&name)
    } else {
        airport.sid(&name)
    };
    let Some(procedure) = procedure else { return };

    for idx in ac.current_fix_index..ac.flight_plan.route.len() {
        let fix_name = &ac.flight_plan.route[idx];
        let Some(leg) = procedure.legs.iter().find(|l| l.fix.as_deref() == Some(fix_name.as_str())) else {
            continue;
        };
        let Some(constraint) = &leg.altitude_constraint else { continue };
        if !matches!(
            constraint.kind,
            AltitudeConstraintKind::At | AltitudeConstraintKind::AtOrBelow | AltitudeConstraintKind::Between
        ) {
            continue;
        }
        let Some(fix_pos) = airport.fix_position(fix_name) else { continue };

        let descend_to = if matches!(constraint.kind, AltitudeConstraintKind::Between) {
            constraint.max_altitude_ft.unwrap_or(constraint.altitude_ft)
        } else {
            constraint.altitude_ft
        };

        let delta = ac.altitude - descend_to;
        if delta <= 0.0 {
            continue;
        }
        let dist_nm = geo::haversine_nm(ac.position, fix_pos);
        let time_min = (dist_nm / ac.groundspeed.max(1.0)) * 60.0;
        let required_vs = if time_min > 0.0 { delta / time_min } else { f64::INFINITY };

        if required_vs > ac.performance.standard_descent_fpm * 0.4 || dist_nm < 20.0 {
            ac.target_altitude = descend_to;
            break;
        }
    }

    for idx in ac.current_fix_index..ac.flight_plan.route.len() {
        let fix_name = &ac.flight_plan.route[idx];
        if let Some(leg) = procedure.legs.iter().find(|l| l.fix.as_deref() == Some(fix_name.as_str())) {
            if let Some(constraint) = &leg.altitude_constraint {
                let floor = match constraint.kind {
                    AltitudeConstraintKind::AtOrAbove => Some(constraint.altitude_ft),
                    AltitudeConstraintKind::Between => Some(constraint.altitude_ft),
                    _ => None,
                };
                if let Some(floor) = floor {
                    if ac.target_altitude < floor {
                        ac.target_altitude = floor;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------
// Default pilot speed (§4.3)
// ---------------------------------------------------------------------

fn apply_default_pilot_speed(ac: &mut AircraftState, airport: &AirportData) {
    if let Some(speed) = ac.clearances.speed {
        ac.target_speed = speed;
        return;
    }
    if matches!(ac.flight_phase, FlightPhase::Approach | FlightPhase::Final) {
        return;
    }

    match ac.category {
        AircraftCategory::Departure => {
            let agl = height_agl(ac, airport);
            ac.target_speed = if agl < 3000.0 { 200.0 } else { 250.0 };
        }
        AircraftCategory::Arrival => {
            let bearing_to_airport = geo::true_bearing(ac.position, airport.reference_position);
            let off_bearing = geo::heading_diff(ac.heading, bearing_to_airport).abs();
            let dist = geo::haversine_nm(ac.position, airport.reference_position);

            let mut speed = ac.target_speed;
            if ac.altitude < 10_000.0 {
                speed = SPEED_CAP_BELOW_10K;
            }
            if off_bearing <= 90.0 {
                speed = if dist > 30.0 {
                    speed.min(250.0)
                } else if dist > 20.0 {
                    230.0
                } else if dist > 15.0 {
                    220.0
                } else if dist > 10.0 {
                    210.0
                } else {
                    190.0
                };
            }
            ac.target_speed = speed.max(ac.performance.vapp + 20.0);
        }
        AircraftCategory::Overflight | AircraftCategory::Vfr => {
            if ac.altitude < 10_000.0 {
                ac.target_speed = ac.target_speed.min(SPEED_CAP_BELOW_10K);
            }
        }
    }
}

// ---------------------------------------------------------------------
// Holds
// ---------------------------------------------------------------------

fn handle_hold(ac: &mut AircraftState, airport: &AirportData, tick: u64) -> Result<(), ExecutionFault> {
    let fix_name = ac.clearances.hold_fix.clone().unwrap();
    let fix_pos = airport
        .fix_position(&fix_name)
        .ok_or_else(|| ExecutionFault::MissingFixData(fix_name))?;

    if ac.holding_state.is_none() {
        ac.target_heading = geo::true_bearing(ac.position, fix_pos);
        ac.clearances.turn_direction = None;
        if geo::haversine_nm(ac.position, fix_pos) < HOLD_ENTRY_RADIUS_NM {
            let inbound_course = geo::true_bearing(fix_pos, airport.reference_position);
            ac.holding_state = Some(HoldingState {
                phase: HoldPhase::TurningOutbound,
                inbound_course,
                leg_start_tick: tick,
                fix_position: fix_pos,
            });
        }
        return Ok(());
    }

    let hold = ac.holding_state.clone().unwrap();
    match hold.phase {
        HoldPhase::TurningOutbound => {
            let outbound_heading = geo::normalize_heading(hold.inbound_course + 180.0);
            ac.target_heading = outbound_heading;
            ac.clearances.turn_direction = Some(geo::TurnDirection::Right);
            if geo::heading_diff(ac.heading, outbound_heading).abs() < 2.0 {
                advance_hold_phase(ac, HoldPhase::Outbound, tick);
            }
        }
        HoldPhase::Outbound => {
            ac.target_heading = geo::normalize_heading(hold.inbound_course + 180.0);
            ac.clearances.turn_direction = None;
            if tick.saturating_sub(hold.leg_start_tick) >= HOLD_OUTBOUND_LEG_SECONDS {
                advance_hold_phase(ac, HoldPhase::TurningInbound, tick);
            }
        }
        HoldPhase::TurningInbound => {
            ac.target_heading = hold.inbound_course;
            ac.clearances.turn_direction = Some(geo::TurnDirection::Right);
            if geo::heading_diff(ac.heading, hold.inbound_course).abs() < 2.0 {
                advance_hold_phase(ac, HoldPhase::Inbound, tick);
            }
        }
        HoldPhase::Inbound => {
            ac.target_heading = hold.inbound_course;
            ac.clearances.turn_direction = None;
            if geo::haversine_nm(ac.position, hold.fix_position) < 1.0 {
                advance_hold_phase(ac, HoldPhase::TurningOutbound, tick);
            }
        }
    }
    Ok(())
}

fn advance_hold_phase(ac: &mut AircraftState, phase: HoldPhase, tick: u64) {
    if let Some(hold) = &mut ac.holding_state {
        hold.phase = phase;
        hold.leg_start_tick = tick;
    }
}

// ---------------------------------------------------------------------
// Missed approach
// ---------------------------------------------------------------------

fn handle_missed_approach(ac: &mut AircraftState, airport: &AirportData) -> Result<(), ExecutionFault> {
    let legs = ac
        .clearances
        .approach
        .as_ref()
        .and_then(|a| airport.approach(&a.runway, a.approach_type))
        .map(|a| a.missed_approach_legs.clone())
        .unwrap_or_default();

    if legs.is_empty() {
        let runway_heading = ac
            .clearances
            .approach
            .as_ref()
            .and_then(|a| airport.runway(&a.runway))
            .map(|r| r.true_bearing())
            .unwrap_or(ac.heading);

        ac.target_heading = runway_heading;
        ac.clearances.turn_direction = None;
        ac.target_altitude = airport.elevation_ft + 3000.0;

        if ac.altitude >= airport.elevation_ft + 3000.0 - 50.0 {
            ac.flight_phase = FlightPhase::Descent;
            ac.clearances.approach = None;
        }
        return Ok(());
    }

    if ac.missed_approach_leg_idx >= legs.len() {
        if let Some(fix_name) = legs.last().and_then(|l| l.fix.as_ref()) {
            if let Some(pos) = airport.fix_position(fix_name) {
                ac.target_heading = geo::true_bearing(ac.position, pos);
            }
        }
        return Ok(());
    }

    let leg = legs[ac.missed_approach_leg_idx].clone();
    let agl = height_agl(ac, airport);

    match leg.leg_type {
        LegType::Ca | LegType::Va => {
            ac.target_heading = leg.course.unwrap_or(ac.heading);
            ac.clearances.turn_direction = None;
            match &leg.altitude_constraint {
                Some(constraint) => {
                    ac.target_altitude = constraint.altitude_ft;
                    if ac.altitude >= constraint.altitude_ft - 50.0 {
                        ac.missed_approach_leg_idx += 1;
                    }
                }
                None => ac.missed_approach_leg_idx += 1,
            }
        }
        _ => {
            if agl > 500.0 {
                if let Some(fix_name) = &leg.fix {
                    if let Some(pos) = airport.fix_position(fix_name) {
                        ac.target_heading = geo::true_bearing(ac.position, pos);
                        ac.clearances.turn_direction = None;
                        if geo::haversine_nm(ac.position, pos) < 1.5 {
                            ac.missed_approach_leg_idx += 1;
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Approaches
// ---------------------------------------------------------------------

fn handle_approach(
    ac: &mut AircraftState,
    snapshot: &[AircraftState],
    airport: &AirportData,
    appr: &ApproachClearance,
) -> Result<(), ExecutionFault> {
    let rwy = airport
        .runway(&appr.runway)
        .ok_or_else(|| ExecutionFault::MissingRunwayData(appr.runway.clone()))?;

    let geom = ApproachGeometry {
        course_bearing: rwy.true_bearing(),
        course_point: rwy.threshold,
        glideslope_angle_deg: rwy.glideslope_angle(),
        runway_elevation_ft: rwy.elevation_ft,
    };
    ac.approach_geometry = Some(geom);
    let dist = geo::haversine_nm(ac.position, rwy.threshold);

    match appr.approach_type {
        ApproachType::Ils => {
            handle_ils(ac, rwy, geom, dist);
            check_unstable_approach_go_around(ac, airport);
        }
        ApproachType::Rnav => handle_rnav(ac, rwy, geom, dist),
        ApproachType::Visual => {
            handle_visual(ac, snapshot, rwy, geom, dist);
            check_unstable_approach_go_around(ac, airport);
        }
    }
    Ok(())
}

fn handle_ils(ac: &mut AircraftState, rwy: &Runway, geom: ApproachGeometry, dist: f64) {
    let xtk = geo::cross_track_nm(rwy.threshold, geom.course_bearing, ac.position);
    let heading_to_loc = geo::heading_diff(ac.heading, geom.course_bearing);
    let angle_from_recip = geo::angle_from_reciprocal(geom.course_bearing, rwy.threshold, ac.position);

    if !ac.on_localizer {
        let capture_ready = xtk.abs() < 0.3 && heading_to_loc.abs() < 45.0 && dist < 35.0 && angle_from_recip < 120.0;
        if capture_ready {
            ac.on_localizer = true;
            ac.flight_phase = FlightPhase::Final;
            ac.clearances.heading = None;
            ac.clearances.turn_direction = None;
            if ac.clearances.maintain_until_established {
                ac.clearances.altitude = None;
            }
        } else if angle_from_recip >= 120.0 {
            if ac.clearances.heading.is_none() {
                let recip = geo::normalize_heading(geom.course_bearing + 180.0);
                let reposition_point = geo::destination(rwy.threshold, recip, 15.0);
                ac.target_heading = geo::true_bearing(ac.position, reposition_point);
            }
        } else if ac.clearances.heading.is_none() || xtk.abs() < 2.0 {
            let correction = xtk.atan2(1.0).to_degrees().clamp(-30.0, 30.0);
            ac.target_heading = geo::normalize_heading(geom.course_bearing - correction);
            ac.clearances.turn_direction = None;
        }
    } else if xtk.abs() > 0.5 && dist > 3.0 {
        ac.on_localizer = false;
        ac.on_glideslope = false;
    } else {
        ac.target_heading = geom.course_bearing;
        ac.clearances.turn_direction = None;
    }

    handle_glideslope(ac, rwy, dist);
    ac.target_speed = approach_speed_schedule_value(ac, dist);
    check_landing_trigger(ac, rwy, geom, dist);
}

fn handle_rnav(ac: &mut AircraftState, rwy: &Runway, geom: ApproachGeometry, dist: f64) {
    ac.target_heading = geo::true_bearing(ac.position, rwy.threshold);
    ac.clearances.turn_direction = None;
    if dist < 10.0 {
        ac.flight_phase = FlightPhase::Final;
    }
    handle_glideslope(ac, rwy, dist);
    ac.target_speed = approach_speed_schedule_value(ac, dist);
    check_landing_trigger(ac, rwy, geom, dist);
}

fn handle_visual(ac: &mut AircraftState, snapshot: &[AircraftState], rwy: &Runway, geom: ApproachGeometry, dist: f64) {
    let xtk = geo::cross_track_nm(rwy.threshold, geom.course_bearing, ac.position);
    let angle_from_recip = geo::angle_from_reciprocal(geom.course_bearing, rwy.threshold, ac.position);

    if angle_from_recip >= 120.0 {
        let feeder = geo::destination(rwy.threshold, geo::normalize_heading(geom.course_bearing + 180.0), 15.0);
        ac.target_heading = geo::true_bearing(ac.position, feeder);
    } else if !ac.on_localizer {
        if xtk.abs() > 0.15 {
            let correction = xtk.atan2(1.0).to_degrees().clamp(-30.0, 30.0);
            ac.target_heading = geo::normalize_heading(geom.course_bearing - correction);
        } else {
            ac.target_heading = geom.course_bearing;
        }
        if xtk.abs() < 1.5 && dist < 15.0 {
            ac.on_localizer = true;
            ac.flight_phase = FlightPhase::Final;
        }
    } else {
        ac.target_heading = geom.course_bearing;
    }
    ac.clearances.turn_direction = None;

    handle_glideslope(ac, rwy, dist);

    let mut target_speed = approach_speed_schedule_value(ac, dist);
    if let Some(leader_callsign) = ac.visual_follow_traffic_callsign.clone() {
        if let Some(leader) = snapshot.iter().find(|a| a.callsign == leader_callsign) {
            let separation = geo::haversine_nm(ac.position, leader.position);
            let min_sep = wake_min_separation_nm(ac.wake_category, leader.wake_category);
            if separation < min_sep {
                target_speed = (leader.speed - 10.0).min(target_speed).max(ac.performance.vmin_flaps + 10.0);
            }
        }
    }
    ac.target_speed = target_speed;
    check_landing_trigger(ac, rwy, geom, dist);
}

fn handle_glideslope(ac: &mut AircraftState, rwy: &Runway, dist: f64) {
    let gs_altitude = rwy.glideslope_altitude_at(dist);

    if !ac.on_glideslope {
        let within_300 = (ac.altitude - gs_altitude).abs() <= 300.0;
        if ac.on_localizer && ((within_300 && dist < 20.0) || dist < 5.0) {
            ac.on_glideslope = true;
        } else if ac.altitude < gs_altitude - 300.0 {
            ac.target_altitude = ac.altitude;
        } else {
            ac.target_altitude = (gs_altitude - 200.0).max(rwy.elevation_ft);
        }
    }

    if ac.on_glideslope {
        ac.target_altitude = gs_altitude;
    }
}

fn approach_speed_schedule_value(ac: &AircraftState, dist: f64) -> f64 {
    let vapp = ac.performance.vapp;
    let vref = ac.performance.vref;
    if dist > 10.0 {
        vapp + 20.0
    } else if dist > 6.0 {
        vapp + 10.0
    } else if dist > 2.0 {
        vapp
    } else {
        vref
    }
}

fn check_unstable_approach_go_around(ac: &mut AircraftState, airport: &AirportData) {
    let agl = height_agl(ac, airport);
    if !ac.on_glideslope && agl < 1000.0 && ac.vertical_speed < -1500.0 {
        ac.flight_phase = FlightPhase::Missed;
        ac.on_localizer = false;
        ac.on_glideslope = false;
        ac.missed_approach_leg_idx = 0;
    }
}

fn check_landing_trigger(ac: &mut AircraftState, rwy: &Runway, geom: ApproachGeometry, dist: f64) {
    let gs_altitude = rwy.glideslope_altitude_at(dist);
    let trigger_a = dist <= 0.5 && ac.altitude <= gs_altitude + 100.0 && ac.altitude < rwy.elevation_ft + 500.0;
    let trigger_b = dist <= 0.15 && ac.altitude < rwy.elevation_ft + 200.0;

    if trigger_a || trigger_b {
        ac.flight_phase = FlightPhase::Landed;
        ac.on_ground = true;
        ac.altitude = rwy.elevation_ft;
        ac.target_altitude = rwy.elevation_ft;
        ac.heading = geom.course_bearing;
        ac.target_heading = geom.course_bearing;
        ac.speed = ac.performance.vref;
        ac.target_speed = 15.0;
        ac.runway_occupying = Some(rwy.id.clone());
        ac.rollout_distance_nm = 0.0;
        ac.on_localizer = false;
        ac.on_glideslope = false;
    }
}

fn wake_min_separation_nm(trailing: crate::performance::WakeCategory, leading: crate::performance::WakeCategory) -> f64 {
    use crate::performance::WakeCategory::*;
    if trailing == Heavy {
        return 4.0;
    }
    if leading == Heavy {
        return 5.0;
    }
    if trailing == Large && leading == Small {
        return 3.0;
    }
    3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::state::*;
    use crate::airport::demo_airport;
    use crate::geo::Position;
    use crate::performance::fallback_performance;
    use std::collections::VecDeque;

    fn sample(position: Position, heading: f64, altitude: f64, speed: f64) -> AircraftState {
        AircraftState {
            id: 1,
            callsign: "TST1".to_string(),
            type_designator: "B738".to_string(),
            wake_category: crate::performance::WakeCategory::Large,
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
            flight_phase: FlightPhase::Approach,
            category: AircraftCategory::Arrival,
            flight_plan: FlightPlan {
                departure: "EGKK".to_string(),
                arrival: "EGKK".to_string(),
                cruise_altitude: 3000.0,
                route: vec![],
                sid: None,
                star: None,
                runway: Some("16".to_string()),
                squawk: "1200".to_string(),
            },
            clearances: Clearances {
                approach: Some(ApproachClearance { approach_type: ApproachType::Ils, runway: "16".to_string() }),
                ..Clearances::default()
            },
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
    fn ils_captures_on_centerline_within_35nm() {
        let airport = demo_airport();
        let rwy = airport.runway("16").unwrap();
        let course = rwy.true_bearing();
        let start = geo::destination(rwy.threshold, geo::normalize_heading(course + 180.0), 10.0);

        let mut ac = sample(start, course, 3000.0, 180.0);
        let executor = FlightPlanExecutor::new();
        executor.execute(&mut ac, &[], &airport, 0).unwrap();

        assert!(ac.on_localizer, "expected localizer capture on centerline");
        assert_eq!(ac.flight_phase, FlightPhase::Final);
    }

    #[test]
    fn landing_trigger_fires_at_threshold() {
        let airport = demo_airport();
        let rwy = airport.runway("16").unwrap();
        let mut ac = sample(rwy.threshold, rwy.true_bearing(), rwy.elevation_ft + 50.0, 140.0);
        ac.on_localizer = true;
        ac.on_glideslope = true;

        let executor = FlightPlanExecutor::new();
        executor.execute(&mut ac, &[], &airport, 0).unwrap();

        assert_eq!(ac.flight_phase, FlightPhase::Landed);
        assert!(ac.on_ground);
        assert_eq!(ac.runway_occupying.as_deref(), Some("16"));
    }

    #[test]
    fn hold_cycles_through_racetrack_phases() {
        let airport = demo_airport();
        let fix = airport.fix_position("TIMBA").unwrap();
        let mut ac = sample(fix, 90.0, 5000.0, 210.0);
        ac.clearances.approach = None;
        ac.clearances.hold_fix = Some("TIMBA".to_string());

        let executor = FlightPlanExecutor::new();
        executor.execute(&mut ac, &[], &airport, 0).unwrap();
        assert!(ac.holding_state.is_some(), "expected hold to initialize within entry radius");
        assert_eq!(ac.holding_state.as_ref().unwrap().phase, HoldPhase::TurningOutbound);
    }

    #[test]
    fn vnav_between_constraint_descends_to_the_window_ceiling_not_the_floor() {
        let mut airport = demo_airport();
        let star = airport.stars.iter_mut().find(|s| s.name == "TIMBA1A").unwrap();
        let leg = star.legs.iter_mut().find(|l| l.fix.as_deref() == Some("LAM")).unwrap();
        leg.altitude_constraint = Some(AltitudeConstraint {
            kind: AltitudeConstraintKind::Between,
            altitude_ft: 6000.0,
            max_altitude_ft: Some(8000.0),
        });

        let fix_pos = airport.fix_position("LAM").unwrap();
        let far_point = geo::destination(fix_pos, 180.0, 25.0);
        let mut ac = sample(far_point, 0.0, 15000.0, 250.0);
        ac.clearances.approach = None;
        ac.clearances.descend_via_star = true;
        ac.flight_plan.star = Some("TIMBA1A".to_string());
        ac.flight_plan.route = vec!["LAM".to_string()];

        apply_vnav(&mut ac, &airport);

        assert_eq!(ac.target_altitude, 8000.0, "should descend to the Between window's ceiling, not its floor");
    }

    #[test]
    fn vnav_between_constraint_floor_is_enforced_once_below_it() {
        let mut airport = demo_airport();
        let star = airport.stars.iter_mut().find(|s| s.name == "TIMBA1A").unwrap();
        let leg = star.legs.iter_mut().find(|l| l.fix.as_deref() == Some("LAM")).unwrap();
        leg.altitude_constraint = Some(AltitudeConstraint {
            kind: AltitudeConstraintKind::Between,
            altitude_ft: 6000.0,
            max_altitude_ft: Some(8000.0),
        });

        let fix_pos = airport.fix_position("LAM").unwrap();
        let far_point = geo::destination(fix_pos, 180.0, 40.0);
        let mut ac = sample(far_point, 0.0, 4000.0, 250.0);
        ac.clearances.approach = None;
        ac.clearances.descend_via_star = true;
        ac.flight_plan.star = Some("TIMBA1A".to_string());
        ac.flight_plan.route = vec!["LAM".to_string()];
        ac.target_altitude = 4000.0;

        apply_vnav(&mut ac, &airport);

        assert_eq!(ac.target_altitude, 6000.0, "should climb back up to the Between window's floor");
    }

    #[test]
    fn default_pilot_speed_caps_arrival_below_10000ft() {
        let airport = demo_airport();
        let far_point = geo::destination(airport.reference_position, 0.0, 60.0);
        let mut ac = sample(far_point, 180.0, 9000.0, 300.0);
        ac.clearances.approach = None;
        ac.category = AircraftCategory::Arrival;
        ac.flight_phase = FlightPhase::Descent;

        let executor = FlightPlanExecutor::new();
        executor.execute(&mut ac, &[], &airport, 0).unwrap();

        assert!(ac.target_speed <= 250.0, "target_speed was {}", ac.target_speed);
    }
}
