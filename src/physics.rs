//! PhysicsEngine: the 6-DoF-lite kinematic integrator (§4.2). Grounded on the
//! donor's `simulator::plane::Plane` convergence loops (`update_heading`,
//! `update_altitude`, `update_speed`, ground taxi deceleration), generalized
//! to the spec's explicit rate caps and the vector wind model the donor only
//! approximates.

use tracing::warn;

use crate::aircraft::state::AircraftState;
use crate::error::ExecutionFault;
use crate::geo::{self, Position};
use crate::weather::WeatherState;

const HEADING_ON_TARGET_TOLERANCE_DEG: f64 = 0.02;
const MAX_TURN_RATE_DEG_PER_SEC: f64 = 3.0;
const MAX_BANK_DEG: f64 = 25.0;
const BANK_SLEW_DEG_PER_SEC: f64 = 10.0;

const VS_SLEW_FPM_PER_SEC: f64 = 300.0;
const ALTITUDE_SNAP_THRESHOLD_FT: f64 = 50.0;
/// Proportional gain for the altitude model's `|Δ|/10 × 60` term, folded
/// into a single multiplier.
const ALTITUDE_PROPORTIONAL_GAIN: f64 = 6.0;

const SPEED_DECEL_KT_PER_SEC: f64 = 1.5;
const SPEED_ACCEL_KT_PER_SEC: f64 = 2.0;
const SPEED_CAP_BELOW_10K: f64 = crate::performance::SPEED_CAP_BELOW_10K;

const GROUND_ROLLOUT_DECEL_ABOVE_60KT: f64 = 4.0;
const GROUND_ROLLOUT_DECEL_BELOW_60KT: f64 = 2.0;
const TAXI_DECEL_TARGET_KT: f64 = 15.0;

const CENTERLINE_SNAP_XTK_NM: f64 = 0.3;
const FT_PER_NM: f64 = 6076.12;

/// Integrates one aircraft's kinematic state toward its `target*` fields.
/// Writes only `position`, `altitude`, `heading`, `speed`, `groundspeed`,
/// `vertical_speed`, `bank_angle`. Never touches clearances or phase
/// (those are the executor's job, which always runs first in the tick).
pub struct PhysicsEngine;

impl PhysicsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn update_aircraft(&self, ac: &mut AircraftState, weather: &WeatherState, dt: f64) -> Result<(), ExecutionFault> {
        if ac.on_ground {
            return Ok(());
        }

        update_heading(ac, dt);
        update_altitude(ac, dt);
        update_speed(ac, dt);
        update_position(ac, weather, dt);

        if ac.on_localizer {
            snap_to_centerline(ac);
        }

        check_finite(ac)
    }

    /// Post-landing rollout: decelerate and advance along the runway until
    /// taxi speed, then release the runway.
    pub fn update_ground_rollout(&self, ac: &mut AircraftState, dt: f64) -> Result<(), ExecutionFault> {
        if ac.runway_occupying.is_none() {
            return Ok(());
        }

        let decel = if ac.speed > 60.0 {
            GROUND_ROLLOUT_DECEL_ABOVE_60KT
        } else {
            GROUND_ROLLOUT_DECEL_BELOW_60KT
        };
        ac.speed = (ac.speed - decel * dt).max(TAXI_DECEL_TARGET_KT);
        ac.groundspeed = ac.speed;

        let bearing = ac
            .approach_geometry
            .map(|g| g.course_bearing)
            .unwrap_or(ac.heading);
        let distance_nm = ac.groundspeed * dt / 3600.0;
        ac.position = geo::destination(ac.position, bearing, distance_nm);
        ac.rollout_distance_nm += distance_nm;

        if ac.speed <= TAXI_DECEL_TARGET_KT {
            ac.runway_occupying = None;
        }

        check_finite(ac)
    }
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn update_heading(ac: &mut AircraftState, dt: f64) {
    let (turn_sign, remaining) = match ac.clearances.turn_direction {
        Some(dir) => {
            let right_distance = geo::normalize_heading(ac.target_heading - ac.heading);
            match dir {
                geo::TurnDirection::Right => (1.0, right_distance),
                geo::TurnDirection::Left => {
                    let left_distance = 360.0 - right_distance;
                    let on_target = right_distance <= HEADING_ON_TARGET_TOLERANCE_DEG;
                    (-1.0, if on_target { 0.0 } else { left_distance })
                }
            }
        }
        None => {
            let diff = geo::heading_diff(ac.heading, ac.target_heading);
            if diff >= 0.0 {
                (1.0, diff)
            } else {
                (-1.0, -diff)
            }
        }
    };

    let turning = remaining > HEADING_ON_TARGET_TOLERANCE_DEG;
    let target_bank = if turning { MAX_BANK_DEG * turn_sign } else { 0.0 };
    ac.bank_angle = slew_toward(ac.bank_angle, target_bank, BANK_SLEW_DEG_PER_SEC * dt);

    let rate_at_bank = 1091.0 * ac.bank_angle.abs().to_radians().tan() / ac.groundspeed.max(30.0);
    let max_rate = rate_at_bank.min(MAX_TURN_RATE_DEG_PER_SEC);
    let step = (max_rate * dt).min(remaining);

    if remaining <= step || remaining < 0.05 {
        ac.heading = geo::normalize_heading(ac.target_heading);
    } else {
        ac.heading = geo::normalize_heading(ac.heading + turn_sign * step);
    }
}

fn update_altitude(ac: &mut AircraftState, dt: f64) {
    let delta = ac.target_altitude - ac.altitude;

    let target_vs = if delta.abs() <= ALTITUDE_SNAP_THRESHOLD_FT {
        ac.altitude = ac.target_altitude;
        0.0
    } else if ac.on_glideslope {
        glideslope_target_vs(ac, delta)
    } else {
        let sign = delta.signum();
        let perf_rate = if delta > 0.0 {
            ac.performance.standard_climb_fpm
        } else {
            ac.performance.standard_descent_fpm
        };
        let proportional = delta.abs() * ALTITUDE_PROPORTIONAL_GAIN;
        sign * perf_rate.min(proportional)
    };

    ac.vertical_speed = slew_toward(ac.vertical_speed, target_vs, VS_SLEW_FPM_PER_SEC * dt);

    if delta.abs() > ALTITUDE_SNAP_THRESHOLD_FT {
        ac.altitude += ac.vertical_speed * dt / 60.0;
    }
}

/// Glideslope-capture vertical speed: the 3°-geometry feedforward rate plus
/// a proportional correction for deviation from the geometric glidepath.
fn glideslope_target_vs(ac: &AircraftState, delta: f64) -> f64 {
    let Some(geom) = ac.approach_geometry else {
        let sign = delta.signum();
        return sign * (delta.abs() * ALTITUDE_PROPORTIONAL_GAIN).min(ac.performance.standard_descent_fpm);
    };

    let feedforward = ac.groundspeed * (FT_PER_NM / 60.0) * geom.glideslope_angle_deg.to_radians().tan();
    let distance_nm = geo::haversine_nm(ac.position, geom.course_point);
    let gs_altitude = geom.runway_elevation_ft + geom.glideslope_angle_deg.to_radians().tan() * distance_nm * FT_PER_NM;
    let deviation = ac.altitude - gs_altitude;
    let correction = (-deviation * ALTITUDE_PROPORTIONAL_GAIN).clamp(-600.0, 600.0);

    let magnitude = (feedforward + correction).clamp(0.0, ac.performance.standard_descent_fpm * 1.5);
    -magnitude
}

fn update_speed(ac: &mut AircraftState, dt: f64) {
    let target = ac
        .target_speed
        .clamp(ac.performance.vmin, ac.performance.vmo);

    let max_step = if target < ac.speed { SPEED_DECEL_KT_PER_SEC } else { SPEED_ACCEL_KT_PER_SEC } * dt;
    ac.speed = slew_toward(ac.speed, target, max_step);

    if ac.altitude < 10_000.0 {
        ac.speed = ac.speed.min(SPEED_CAP_BELOW_10K);
    }
    ac.speed = ac.speed.clamp(ac.performance.vmin, ac.performance.vmo);
}

/// True airspeed approximation (IAS + ~2%/1000ft) combined vectorially with
/// the layer wind to get groundspeed and track, then advances position
/// along the track (not the nose heading) — the wind-crab model §4.2 calls
/// for.
fn update_position(ac: &mut AircraftState, weather: &WeatherState, dt: f64) {
    let tas = ac.speed * (1.0 + ac.altitude / 1000.0 * 0.02);
    let (wind_from_deg, wind_speed_kt) = weather.wind_at_altitude(ac.altitude);

    let heading_rad = ac.heading.to_radians();
    let tas_x = tas * heading_rad.sin();
    let tas_y = tas * heading_rad.cos();

    let wind_to_rad = geo::normalize_heading(wind_from_deg + 180.0).to_radians();
    let wind_x = wind_speed_kt * wind_to_rad.sin();
    let wind_y = wind_speed_kt * wind_to_rad.cos();

    let total_x = tas_x + wind_x;
    let total_y = tas_y + wind_y;

    ac.groundspeed = (total_x * total_x + total_y * total_y).sqrt();
    let track = geo::normalize_heading(total_x.atan2(total_y).to_degrees());

    let distance_nm = ac.groundspeed * dt / 3600.0;
    ac.position = geo::destination(ac.position, track, distance_nm);
}

/// Removes wind-crab drift while an aircraft is tracking the localizer,
/// provided the residual cross-track is small enough that snapping doesn't
/// look like teleportation (§4.2).
fn snap_to_centerline(ac: &mut AircraftState) {
    let Some(geom) = ac.approach_geometry else { return };
    let xtk = geo::cross_track_nm(geom.course_point, geom.course_bearing, ac.position);
    if xtk.abs() <= CENTERLINE_SNAP_XTK_NM {
        let along_nm = geo::haversine_nm(geom.course_point, ac.position);
        ac.position = geo::destination(geom.course_point, geom.course_bearing, along_nm);
    }
}

fn slew_toward(current: f64, target: f64, max_step: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_step {
        target
    } else {
        current + max_step * diff.signum()
    }
}

fn check_finite(ac: &AircraftState) -> Result<(), ExecutionFault> {
    let fields = [
        ("altitude", ac.altitude),
        ("heading", ac.heading),
        ("speed", ac.speed),
        ("groundspeed", ac.groundspeed),
        ("vertical_speed", ac.vertical_speed),
        ("position.lat", ac.position.lat),
        ("position.lon", ac.position.lon),
    ];
    for (name, value) in fields {
        if !value.is_finite() {
            warn!(callsign = %ac.callsign, field = name, "[PHYSICS] non-finite physics output");
            return Err(ExecutionFault::NonFinitePhysics(name.to_string()));
        }
    }
    Ok(())
}
