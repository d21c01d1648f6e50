//! Geo/math primitives: positions, bearings, distances, and the stereographic
//! projection used to derive planar `{x, y}` coordinates from `{lat, lon}`.

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// A point in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Planar nautical-mile coordinates around a session-fixed origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

/// Stereographic projection centered on a fixed origin. Used to derive the
/// `{x, y}` nm pair from `{lat, lon}` for display/geometry convenience; the
/// projection is only accurate close to the origin, which is always true for
/// a single TRACON's airspace.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    origin: Position,
}

impl Projection {
    pub fn new(origin: Position) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn project(&self, p: Position) -> PlanarPoint {
        let lat0 = self.origin.lat.to_radians();
        let lon0 = self.origin.lon.to_radians();
        let lat = p.lat.to_radians();
        let lon = p.lon.to_radians();
        let dlon = lon - lon0;

        let cos_c = lat0.sin() * lat.sin() + lat0.cos() * lat.cos() * dlon.cos();
        let k = 2.0 * EARTH_RADIUS_NM / (1.0 + cos_c);

        let x = k * lat.cos() * dlon.sin();
        let y = k * (lat0.cos() * lat.sin() - lat0.sin() * lat.cos() * dlon.cos());

        PlanarPoint { x, y }
    }

    pub fn unproject(&self, p: PlanarPoint) -> Position {
        let lat0 = self.origin.lat.to_radians();
        let lon0 = self.origin.lon.to_radians();

        let rho = (p.x * p.x + p.y * p.y).sqrt();
        if rho < 1e-12 {
            return self.origin;
        }

        let c = 2.0 * (rho / (2.0 * EARTH_RADIUS_NM)).atan();
        let sin_c = c.sin();
        let cos_c = c.cos();

        let lat = (cos_c * lat0.sin() + (p.y * sin_c * lat0.cos()) / rho).asin();
        let lon = lon0
            + (p.x * sin_c).atan2(rho * lat0.cos() * cos_c - p.y * lat0.sin() * sin_c);

        Position::new(lat.to_degrees(), lon.to_degrees())
    }
}

/// Great-circle distance in nautical miles.
pub fn haversine_nm(from: Position, to: Position) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = (to.lat - from.lat).to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_NM * c
}

/// True bearing in degrees [0, 360) from `from` to `to`.
pub fn true_bearing(from: Position, to: Position) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlon = (to.lon - from.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_heading(y.atan2(x).to_degrees())
}

/// Destination point given a starting position, true bearing, and distance.
pub fn destination(from: Position, bearing_deg: f64, distance_nm: f64) -> Position {
    let lat1 = from.lat.to_radians();
    let lon1 = from.lon.to_radians();
    let bearing = bearing_deg.to_radians();
    let angular = distance_nm / EARTH_RADIUS_NM;

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Position::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Cross-track distance (nm) of `point` from the great-circle course that
/// runs through `course_start` on true bearing `course_bearing_deg`.
/// Positive means right of course, negative means left.
pub fn cross_track_nm(course_start: Position, course_bearing_deg: f64, point: Position) -> f64 {
    let d13 = haversine_nm(course_start, point) / EARTH_RADIUS_NM;
    let bearing_13 = true_bearing(course_start, point).to_radians();
    let bearing_12 = course_bearing_deg.to_radians();

    (d13.sin() * (bearing_13 - bearing_12).sin()).asin() * EARTH_RADIUS_NM
}

/// Signed difference `target - current` normalized to (-180, 180].
pub fn heading_diff(current: f64, target: f64) -> f64 {
    let mut diff = (target - current) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff <= -180.0 {
        diff += 360.0;
    }
    diff
}

/// Normalize a heading/bearing to [0, 360).
pub fn normalize_heading(heading: f64) -> f64 {
    let h = heading % 360.0;
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

/// Shortest turn direction from `current` to `target`, ignoring any forced
/// side (see FlightPlanExecutor/PhysicsEngine turn model).
pub fn shortest_turn_direction(current: f64, target: f64) -> TurnDirection {
    if heading_diff(current, target) >= 0.0 {
        TurnDirection::Right
    } else {
        TurnDirection::Left
    }
}

/// Angle between the reciprocal of `course` and the bearing from `course_point`
/// to `observer` — used for "is this aircraft in front of / behind the
/// runway" checks during ILS capture.
pub fn angle_from_reciprocal(course_bearing_deg: f64, course_point: Position, observer: Position) -> f64 {
    let reciprocal = normalize_heading(course_bearing_deg + 180.0);
    let bearing_to_observer = true_bearing(course_point, observer);
    heading_diff(reciprocal, bearing_to_observer).abs()
}
