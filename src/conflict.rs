//! ConflictDetector: lateral/vertical separation, MSAW, runway incursion,
//! and wake alerts (§4.4). Grounded on the donor's absence of a dedicated
//! detector (the donor never implemented conflict alerting) — built fresh
//! in the donor's idiom (plain structs, `tracing` logging) since this
//! subsystem has no direct donor counterpart to adapt.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aircraft::state::{AircraftState, FlightPhase};
use crate::airport::AirportData;
use crate::geo;
use crate::performance::WakeCategory;

const LATERAL_SEPARATION_NM: f64 = 3.0;
const VERTICAL_SEPARATION_FT: f64 = 1000.0;
const PREDICTION_HORIZON_SEC: f64 = 60.0;
const RUNWAY_INCURSION_FINAL_RADIUS_NM: f64 = 2.0;
const WAKE_TRAIL_DISTANCE_NM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    Conflict,
    Msaw,
    RunwayConflict,
    Wake,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Warning,
    Caution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub aircraft_ids: Vec<u64>,
}

/// Identifies one active alert independent of its message text, so repeat
/// scans can tell "still active" from "new" from "cleared".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AlertKey {
    alert_type: AlertType,
    aircraft_ids: (u64, u64),
}

pub struct ConflictDetector {
    active: HashSet<AlertKey>,
}

/// Result of one scan: the alerts to surface this tick (new ones only, per
/// §4.1 step 6/7) plus the pairs currently in an actual (non-predicted)
/// separation violation, for ScoringEngine.syncActiveViolations.
pub struct ScanResult {
    pub new_alerts: Vec<Alert>,
    pub active_violation_pairs: HashSet<(u64, u64)>,
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self { active: HashSet::new() }
    }

    pub fn scan(&mut self, aircraft: &[AircraftState], airport: &AirportData) -> ScanResult {
        let mut new_alerts = Vec::new();
        let mut active_violation_pairs = HashSet::new();

        for i in 0..aircraft.len() {
            let a = &aircraft[i];
            if !a.is_airborne() {
                continue;
            }
            for b in &aircraft[i + 1..] {
                if !b.is_airborne() {
                    continue;
                }
                let pair = sorted_pair(a.id, b.id);

                let horizontal = geo::haversine_nm(a.position, b.position);
                let vertical = (a.altitude - b.altitude).abs();

                let is_violation = horizontal < LATERAL_SEPARATION_NM && vertical < VERTICAL_SEPARATION_FT;
                let predicted = !is_violation && predicts_loss_of_separation(a, b);

                if is_violation || predicted {
                    let severity = if is_violation { AlertSeverity::Warning } else { AlertSeverity::Caution };
                    let key = AlertKey { alert_type: AlertType::Conflict, aircraft_ids: pair };
                    if is_violation {
                        active_violation_pairs.insert(pair);
                    }
                    if self.active.insert(key) {
                        new_alerts.push(alert_for(AlertType::Conflict, severity, pair, format!(
                            "{} and {} separation {:.1} nm / {:.0} ft",
                            a.callsign, b.callsign, horizontal, vertical
                        )));
                        info!(a = %a.callsign, b = %b.callsign, horizontal, vertical, "[CONFLICT] conflict alert raised");
                    }
                } else {
                    self.active.remove(&AlertKey { alert_type: AlertType::Conflict, aircraft_ids: pair });
                }

                if a.runway_occupying.is_some() && a.runway_occupying == b.runway_occupying {
                    let key = AlertKey { alert_type: AlertType::RunwayConflict, aircraft_ids: pair };
                    if self.active.insert(key) {
                        new_alerts.push(alert_for(
                            AlertType::RunwayConflict,
                            AlertSeverity::Warning,
                            pair,
                            format!("{} and {} occupying the same runway", a.callsign, b.callsign),
                        ));
                    }
                } else {
                    self.active.remove(&AlertKey { alert_type: AlertType::RunwayConflict, aircraft_ids: pair });
                }

                if let Some(wake) = wake_alert(a, b, airport) {
                    let key = AlertKey { alert_type: AlertType::Wake, aircraft_ids: pair };
                    if self.active.insert(key) {
                        new_alerts.push(wake);
                    }
                } else {
                    self.active.remove(&AlertKey { alert_type: AlertType::Wake, aircraft_ids: pair });
                }
            }
        }

        for ac in aircraft {
            if !ac.is_airborne() {
                continue;
            }
            if is_runway_incursion_on_final(ac, aircraft, airport) {
                let pair = (ac.id, ac.id);
                let key = AlertKey { alert_type: AlertType::RunwayConflict, aircraft_ids: pair };
                if self.active.insert(key) {
                    new_alerts.push(alert_for(
                        AlertType::RunwayConflict,
                        AlertSeverity::Warning,
                        pair,
                        format!("{} on final into an occupied runway", ac.callsign),
                    ));
                }
            }

            let floor = airport.mva_floor_at(ac.position, ac.altitude);
            if ac.altitude < floor && ac.vertical_speed < 0.0 {
                let pair = (ac.id, ac.id);
                let key = AlertKey { alert_type: AlertType::Msaw, aircraft_ids: pair };
                if self.active.insert(key) {
                    new_alerts.push(alert_for(
                        AlertType::Msaw,
                        AlertSeverity::Warning,
                        pair,
                        format!("{} below MVA floor {:.0} ft", ac.callsign, floor),
                    ));
                }
            } else {
                self.active.remove(&AlertKey { alert_type: AlertType::Msaw, aircraft_ids: (ac.id, ac.id) });
            }
        }

        ScanResult { new_alerts, active_violation_pairs }
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_pair(a: u64, b: u64) -> (u64, u64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn alert_for(alert_type: AlertType, severity: AlertSeverity, pair: (u64, u64), message: String) -> Alert {
    Alert {
        id: format!("{:?}-{}-{}", alert_type, pair.0, pair.1),
        alert_type,
        severity,
        message,
        aircraft_ids: vec![pair.0, pair.1],
    }
}

fn predicts_loss_of_separation(a: &AircraftState, b: &AircraftState) -> bool {
    let vertical = (a.altitude - b.altitude).abs();
    if vertical >= VERTICAL_SEPARATION_FT {
        return false;
    }

    let (ax, ay) = ground_velocity_components(a);
    let (bx, by) = ground_velocity_components(b);
    let rel_x = ax - bx;
    let rel_y = ay - by;

    let pos_a = project_flat(a);
    let pos_b = project_flat(b);
    let dx0 = pos_a.0 - pos_b.0;
    let dy0 = pos_a.1 - pos_b.1;

    let closest_time = closest_approach_time(dx0, dy0, rel_x, rel_y, PREDICTION_HORIZON_SEC);
    let dx = dx0 + rel_x * closest_time;
    let dy = dy0 + rel_y * closest_time;
    (dx * dx + dy * dy).sqrt() < LATERAL_SEPARATION_NM
}

fn ground_velocity_components(ac: &AircraftState) -> (f64, f64) {
    let heading_rad = ac.heading.to_radians();
    let nm_per_sec = ac.groundspeed / 3600.0;
    (nm_per_sec * heading_rad.sin(), nm_per_sec * heading_rad.cos())
}

/// A cheap local-tangent-plane approximation (nm east/north of the first
/// aircraft's position) — good enough over the seconds-scale horizon this
/// prediction runs at.
fn project_flat(ac: &AircraftState) -> (f64, f64) {
    (ac.position.lon * ac.position.lat.to_radians().cos() * 60.0, ac.position.lat * 60.0)
}

fn closest_approach_time(dx0: f64, dy0: f64, rel_x: f64, rel_y: f64, horizon: f64) -> f64 {
    let rel_speed_sq = rel_x * rel_x + rel_y * rel_y;
    if rel_speed_sq < 1e-9 {
        return 0.0;
    }
    let t = -(dx0 * rel_x + dy0 * rel_y) / rel_speed_sq;
    t.clamp(0.0, horizon)
}

fn wake_alert(a: &AircraftState, b: &AircraftState, _airport: &AirportData) -> Option<Alert> {
    let (heavy, other) = if a.wake_category == WakeCategory::Heavy {
        (a, b)
    } else if b.wake_category == WakeCategory::Heavy {
        (b, a)
    } else {
        return None;
    };
    if other.wake_category == WakeCategory::Heavy || other.wake_category == WakeCategory::Super {
        return None;
    }
    if !matches!(other.flight_phase, FlightPhase::Final | FlightPhase::Approach) {
        return None;
    }
    if !matches!(heavy.flight_phase, FlightPhase::Final | FlightPhase::Approach) {
        return None;
    }
    let distance = geo::haversine_nm(heavy.position, other.position);
    if distance < WAKE_TRAIL_DISTANCE_NM {
        let pair = sorted_pair(a.id, b.id);
        Some(alert_for(
            AlertType::Wake,
            AlertSeverity::Caution,
            pair,
            format!("{} trailing {} within wake minimum", other.callsign, heavy.callsign),
        ))
    } else {
        None
    }
}

fn is_runway_incursion_on_final(ac: &AircraftState, aircraft: &[AircraftState], airport: &AirportData) -> bool {
    if ac.flight_phase != FlightPhase::Final {
        return false;
    }
    let Some(appr) = &ac.clearances.approach else { return false };
    let Some(rwy) = airport.runway(&appr.runway) else { return false };
    let distance = geo::haversine_nm(ac.position, rwy.threshold);
    if distance > RUNWAY_INCURSION_FINAL_RADIUS_NM {
        return false;
    }
    aircraft
        .iter()
        .any(|other| other.id != ac.id && other.runway_occupying.as_deref() == Some(appr.runway.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::state::*;
    use crate::airport::demo_airport;
    use crate::geo::Position;
    use crate::performance::fallback_performance;
    use std::collections::VecDeque;

    fn sample(id: u64, callsign: &str, position: Position, altitude: f64, heading: f64, groundspeed: f64) -> AircraftState {
        AircraftState {
            id,
            callsign: callsign.to_string(),
            type_designator: "B738".to_string(),
            wake_category: WakeCategory::Large,
            position,
            altitude,
            heading,
            speed: groundspeed,
            groundspeed,
            vertical_speed: 0.0,
            bank_angle: 0.0,
            target_altitude: altitude,
            target_heading: heading,
            target_speed: groundspeed,
            on_ground: false,
            flight_phase: FlightPhase::Cruise,
            category: AircraftCategory::Overflight,
            flight_plan: FlightPlan {
                departure: "EGKK".to_string(),
                arrival: "EGKK".to_string(),
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
    fn detects_lateral_vertical_violation() {
        let airport = demo_airport();
        let a = sample(1, "AAL1", Position::new(51.0, 0.0), 4000.0, 90.0, 250.0);
        let b = sample(2, "DAL1", geo::destination(a.position, 90.0, 1.5), 4000.0, 270.0, 250.0);

        let mut detector = ConflictDetector::new();
        let result = detector.scan(&[a, b], &airport);
        assert_eq!(result.new_alerts.len(), 1);
        assert_eq!(result.new_alerts[0].alert_type, AlertType::Conflict);
        assert_eq!(result.new_alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn alert_clears_once_separation_restored() {
        let airport = demo_airport();
        let a = sample(1, "AAL1", Position::new(51.0, 0.0), 4000.0, 90.0, 250.0);
        let b = sample(2, "DAL1", geo::destination(a.position, 90.0, 1.0), 4000.0, 270.0, 250.0);

        let mut detector = ConflictDetector::new();
        let first = detector.scan(&[a.clone(), b.clone()], &airport);
        assert_eq!(first.new_alerts.len(), 1);

        let far_b = sample(2, "DAL1", geo::destination(a.position, 90.0, 10.0), 4000.0, 270.0, 250.0);
        let second = detector.scan(&[a, far_b], &airport);
        assert!(second.new_alerts.is_empty());
        assert!(second.active_violation_pairs.is_empty());
    }

    #[test]
    fn msaw_fires_below_mva_floor_while_descending() {
        let airport = demo_airport();
        let mut ac = sample(1, "AAL1", airport.reference_position, airport.elevation_ft + 500.0, 180.0, 180.0);
        ac.vertical_speed = -800.0;

        let mut detector = ConflictDetector::new();
        let result = detector.scan(&[ac], &airport);
        assert!(result.new_alerts.iter().any(|a| a.alert_type == AlertType::Msaw));
    }
}
