//! `AircraftState`: the central per-aircraft record (§3). Consolidates the
//! donor's two parallel, never-unified models (`aircraft::Aircraft` and
//! `simulator::Plane`) into the single record the spec's data model
//! requires — kinematics from `Plane`, route/phase bookkeeping from
//! `Aircraft`, plus the approach/hold/handoff state neither donor model had.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geo::Position;
use crate::performance::{AircraftPerformance, WakeCategory};

pub type AircraftId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    Departure,
    Climb,
    Cruise,
    Descent,
    Approach,
    Final,
    Landed,
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AircraftCategory {
    Arrival,
    Departure,
    Overflight,
    Vfr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundHandoff {
    None,
    Offered,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadarHandoffState {
    None,
    Offered,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApproachType {
    Ils,
    Rnav,
    Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldPhase {
    TurningOutbound,
    Outbound,
    TurningInbound,
    Inbound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingState {
    pub phase: HoldPhase,
    pub inbound_course: f64,
    /// Tick (sim-second) the current leg phase started.
    pub leg_start_tick: u64,
    pub fix_position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachClearance {
    pub approach_type: ApproachType,
    pub runway: String,
}

/// Geometry the executor resolves from `AirportData` once per tick and
/// caches on the aircraft, so PhysicsEngine's `updateAircraft` contract
/// (`ac, weather, dt` — no airport reference) still has what it needs for
/// the ILS snap-to-centerline and glideslope-VS steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ApproachGeometry {
    pub course_bearing: f64,
    pub course_point: Position,
    pub glideslope_angle_deg: f64,
    pub runway_elevation_ft: f64,
}

/// ATC instructions currently in force for an aircraft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clearances {
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub turn_direction: Option<crate::geo::TurnDirection>,
    pub speed: Option<f64>,
    pub approach: Option<ApproachClearance>,
    pub hold_fix: Option<String>,
    pub direct_fix: Option<String>,
    pub procedure: Option<String>,
    pub climb_via_sid: bool,
    pub descend_via_star: bool,
    pub expected_approach: Option<ApproachType>,
    pub maintain_until_established: bool,
    pub handoff_frequency: Option<String>,
    pub handoff_facility: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPlan {
    pub departure: String,
    pub arrival: String,
    pub cruise_altitude: f64,
    pub route: Vec<String>,
    pub sid: Option<String>,
    pub star: Option<String>,
    pub runway: Option<String>,
    pub squawk: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub position: Position,
    pub tick: u64,
}

pub const HISTORY_TRAIL_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftState {
    pub id: AircraftId,
    pub callsign: String,
    pub type_designator: String,
    pub wake_category: WakeCategory,

    pub position: Position,
    pub altitude: f64,
    pub heading: f64,
    pub speed: f64,
    pub groundspeed: f64,
    pub vertical_speed: f64,
    pub bank_angle: f64,

    pub target_altitude: f64,
    pub target_heading: f64,
    pub target_speed: f64,

    pub on_ground: bool,
    pub flight_phase: FlightPhase,
    pub category: AircraftCategory,

    pub flight_plan: FlightPlan,
    pub clearances: Clearances,
    pub current_fix_index: usize,

    pub on_localizer: bool,
    pub on_glideslope: bool,

    pub handing_off: bool,
    pub inbound_handoff: InboundHandoff,
    pub inbound_handoff_offered_at: Option<u64>,
    pub radar_handoff_state: RadarHandoffState,

    pub holding_state: Option<HoldingState>,

    pub sid_legs: Vec<crate::airport::ProcedureLeg>,
    pub sid_leg_idx: usize,
    /// Cursor into the active approach's `missed_approach_legs`, independent
    /// of `sid_leg_idx` since an aircraft never runs both leg sequences at
    /// once but the two must not clobber each other across a go-around.
    pub missed_approach_leg_idx: usize,

    pub runway_occupying: Option<String>,
    pub rollout_distance_nm: f64,

    pub visual_follow_traffic_callsign: Option<String>,

    pub history_trail: VecDeque<HistoryPoint>,

    pub scratch_pad: String,
    pub degraded_ticks: u8,

    /// Tick this aircraft went airborne (departures) or was spawned
    /// (arrivals). Used by ScoringEngine's handoff-timing grace periods.
    pub spawned_at_tick: u64,
    pub airborne_since_tick: Option<u64>,

    /// Resolved per-type speed/rate envelope, denormalized onto the
    /// aircraft at spawn time so PhysicsEngine never needs the database.
    pub performance: AircraftPerformance,

    /// Resolved runway centerline/glideslope geometry, refreshed by the
    /// executor each tick an approach clearance is active.
    pub approach_geometry: Option<ApproachGeometry>,
}

impl AircraftState {
    pub fn push_history(&mut self, tick: u64) {
        if self.history_trail.len() >= HISTORY_TRAIL_LEN {
            self.history_trail.pop_front();
        }
        self.history_trail.push_back(HistoryPoint { position: self.position, tick });
    }

    pub fn is_airborne(&self) -> bool {
        !self.on_ground
    }

    /// §3 universal invariants, used by tests and as a cheap in-engine sanity
    /// check after physics each tick.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !(0.0..360.0).contains(&self.heading) {
            return Err(format!("heading out of range: {}", self.heading));
        }
        if self.speed < 0.0 {
            return Err(format!("negative speed: {}", self.speed));
        }
        if self.on_localizer && !matches!(self.flight_phase, FlightPhase::Final | FlightPhase::Approach) {
            return Err("on_localizer set outside final/approach".to_string());
        }
        if (self.inbound_handoff == InboundHandoff::Offered) != self.inbound_handoff_offered_at.is_some() {
            return Err("inbound_handoff/offered_at mismatch".to_string());
        }
        if self.current_fix_index > self.flight_plan.route.len() {
            return Err("current_fix_index out of range".to_string());
        }
        if self.holding_state.is_some() && self.clearances.hold_fix.is_none() {
            return Err("holding_state set without hold_fix clearance".to_string());
        }
        Ok(())
    }
}
