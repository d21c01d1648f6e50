//! `AircraftManager`: the single owning container for all live
//! `AircraftState` records (§3 lifecycle, §5 ownership). Grounded on the
//! donor's `SimulationRunner`/`Simulator`, which hold `planes: Vec<Plane>`
//! plus `used_callsigns`/`used_squawks` sets — generalized here to an
//! insertion-ordered map keyed by id, as the spec requires.

use std::collections::{HashMap, HashSet};

use crate::aircraft::state::{AircraftId, AircraftState};

/// Insertion-order-preserving map keyed by aircraft id: a `HashMap` plus a
/// parallel order `Vec`, the same two-structure approach the donor uses for
/// `used_callsigns`/`used_squawks` bookkeeping alongside its `Vec<Plane>`.
#[derive(Debug, Default)]
pub struct AircraftManager {
    aircraft: HashMap<AircraftId, AircraftState>,
    order: Vec<AircraftId>,
    next_id: AircraftId,
    used_callsigns: HashSet<String>,
    to_remove: Vec<AircraftId>,
}

impl AircraftManager {
    pub fn new() -> Self {
        Self {
            aircraft: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
            used_callsigns: HashSet::new(),
            to_remove: Vec::new(),
        }
    }

    pub fn next_id(&mut self) -> AircraftId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, aircraft: AircraftState) {
        self.used_callsigns.insert(aircraft.callsign.clone());
        self.order.push(aircraft.id);
        self.aircraft.insert(aircraft.id, aircraft);
    }

    pub fn callsign_taken(&self, callsign: &str) -> bool {
        self.used_callsigns.contains(callsign)
    }

    pub fn get(&self, id: AircraftId) -> Option<&AircraftState> {
        self.aircraft.get(&id)
    }

    pub fn get_mut(&mut self, id: AircraftId) -> Option<&mut AircraftState> {
        self.aircraft.get_mut(&id)
    }

    pub fn find_by_callsign(&self, callsign: &str) -> Option<&AircraftState> {
        self.aircraft.values().find(|a| a.callsign == callsign)
    }

    pub fn find_by_callsign_mut(&mut self, callsign: &str) -> Option<&mut AircraftState> {
        self.aircraft.values_mut().find(|a| a.callsign == callsign)
    }

    /// Iterate aircraft in insertion order — the order every per-tick
    /// component loop must respect (§4.1, §5).
    pub fn iter(&self) -> impl Iterator<Item = &AircraftState> {
        self.order.iter().filter_map(move |id| self.aircraft.get(id))
    }

    /// Ids in insertion order, for callers that need to mutate one
    /// aircraft at a time (e.g. `manager.get_mut(id)`) while still being
    /// able to borrow the manager immutably elsewhere in the same step.
    pub fn ids_in_order(&self) -> Vec<AircraftId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Queue an aircraft for removal. Removal is deferred to
    /// `apply_removals` so no component can observe a mid-tick vanish
    /// (§3 lifecycle: "a single-tick decision made after all per-tick
    /// components have run").
    pub fn queue_removal(&mut self, id: AircraftId) {
        if !self.to_remove.contains(&id) {
            self.to_remove.push(id);
        }
    }

    /// Apply all queued removals, returning the removed records for
    /// logging/scoring purposes.
    pub fn apply_removals(&mut self) -> Vec<AircraftState> {
        let mut removed = Vec::new();
        for id in self.to_remove.drain(..) {
            if let Some(ac) = self.aircraft.remove(&id) {
                self.used_callsigns.remove(&ac.callsign);
                self.order.retain(|&o| o != id);
                removed.push(ac);
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::state::*;
    use crate::geo::Position;
    use crate::performance::WakeCategory;
    use std::collections::VecDeque;

    fn sample(id: AircraftId, callsign: &str) -> AircraftState {
        AircraftState {
            id,
            callsign: callsign.to_string(),
            type_designator: "B738".to_string(),
            wake_category: WakeCategory::Large,
            position: Position::new(51.0, 0.0),
            altitude: 5000.0,
            heading: 90.0,
            speed: 250.0,
            groundspeed: 250.0,
            vertical_speed: 0.0,
            bank_angle: 0.0,
            target_altitude: 5000.0,
            target_heading: 90.0,
            target_speed: 250.0,
            on_ground: false,
            flight_phase: FlightPhase::Cruise,
            category: AircraftCategory::Overflight,
            flight_plan: FlightPlan {
                departure: "EGKK".to_string(),
                arrival: "EGLL".to_string(),
                cruise_altitude: 30000.0,
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
            airborne_since_tick: None,
            performance: crate::performance::fallback_performance(),
            approach_geometry: None,
        }
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut mgr = AircraftManager::new();
        mgr.insert(sample(1, "AAL1"));
        mgr.insert(sample(2, "DAL1"));
        mgr.insert(sample(3, "UAL1"));

        let callsigns: Vec<&str> = mgr.iter().map(|a| a.callsign.as_str()).collect();
        assert_eq!(callsigns, vec!["AAL1", "DAL1", "UAL1"]);
    }

    #[test]
    fn removal_is_deferred_until_apply() {
        let mut mgr = AircraftManager::new();
        mgr.insert(sample(1, "AAL1"));
        mgr.insert(sample(2, "DAL1"));

        mgr.queue_removal(1);
        assert_eq!(mgr.len(), 2, "removal must not take effect immediately");

        let removed = mgr.apply_removals();
        assert_eq!(removed.len(), 1);
        assert_eq!(mgr.len(), 1);
        assert!(!mgr.callsign_taken("AAL1"));
        assert!(mgr.callsign_taken("DAL1"));
    }

    #[test]
    fn callsign_uniqueness_tracking() {
        let mut mgr = AircraftManager::new();
        assert!(!mgr.callsign_taken("BAW1"));
        mgr.insert(sample(1, "BAW1"));
        assert!(mgr.callsign_taken("BAW1"));
    }
}
