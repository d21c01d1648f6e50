//! ATCCommand dispatch (§4.7). Grounded on the donor's `commands` module
//! absence — the donor parses free-text pilot/controller chatter rather
//! than dispatching tagged commands — so this is built fresh in the
//! donor's idiom (plain enum, `thiserror` validation errors) rather than
//! adapted from a donor counterpart.

use serde::{Deserialize, Serialize};

use crate::aircraft::manager::AircraftManager;
use crate::aircraft::state::{ApproachClearance, ApproachType, FlightPhase, InboundHandoff};
use crate::airport::AirportData;
use crate::config::RunwayConfig;
use crate::error::CommandError;
use crate::geo::TurnDirection;
use crate::weather::WeatherState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ATCCommand {
    Altitude { altitude_ft: f64 },
    Heading { heading_deg: f64, turn_direction: Option<TurnDirection> },
    Speed { speed_kt: f64 },
    Approach { approach_type: ApproachType, runway: String, maintain_until_established: bool },
    Direct { fix: String },
    Hold { fix: String },
    Handoff { facility: String, frequency: String },
    GoAround,
    DescendViaStar,
    ClimbViaSid,
    ResumeOwnNavigation,
    ExpectApproach { approach_type: ApproachType },
    ExpectRunway { runway: String },
    CancelApproach,
    RadarHandoff,
    RequestFieldSight,
    RequestTrafficSight,
}

/// One inbound `command` message (§6): a callsign, the structured
/// commands riding on it, and the raw pilot-readback text for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerCommand {
    pub callsign: String,
    pub commands: Vec<ATCCommand>,
    pub raw_text: String,
    /// Tick-of-arrival, stamped by the engine's inbound queue (§4.7), not
    /// the transport-layer wall-clock timestamp on the wire message.
    pub tick: u64,
}

/// Ceiling/visibility minimums an approach type requires, checked against
/// `WeatherState` before a clearance is accepted (§7.1 "below minimums").
fn minimums(approach_type: ApproachType) -> (Option<f64>, f64) {
    match approach_type {
        ApproachType::Ils => (Some(200.0), 0.5),
        ApproachType::Rnav => (Some(250.0), 1.0),
        ApproachType::Visual => (Some(1000.0), 3.0),
    }
}

/// Dispatch every command carried by one `ControllerCommand` against the
/// aircraft it names. Returns the first validation failure encountered;
/// commands already applied before the failing one are not rolled back,
/// matching "last-write-wins per clearance field" (§8) rather than
/// transactional all-or-nothing application.
pub fn dispatch(
    controller_command: &ControllerCommand,
    manager: &mut AircraftManager,
    airport: &AirportData,
    runway_config: &RunwayConfig,
    weather: &WeatherState,
) -> Result<(), CommandError> {
    if manager.find_by_callsign(&controller_command.callsign).is_none() {
        return Err(CommandError::UnknownCallsign(controller_command.callsign.clone()));
    }

    for command in &controller_command.commands {
        apply_one(command, &controller_command.callsign, manager, airport, runway_config, weather)?;
    }

    // A controller working an aircraft at all is this crate's stand-in for
    // accepting the inbound handoff offered at spawn (§4.7 names no explicit
    // "accept handoff" command).
    if let Some(ac) = manager.find_by_callsign_mut(&controller_command.callsign) {
        if ac.inbound_handoff == InboundHandoff::Offered {
            ac.inbound_handoff = InboundHandoff::Accepted;
        }
    }

    Ok(())
}

fn apply_one(
    command: &ATCCommand,
    callsign: &str,
    manager: &mut AircraftManager,
    airport: &AirportData,
    runway_config: &RunwayConfig,
    weather: &WeatherState,
) -> Result<(), CommandError> {
    match command {
        ATCCommand::Altitude { altitude_ft } => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.altitude = Some(*altitude_ft);
            ac.target_altitude = *altitude_ft;
        }
        ATCCommand::Heading { heading_deg, turn_direction } => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.heading = Some(*heading_deg);
            ac.clearances.turn_direction = *turn_direction;
            ac.target_heading = *heading_deg;
        }
        ATCCommand::Speed { speed_kt } => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.speed = Some(*speed_kt);
            ac.target_speed = *speed_kt;
        }
        ATCCommand::Approach { approach_type, runway, maintain_until_established } => {
            if !runway_config.arrival_runways.iter().any(|r| r == runway) {
                return Err(CommandError::RunwayNotConfigured(runway.clone()));
            }
            if airport.approach(runway, *approach_type).is_none() {
                return Err(CommandError::UnknownApproach(runway.clone()));
            }
            let (ceiling_min, vis_min) = minimums(*approach_type);
            if weather.visibility_sm < vis_min || weather.ceiling_ft_agl.zip(ceiling_min).is_some_and(|(c, m)| c < m) {
                return Err(CommandError::BelowMinimums(runway.clone()));
            }

            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.approach = Some(ApproachClearance { approach_type: *approach_type, runway: runway.clone() });
            ac.clearances.maintain_until_established = *maintain_until_established;
            if *maintain_until_established {
                ac.clearances.altitude = Some(ac.altitude);
            }
        }
        ATCCommand::Direct { fix } => {
            if airport.fix_position(fix).is_none() {
                return Err(CommandError::UnknownFix(fix.clone()));
            }
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.direct_fix = Some(fix.clone());
        }
        ATCCommand::Hold { fix } => {
            if airport.fix_position(fix).is_none() {
                return Err(CommandError::UnknownFix(fix.clone()));
            }
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            if ac.clearances.hold_fix.as_deref() != Some(fix.as_str()) {
                ac.holding_state = None;
            }
            ac.clearances.hold_fix = Some(fix.clone());
        }
        ATCCommand::Handoff { facility, frequency } => {
            let expected = airport.frequencies.get(facility).cloned().unwrap_or_default();
            if &expected != frequency {
                return Err(CommandError::FrequencyMismatch { given: frequency.clone(), expected });
            }
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.handing_off = true;
            ac.clearances.handoff_frequency = Some(frequency.clone());
            ac.clearances.handoff_facility = Some(facility.clone());
        }
        ATCCommand::GoAround => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.flight_phase = FlightPhase::Missed;
            ac.on_localizer = false;
            ac.on_glideslope = false;
            ac.missed_approach_leg_idx = 0;
        }
        ATCCommand::DescendViaStar => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.descend_via_star = true;
        }
        ATCCommand::ClimbViaSid => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.climb_via_sid = true;
        }
        ATCCommand::ResumeOwnNavigation => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.heading = None;
            ac.clearances.turn_direction = None;
        }
        ATCCommand::ExpectApproach { approach_type } => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.expected_approach = Some(*approach_type);
        }
        ATCCommand::ExpectRunway { runway } => {
            if !runway_config.arrival_runways.iter().chain(runway_config.departure_runways.iter()).any(|r| r == runway) {
                return Err(CommandError::RunwayNotConfigured(runway.clone()));
            }
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.flight_plan.runway = Some(runway.clone());
        }
        ATCCommand::CancelApproach => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.clearances.approach = None;
            ac.clearances.maintain_until_established = false;
            ac.on_localizer = false;
            ac.on_glideslope = false;
        }
        ATCCommand::RadarHandoff => {
            let ac = manager.find_by_callsign_mut(callsign).ok_or_else(|| CommandError::UnknownCallsign(callsign.to_string()))?;
            ac.radar_handoff_state = crate::aircraft::state::RadarHandoffState::Offered;
        }
        // Pilot-facing informational requests — acknowledged over the
        // radio by a layer outside the simulation core, no state mutation.
        ATCCommand::RequestFieldSight | ATCCommand::RequestTrafficSight => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::state::*;
    use crate::airport::demo_airport;
    use crate::config::SessionConfig;
    use crate::geo::Position;
    use crate::performance::{fallback_performance, WakeCategory};
    use std::collections::VecDeque;

    fn sample(callsign: &str) -> AircraftState {
        AircraftState {
            id: 1,
            callsign: callsign.to_string(),
            type_designator: "B738".to_string(),
            wake_category: WakeCategory::Large,
            position: Position::new(51.0, 0.0),
            altitude: 4000.0,
            heading: 90.0,
            speed: 220.0,
            groundspeed: 220.0,
            vertical_speed: 0.0,
            bank_angle: 0.0,
            target_altitude: 4000.0,
            target_heading: 90.0,
            target_speed: 220.0,
            on_ground: false,
            flight_phase: FlightPhase::Approach,
            category: AircraftCategory::Arrival,
            flight_plan: FlightPlan {
                departure: "EGLL".to_string(),
                arrival: "EGKK".to_string(),
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
            airborne_since_tick: Some(0),
            performance: fallback_performance(),
            approach_geometry: None,
        }
    }

    #[test]
    fn unknown_callsign_is_rejected() {
        let mut manager = AircraftManager::new();
        let airport = demo_airport();
        let config = SessionConfig::demo();
        let weather = WeatherState::calm();

        let cmd = ControllerCommand {
            callsign: "GHOST1".to_string(),
            commands: vec![ATCCommand::Altitude { altitude_ft: 5000.0 }],
            raw_text: "climb and maintain 5000".to_string(),
            tick: 0,
        };
        let err = dispatch(&cmd, &mut manager, &airport, &config.runway_config, &weather).unwrap_err();
        assert_eq!(err, CommandError::UnknownCallsign("GHOST1".to_string()));
    }

    #[test]
    fn altitude_command_updates_clearance_and_target() {
        let mut manager = AircraftManager::new();
        manager.insert(sample("AAL1"));
        let airport = demo_airport();
        let config = SessionConfig::demo();
        let weather = WeatherState::calm();

        let cmd = ControllerCommand {
            callsign: "AAL1".to_string(),
            commands: vec![ATCCommand::Altitude { altitude_ft: 6000.0 }],
            raw_text: "descend and maintain 6000".to_string(),
            tick: 0,
        };
        dispatch(&cmd, &mut manager, &airport, &config.runway_config, &weather).unwrap();
        let ac = manager.find_by_callsign("AAL1").unwrap();
        assert_eq!(ac.clearances.altitude, Some(6000.0));
        assert_eq!(ac.target_altitude, 6000.0);
    }

    #[test]
    fn approach_to_unconfigured_runway_is_rejected() {
        let mut manager = AircraftManager::new();
        manager.insert(sample("AAL1"));
        let airport = demo_airport();
        let config = SessionConfig::demo();
        let weather = WeatherState::calm();

        let cmd = ControllerCommand {
            callsign: "AAL1".to_string(),
            commands: vec![ATCCommand::Approach {
                approach_type: ApproachType::Ils,
                runway: "34".to_string(),
                maintain_until_established: false,
            }],
            raw_text: "cleared ILS runway 34 approach".to_string(),
            tick: 0,
        };
        let err = dispatch(&cmd, &mut manager, &airport, &config.runway_config, &weather).unwrap_err();
        assert_eq!(err, CommandError::RunwayNotConfigured("34".to_string()));
    }

    #[test]
    fn hold_to_unknown_fix_is_rejected() {
        let mut manager = AircraftManager::new();
        manager.insert(sample("AAL1"));
        let airport = demo_airport();
        let config = SessionConfig::demo();
        let weather = WeatherState::calm();

        let cmd = ControllerCommand {
            callsign: "AAL1".to_string(),
            commands: vec![ATCCommand::Hold { fix: "ZZZZZ".to_string() }],
            raw_text: "hold at ZZZZZ".to_string(),
            tick: 0,
        };
        let err = dispatch(&cmd, &mut manager, &airport, &config.runway_config, &weather).unwrap_err();
        assert_eq!(err, CommandError::UnknownFix("ZZZZZ".to_string()));
    }
}
