//! External interface message shapes (§6). Plain `serde`-derived enums/structs
//! with no transport attached — wiring these onto a socket is the (out-of-scope)
//! transport layer's job. Grounded on the donor's `server::message::Message`
//! envelope shape, generalized from its FSD wire-protocol framing to the
//! session-facing envelopes this spec names.

use serde::{Deserialize, Serialize};

use crate::aircraft::state::{AircraftId, AircraftState};
use crate::airport::AirportData;
use crate::conflict::Alert;
use crate::config::SessionConfig;
use crate::scoring::ScoreSnapshot;
use crate::weather::WeatherState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Lobby,
    Running,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
    End,
    SetTimeScale,
}

/// `timeScale` only applies to the `setTimeScale` action but rides along on
/// the one envelope shape §6 defines rather than a separate message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionControl {
    pub action: SessionAction,
    pub time_scale: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockState {
    pub tick: u64,
    pub time_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub aircraft: Vec<AircraftState>,
    pub clock: ClockState,
    pub weather: WeatherState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub config: SessionConfig,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RadioSource {
    Controller,
    System,
    Pilot { callsign: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioTransmission {
    pub id: String,
    pub from: RadioSource,
    pub message: String,
    /// Tick-derived simulated time, not a wall-clock `Date.now` timestamp
    /// (§9: determinism).
    pub timestamp: u64,
}

/// `updateScratchPad` (§6): side-band text with no semantic effect,
/// distinguished from `ControllerCommand` since it never touches clearances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchPadUpdate {
    pub aircraft_id: AircraftId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OutboundMessage {
    GameState { state: GameState },
    RadioMessage { transmission: RadioTransmission },
    Alert { alert: Alert },
    ScoreUpdate { score: ScoreSnapshot },
    SessionInfo { session: SessionInfo },
    AirportData { data: AirportData },
    CommandResponse { success: bool, error: Option<String> },
    Error { message: String },
}
