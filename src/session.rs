//! `Session`: the lobby/running/paused/ended state machine wrapping one
//! `SimulationEngine` (§5, §6). Grounded on the donor's `SimulationRunner`
//! owning one profile's worth of mutable simulation state behind a single
//! entry point, generalized from the donor's always-running loop to the
//! explicit start/pause/resume/end control surface §6 names.

use tracing::{error, info, warn};

use crate::aircraft::state::AircraftId;
use crate::airport::AirportData;
use crate::command::ControllerCommand;
use crate::config::SessionConfig;
use crate::engine::SimulationEngine;
use crate::error::SessionError;
use crate::messages::{
    ClockState, GameState, OutboundMessage, RadioSource, RadioTransmission, SessionAction, SessionInfo,
    SessionStatus,
};
use crate::performance::PerformanceDatabase;

/// Time-scale multipliers a `setTimeScale` action may select (§6).
const ALLOWED_TIME_SCALES: [f64; 5] = [0.5, 1.0, 2.0, 4.0, 8.0];

pub struct Session {
    id: String,
    status: SessionStatus,
    config: SessionConfig,
    engine: SimulationEngine,
    time_scale: f64,
    pending_commands: Vec<ControllerCommand>,
    outbox: Vec<OutboundMessage>,
}

impl Session {
    pub fn new(id: String, config: SessionConfig, airport: AirportData, performance_db: PerformanceDatabase, seed: u64) -> Self {
        let engine = SimulationEngine::new(config.clone(), airport, performance_db, seed);
        Self {
            id,
            status: SessionStatus::Lobby,
            config,
            engine,
            time_scale: 1.0,
            pending_commands: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queues one `command` message (§6) for application on the next tick.
    /// Commands are never applied out of turn-order; a session that is
    /// paused or ended simply accumulates them until the queue is drained
    /// at `end`, at which point they're dropped unapplied.
    pub fn apply_commands(&mut self, command: ControllerCommand) {
        self.pending_commands.push(command);
    }

    pub fn update_scratch_pad(&mut self, aircraft_id: AircraftId, text: String) {
        self.engine.update_scratch_pad(aircraft_id, text);
    }

    /// `sessionControl` (§6): start/pause/resume/end/setTimeScale.
    pub fn control(&mut self, action: SessionAction, time_scale: Option<f64>) -> Result<(), SessionError> {
        match action {
            SessionAction::Start => self.start(),
            SessionAction::Pause => {
                if self.status == SessionStatus::Running {
                    self.status = SessionStatus::Paused;
                    info!(session = %self.id, "[SESSION] paused");
                }
            }
            SessionAction::Resume => {
                if self.status == SessionStatus::Paused {
                    self.status = SessionStatus::Running;
                    info!(session = %self.id, "[SESSION] resumed");
                }
            }
            SessionAction::End => self.end(),
            SessionAction::SetTimeScale => {
                let scale = time_scale.unwrap_or(self.time_scale);
                if !ALLOWED_TIME_SCALES.contains(&scale) {
                    warn!(session = %self.id, requested = scale, "[SESSION] rejected time scale outside allowed set");
                    self.outbox.push(OutboundMessage::Error {
                        message: format!("time scale {scale} is not one of the allowed values"),
                    });
                    return Ok(());
                }
                self.time_scale = scale;
                info!(session = %self.id, time_scale = scale, "[SESSION] time scale changed");
            }
        }
        Ok(())
    }

    fn start(&mut self) {
        if self.status != SessionStatus::Lobby {
            return;
        }
        self.engine.pre_spawn();
        self.status = SessionStatus::Running;
        info!(session = %self.id, "[SESSION] started");
        self.outbox.push(OutboundMessage::AirportData { data: self.engine.airport.clone() });
        self.outbox.push(OutboundMessage::SessionInfo {
            session: SessionInfo { id: self.id.clone(), config: self.config.clone(), status: self.status },
        });
    }

    fn end(&mut self) {
        if self.status == SessionStatus::Ended {
            return;
        }
        self.pending_commands.clear();
        self.push_snapshot();
        self.status = SessionStatus::Ended;
        info!(session = %self.id, "[SESSION] ended");
        self.outbox.push(OutboundMessage::SessionInfo {
            session: SessionInfo { id: self.id.clone(), config: self.config.clone(), status: self.status },
        });
    }

    /// Session-fatal handling (§7.3): ends the session and emits a final
    /// `error` message rather than letting the tick loop continue against
    /// state a failed component may have left inconsistent.
    pub fn fail(&mut self, err: SessionError) {
        error!(session = %self.id, error = %err, "[SESSION] session-fatal error");
        self.status = SessionStatus::Ended;
        self.outbox.push(OutboundMessage::Error { message: err.to_string() });
    }

    /// Advances the simulation exactly one tick. A no-op outside `running`
    /// (§5): paused sessions hold state, lobby/ended sessions have none to
    /// advance.
    pub fn tick(&mut self) -> Result<(), SessionError> {
        if self.status != SessionStatus::Running {
            return Ok(());
        }

        let commands = std::mem::take(&mut self.pending_commands);
        let output = self.engine.tick(commands, self.time_scale);

        for (cmd, result) in output.command_results {
            let (success, error) = match result {
                Ok(()) => (true, None),
                Err(e) => {
                    warn!(session = %self.id, callsign = %cmd.callsign, error = %e, "[SESSION] command rejected");
                    (false, Some(e.to_string()))
                }
            };
            self.outbox.push(OutboundMessage::CommandResponse { success, error });
        }

        for alert in &output.new_alerts {
            self.outbox.push(OutboundMessage::Alert { alert: alert.clone() });
        }

        for ac in &output.removed {
            self.outbox.push(OutboundMessage::RadioMessage {
                transmission: RadioTransmission {
                    id: format!("{}-handled-{}", ac.callsign, self.engine.tick_count),
                    from: RadioSource::System,
                    message: format!("{} leaving the frequency", ac.callsign),
                    timestamp: self.engine.tick_count,
                },
            });
        }

        self.outbox.push(OutboundMessage::ScoreUpdate { score: self.engine.score() });
        self.push_snapshot();

        Ok(())
    }

    fn push_snapshot(&mut self) {
        let state = GameState {
            aircraft: self.engine.aircraft().cloned().collect(),
            clock: ClockState { tick: self.engine.tick_count, time_scale: self.time_scale },
            weather: self.engine.weather.clone(),
        };
        self.outbox.push(OutboundMessage::GameState { state });
    }

    /// Drains every outbound message queued since the last call (§6).
    pub fn drain_outbox(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::demo_airport;
    use crate::performance::default_performance_database;

    fn demo_session() -> Session {
        Session::new(
            "s1".to_string(),
            SessionConfig::demo(),
            demo_airport(),
            default_performance_database(),
            7,
        )
    }

    #[test]
    fn tick_before_start_is_a_noop() {
        let mut session = demo_session();
        session.tick().unwrap();
        assert!(session.drain_outbox().is_empty());
    }

    #[test]
    fn start_emits_airport_data_and_session_info() {
        let mut session = demo_session();
        session.control(SessionAction::Start, None).unwrap();
        let outbox = session.drain_outbox();
        assert!(outbox.iter().any(|m| matches!(m, OutboundMessage::AirportData { .. })));
        assert!(outbox.iter().any(|m| matches!(m, OutboundMessage::SessionInfo { .. })));
        assert_eq!(session.status(), SessionStatus::Running);
    }

    #[test]
    fn pause_stops_ticks_from_advancing_the_clock() {
        let mut session = demo_session();
        session.control(SessionAction::Start, None).unwrap();
        session.drain_outbox();
        session.tick().unwrap();
        let tick_before = session.engine.tick_count;

        session.control(SessionAction::Pause, None).unwrap();
        session.tick().unwrap();
        assert_eq!(session.engine.tick_count, tick_before);
    }

    #[test]
    fn set_time_scale_rejects_unlisted_values() {
        let mut session = demo_session();
        session.control(SessionAction::SetTimeScale, Some(3.0)).unwrap();
        let outbox = session.drain_outbox();
        assert!(outbox.iter().any(|m| matches!(m, OutboundMessage::Error { .. })));
    }

    #[test]
    fn end_drains_pending_commands_and_emits_final_snapshot() {
        let mut session = demo_session();
        session.control(SessionAction::Start, None).unwrap();
        session.drain_outbox();
        session.apply_commands(ControllerCommand {
            callsign: "GHOST".to_string(),
            commands: vec![],
            raw_text: String::new(),
            tick: 0,
        });
        session.control(SessionAction::End, None).unwrap();
        assert_eq!(session.status(), SessionStatus::Ended);
        let outbox = session.drain_outbox();
        assert!(outbox.iter().any(|m| matches!(m, OutboundMessage::GameState { .. })));
    }
}
