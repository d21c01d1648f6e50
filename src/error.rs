//! The three error classes from §7: command validation, per-aircraft
//! execution faults, and session-fatal errors.

use thiserror::Error;

/// Class 1 — command validation errors (§7.1). Surfaced as
/// `commandResponse{success:false, error}`; never mutates state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("unknown callsign: {0}")]
    UnknownCallsign(String),
    #[error("unknown fix: {0}")]
    UnknownFix(String),
    #[error("runway {0} is not in the active runway configuration")]
    RunwayNotConfigured(String),
    #[error("frequency {given} does not match any facility (expected {expected})")]
    FrequencyMismatch { given: String, expected: String },
    #[error("approach to runway {0} is below weather minimums")]
    BelowMinimums(String),
    #[error("unknown approach type for runway {0}")]
    UnknownApproach(String),
}

/// Class 2 — per-aircraft execution faults (§7.2). Logged; the aircraft is
/// marked degraded for one tick rather than removed outright.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionFault {
    #[error("missing data for fix {0}")]
    MissingFixData(String),
    #[error("missing data for runway {0}")]
    MissingRunwayData(String),
    #[error("non-finite physics output in field {0}")]
    NonFinitePhysics(String),
    #[error("inconsistent clearance combination: {0}")]
    InconsistentClearance(String),
}

/// Class 3 — session-fatal errors (§7.3). Moves the session to `Ended` and
/// emits a final outbound `error` message.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("failed to load airport data: {0}")]
    AirportDataLoad(String),
    #[error("tick loop overran budget: {actual_ms}ms vs expected {expected_ms}ms")]
    TickOverrun { actual_ms: u64, expected_ms: u64 },
    #[error("physics computation failed: {0}")]
    PhysicsPanic(String),
}
