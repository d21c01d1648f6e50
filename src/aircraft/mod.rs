pub mod manager;
pub mod state;

pub use manager::AircraftManager;
pub use state::{AircraftCategory, AircraftId, AircraftState, FlightPhase};
