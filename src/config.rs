//! `SessionConfig` and the density/scenario-type vocabulary ScenarioGenerator
//! reads (§3, §4.6). Grounded on the donor's `config::ProfileConfig`
//! (serde-derived, `camelCase` over the wire) but scoped to what a session
//! actually configures rather than a whole sector-file profile.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Density {
    Light,
    Moderate,
    Heavy,
}

impl Density {
    /// Pre-spawn population size at session start (§4.6).
    pub fn pre_spawn_count(self) -> usize {
        match self {
            Density::Light => 4,
            Density::Moderate => 7,
            Density::Heavy => 14,
        }
    }

    /// Ongoing operations per hour, feeding the spawn-interval formula.
    pub fn ops_per_hour(self) -> f64 {
        match self {
            Density::Light => 8.0,
            Density::Moderate => 16.0,
            Density::Heavy => 28.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioType {
    Arrivals,
    Departures,
    Mixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunwayConfig {
    pub arrival_runways: Vec<String>,
    pub departure_runways: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub airport: String,
    pub density: Density,
    pub scenario_type: ScenarioType,
    pub runway_config: RunwayConfig,
    pub initial_weather: crate::weather::WeatherState,
}

impl SessionConfig {
    /// A single-runway demo configuration matching `airport::demo_airport`,
    /// used by the CLI runner and integration tests.
    pub fn demo() -> Self {
        Self {
            airport: "EGKK".to_string(),
            density: Density::Light,
            scenario_type: ScenarioType::Mixed,
            runway_config: RunwayConfig {
                arrival_runways: vec!["16".to_string()],
                departure_runways: vec!["16".to_string()],
            },
            initial_weather: crate::weather::WeatherState::calm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_tiers_match_spec_counts() {
        assert_eq!(Density::Light.pre_spawn_count(), 4);
        assert_eq!(Density::Moderate.pre_spawn_count(), 7);
        assert_eq!(Density::Heavy.pre_spawn_count(), 14);
    }

    #[test]
    fn demo_config_round_trips_through_json() {
        let config = SessionConfig::demo();
        let json = serde_json::to_string(&config).expect("serialize");
        let restored: SessionConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored.airport, "EGKK");
    }
}
