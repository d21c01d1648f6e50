//! Per-aircraft-type performance envelope: speeds and climb/descent rates
//! the FlightPlanExecutor and PhysicsEngine consult. Grounded on the donor's
//! `utils::performance::AircraftPerformance` altitude-banded lookup, flattened
//! into a single envelope per type since this crate doesn't ingest a
//! sector-file performance table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeCategory {
    Super,
    Heavy,
    Large,
    Small,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AircraftPerformance {
    pub wake_category: WakeCategory,
    /// Maximum operating speed (kt IAS).
    pub vmo: f64,
    /// Minimum clean speed (kt IAS), used as the speed-management floor.
    pub vmin: f64,
    /// Minimum speed with landing flaps (kt IAS), used for wake/visual-follow spacing.
    pub vmin_flaps: f64,
    /// Reference landing speed (kt IAS).
    pub vref: f64,
    /// Final approach speed (typically Vref + 5-10, used as the "stabilized" target).
    pub vapp: f64,
    pub standard_climb_fpm: f64,
    pub standard_descent_fpm: f64,
    pub taxi_speed_kt: f64,
}

pub type PerformanceDatabase = HashMap<String, AircraftPerformance>;

/// Build the default, process-wide immutable performance table covering the
/// fleet types the ScenarioGenerator draws from (§4.6): mainline, regional,
/// cargo, and GA/VFR types.
pub fn default_performance_database() -> PerformanceDatabase {
    let mut db = PerformanceDatabase::new();

    let mut insert = |types: &[&str], perf: AircraftPerformance| {
        for t in types {
            db.insert((*t).to_string(), perf);
        }
    };

    insert(
        &["B738", "B737"],
        AircraftPerformance {
            wake_category: WakeCategory::Large,
            vmo: 340.0,
            vmin: 130.0,
            vmin_flaps: 115.0,
            vref: 140.0,
            vapp: 148.0,
            standard_climb_fpm: 2200.0,
            standard_descent_fpm: 1800.0,
            taxi_speed_kt: 15.0,
        },
    );
    insert(
        &["A320", "A21N"],
        AircraftPerformance {
            wake_category: WakeCategory::Large,
            vmo: 350.0,
            vmin: 128.0,
            vmin_flaps: 113.0,
            vref: 138.0,
            vapp: 146.0,
            standard_climb_fpm: 2300.0,
            standard_descent_fpm: 1800.0,
            taxi_speed_kt: 15.0,
        },
    );
    insert(
        &["CRJ9", "CRJ7", "CRJ2"],
        AircraftPerformance {
            wake_category: WakeCategory::Small,
            vmo: 320.0,
            vmin: 120.0,
            vmin_flaps: 105.0,
            vref: 132.0,
            vapp: 140.0,
            standard_climb_fpm: 2500.0,
            standard_descent_fpm: 2000.0,
            taxi_speed_kt: 15.0,
        },
    );
    insert(
        &["E75L", "E170", "E145"],
        AircraftPerformance {
            wake_category: WakeCategory::Small,
            vmo: 320.0,
            vmin: 122.0,
            vmin_flaps: 108.0,
            vref: 135.0,
            vapp: 143.0,
            standard_climb_fpm: 2400.0,
            standard_descent_fpm: 2000.0,
            taxi_speed_kt: 15.0,
        },
    );
    insert(
        &["C172", "C182"],
        AircraftPerformance {
            wake_category: WakeCategory::Small,
            vmo: 140.0,
            vmin: 55.0,
            vmin_flaps: 45.0,
            vref: 65.0,
            vapp: 70.0,
            standard_climb_fpm: 700.0,
            standard_descent_fpm: 500.0,
            taxi_speed_kt: 10.0,
        },
    );
    insert(
        &["SR22"],
        AircraftPerformance {
            wake_category: WakeCategory::Small,
            vmo: 180.0,
            vmin: 65.0,
            vmin_flaps: 55.0,
            vref: 75.0,
            vapp: 80.0,
            standard_climb_fpm: 1000.0,
            standard_descent_fpm: 600.0,
            taxi_speed_kt: 10.0,
        },
    );
    insert(
        &["C56X", "CL30"],
        AircraftPerformance {
            wake_category: WakeCategory::Small,
            vmo: 340.0,
            vmin: 105.0,
            vmin_flaps: 95.0,
            vref: 115.0,
            vapp: 122.0,
            standard_climb_fpm: 3000.0,
            standard_descent_fpm: 2200.0,
            taxi_speed_kt: 10.0,
        },
    );
    db.insert(
        "B77W".to_string(),
        AircraftPerformance {
            wake_category: WakeCategory::Heavy,
            vmo: 360.0,
            vmin: 145.0,
            vmin_flaps: 128.0,
            vref: 150.0,
            vapp: 158.0,
            standard_climb_fpm: 2000.0,
            standard_descent_fpm: 1800.0,
            taxi_speed_kt: 15.0,
        },
    );
    db.insert(
        "A388".to_string(),
        AircraftPerformance {
            wake_category: WakeCategory::Super,
            vmo: 330.0,
            vmin: 140.0,
            vmin_flaps: 125.0,
            vref: 145.0,
            vapp: 153.0,
            standard_climb_fpm: 1800.0,
            standard_descent_fpm: 1600.0,
            taxi_speed_kt: 15.0,
        },
    );

    db
}

/// Fallback envelope for an unknown type designator, so the executor never
/// has to special-case a missing table entry.
pub fn fallback_performance() -> AircraftPerformance {
    AircraftPerformance {
        wake_category: WakeCategory::Large,
        vmo: 340.0,
        vmin: 130.0,
        vmin_flaps: 115.0,
        vref: 140.0,
        vapp: 148.0,
        standard_climb_fpm: 2000.0,
        standard_descent_fpm: 1800.0,
        taxi_speed_kt: 15.0,
    }
}

static FALLBACK: AircraftPerformance = AircraftPerformance {
    wake_category: WakeCategory::Large,
    vmo: 340.0,
    vmin: 130.0,
    vmin_flaps: 115.0,
    vref: 140.0,
    vapp: 148.0,
    standard_climb_fpm: 2000.0,
    standard_descent_fpm: 1800.0,
    taxi_speed_kt: 15.0,
};

pub fn lookup<'a>(db: &'a PerformanceDatabase, type_designator: &str) -> &'a AircraftPerformance {
    db.get(type_designator).unwrap_or(&FALLBACK)
}

/// Regulatory/structural speed ceiling below 10,000 ft (§4.3 default pilot speed).
pub const SPEED_CAP_BELOW_10K: f64 = 250.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_database_covers_fleet_types() {
        let db = default_performance_database();
        for t in ["B738", "A320", "CRJ9", "E75L", "C172", "SR22", "B77W", "A388"] {
            assert!(db.contains_key(t), "missing {t}");
        }
    }

    #[test]
    fn lookup_falls_back_for_unknown_type() {
        let db = default_performance_database();
        let perf = lookup(&db, "ZZZZ");
        assert_eq!(perf.vref, fallback_performance().vref);
    }
}
