//! `AirportData`: read-only-after-load description of the airport model
//! (§3, §6). Loaded from a single JSON document the same way the donor's
//! `ProfileConfig::load` reads a profile with `serde_json` + `anyhow::Context`.
//! Procedure-leg parsing is grounded on `utils::procedures::load_sids`/
//! `load_stars`, generalized from the donor's colon-delimited sector-file
//! format to the JSON shape §6 specifies.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geo::Position;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runway {
    pub id: String,
    /// Magnetic heading painted on the runway (e.g. 157 for "16").
    pub heading: f64,
    pub threshold: Position,
    pub end: Position,
    pub length_ft: f64,
    pub elevation_ft: f64,
    pub ils_available: bool,
    /// Magnetic ILS course, only meaningful when `ils_available`.
    pub ils_course: Option<f64>,
    pub glideslope_angle_deg: Option<f64>,
}

impl Runway {
    /// The true bearing from threshold to the far end — §9 mandates this
    /// (not the magnetic `heading`/`ils_course`) for all internal geometry.
    pub fn true_bearing(&self) -> f64 {
        crate::geo::true_bearing(self.threshold, self.end)
    }

    pub fn glideslope_angle(&self) -> f64 {
        self.glideslope_angle_deg.unwrap_or(3.0)
    }

    /// Altitude a 3-degree (or configured) glidepath is at, `distance_nm`
    /// from the threshold.
    pub fn glideslope_altitude_at(&self, distance_nm: f64) -> f64 {
        self.elevation_ft + self.glideslope_angle().to_radians().tan() * distance_nm * 6076.12
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegType {
    Tf,
    Df,
    Cf,
    Ca,
    Va,
    Vi,
    Vd,
    Ha,
    Hf,
    Hm,
    /// Any leg type this crate doesn't model yet — tolerated, skipped.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum AltitudeConstraintKind {
    At,
    AtOrAbove,
    AtOrBelow,
    Between,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AltitudeConstraint {
    pub kind: AltitudeConstraintKind,
    pub altitude_ft: f64,
    /// Only populated for `Between`; the upper bound (`altitude_ft` is the
    /// minimum in that case).
    pub max_altitude_ft: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureLeg {
    pub leg_type: LegType,
    pub fix: Option<String>,
    /// True course, for CA/VA/VI/VD legs.
    pub course: Option<f64>,
    pub altitude_constraint: Option<AltitudeConstraint>,
    pub speed_constraint_kt: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub name: String,
    pub runway: Option<String>,
    pub legs: Vec<ProcedureLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approach {
    pub runway: String,
    pub approach_type: crate::aircraft::state::ApproachType,
    pub missed_approach_legs: Vec<ProcedureLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirspacePolygon {
    pub name: String,
    pub floor_ft: f64,
    pub ceiling_ft: f64,
    pub vertices: Vec<Position>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportData {
    pub icao: String,
    pub reference_position: Position,
    pub elevation_ft: f64,
    pub runways: Vec<Runway>,
    pub fixes: HashMap<String, Position>,
    pub navaids: HashMap<String, Position>,
    pub sids: Vec<Procedure>,
    pub stars: Vec<Procedure>,
    pub approaches: Vec<Approach>,
    #[serde(default)]
    pub airspace_polygons: Vec<AirspacePolygon>,
    #[serde(default)]
    pub frequencies: HashMap<String, String>,
}

impl AirportData {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read airport data: {:?}", path.as_ref()))?;
        let data: AirportData = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse airport data JSON: {:?}", path.as_ref()))?;
        Ok(data)
    }

    pub fn runway(&self, id: &str) -> Option<&Runway> {
        self.runways.iter().find(|r| r.id == id)
    }

    pub fn fix_position(&self, name: &str) -> Option<Position> {
        self.fixes.get(name).copied().or_else(|| self.navaids.get(name).copied())
    }

    pub fn sid(&self, name: &str) -> Option<&Procedure> {
        self.sids.iter().find(|s| s.name == name)
    }

    pub fn star(&self, name: &str) -> Option<&Procedure> {
        self.stars.iter().find(|s| s.name == name)
    }

    pub fn approach(&self, runway: &str, approach_type: crate::aircraft::state::ApproachType) -> Option<&Approach> {
        self.approaches
            .iter()
            .find(|a| a.runway == runway && a.approach_type == approach_type)
    }

    /// MVA floor for MSAW (§4.4): real MVA polygons when present, otherwise
    /// the field-elevation + 1000ft stand-in the spec mandates (§9 open
    /// question).
    pub fn mva_floor_at(&self, position: Position, altitude_ft: f64) -> f64 {
        for poly in &self.airspace_polygons {
            if altitude_ft >= poly.floor_ft && altitude_ft <= poly.ceiling_ft && point_in_polygon(position, &poly.vertices) {
                return poly.floor_ft;
            }
        }
        self.elevation_ft + 1000.0
    }
}

fn point_in_polygon(point: Position, vertices: &[Position]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = vertices[i];
        let vj = vertices[j];
        if ((vi.lat > point.lat) != (vj.lat > point.lat))
            && (point.lon
                < (vj.lon - vi.lon) * (point.lat - vi.lat) / (vj.lat - vi.lat) + vi.lon)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A minimal single-runway airport, used as the bundled demo fixture and in
/// tests, built the way the donor's `ScenarioBuilder` constructs fixtures
/// fluently rather than from a file on disk.
pub fn demo_airport() -> AirportData {
    let reference = Position::new(51.1481, -0.1903);
    let threshold16 = Position::new(51.1325, -0.1668);
    let end16 = crate::geo::destination(threshold16, 157.0, 2.0);

    let mut fixes = HashMap::new();
    fixes.insert("TIMBA".to_string(), crate::geo::destination(reference, 157.0, 15.0));
    fixes.insert("LAM".to_string(), crate::geo::destination(reference, 200.0, 25.0));
    fixes.insert("BIG".to_string(), crate::geo::destination(reference, 337.0, 20.0));

    AirportData {
        icao: "EGKK".to_string(),
        reference_position: reference,
        elevation_ft: 167.0,
        runways: vec![Runway {
            id: "16".to_string(),
            heading: 157.0,
            threshold: threshold16,
            end: end16,
            length_ft: 10000.0,
            elevation_ft: 167.0,
            ils_available: true,
            ils_course: Some(157.0),
            glideslope_angle_deg: Some(3.0),
        }],
        fixes,
        navaids: HashMap::new(),
        sids: vec![],
        stars: vec![Procedure {
            name: "TIMBA1A".to_string(),
            runway: None,
            legs: vec![ProcedureLeg {
                leg_type: LegType::Tf,
                fix: Some("TIMBA".to_string()),
                course: None,
                altitude_constraint: Some(AltitudeConstraint {
                    kind: AltitudeConstraintKind::AtOrBelow,
                    altitude_ft: 6000.0,
                    max_altitude_ft: None,
                }),
                speed_constraint_kt: None,
            }],
        }],
        approaches: vec![Approach {
            runway: "16".to_string(),
            approach_type: crate::aircraft::state::ApproachType::Ils,
            missed_approach_legs: vec![],
        }],
        airspace_polygons: vec![],
        frequencies: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_airport_has_runway_16() {
        let airport = demo_airport();
        let rwy = airport.runway("16").expect("runway 16");
        assert!((rwy.true_bearing() - 157.0).abs() < 0.5);
    }

    #[test]
    fn mva_floor_falls_back_without_polygons() {
        let airport = demo_airport();
        let floor = airport.mva_floor_at(airport.reference_position, 3000.0);
        assert_eq!(floor, airport.elevation_ft + 1000.0);
    }
}
