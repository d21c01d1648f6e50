//! Weather state the PhysicsEngine reads for wind and the executor/scoring
//! consult for approach minimums. The weather *generator* is an out-of-scope
//! external collaborator (§1); this module only holds and looks up state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindLayer {
    pub altitude_ft: f64,
    pub direction_deg: f64,
    pub speed_kt: f64,
    pub gusts_kt: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherState {
    pub winds: Vec<WindLayer>,
    pub altimeter_inhg: f64,
    pub temperature_c: f64,
    pub visibility_sm: f64,
    pub ceiling_ft_agl: Option<f64>,
}

/// Minimums a CAT I ILS requires to remain playable (§8 boundary property).
pub const MIN_PLAYABLE_CEILING_FT: f64 = 250.0;
pub const MIN_PLAYABLE_VISIBILITY_SM: f64 = 0.5;

impl WeatherState {
    pub fn calm() -> Self {
        Self {
            winds: vec![WindLayer {
                altitude_ft: 0.0,
                direction_deg: 0.0,
                speed_kt: 0.0,
                gusts_kt: None,
            }],
            altimeter_inhg: 29.92,
            temperature_c: 15.0,
            visibility_sm: 10.0,
            ceiling_ft_agl: None,
        }
    }

    /// Wind vector (direction degrees true, speed kt) at `altitude_ft`,
    /// linearly interpolated between the two bracketing configured layers.
    pub fn wind_at_altitude(&self, altitude_ft: f64) -> (f64, f64) {
        if self.winds.is_empty() {
            return (0.0, 0.0);
        }
        let mut sorted: Vec<&WindLayer> = self.winds.iter().collect();
        sorted.sort_by(|a, b| a.altitude_ft.partial_cmp(&b.altitude_ft).unwrap());

        if altitude_ft <= sorted[0].altitude_ft {
            return (sorted[0].direction_deg, sorted[0].speed_kt);
        }
        if altitude_ft >= sorted[sorted.len() - 1].altitude_ft {
            let top = sorted[sorted.len() - 1];
            return (top.direction_deg, top.speed_kt);
        }

        for pair in sorted.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if altitude_ft >= lo.altitude_ft && altitude_ft <= hi.altitude_ft {
                let span = hi.altitude_ft - lo.altitude_ft;
                let t = if span.abs() < f64::EPSILON {
                    0.0
                } else {
                    (altitude_ft - lo.altitude_ft) / span
                };
                let dir = lo.direction_deg + t * crate::geo::heading_diff(lo.direction_deg, hi.direction_deg);
                let speed = lo.speed_kt + t * (hi.speed_kt - lo.speed_kt);
                return (crate::geo::normalize_heading(dir), speed);
            }
        }
        (sorted[0].direction_deg, sorted[0].speed_kt)
    }

    /// Ensure ceiling/visibility never fall below what an ILS approach needs,
    /// so a session is always completable (§8).
    pub fn clamp_for_playability(&mut self) {
        if self.visibility_sm < MIN_PLAYABLE_VISIBILITY_SM {
            self.visibility_sm = MIN_PLAYABLE_VISIBILITY_SM;
        }
        if let Some(ceiling) = self.ceiling_ft_agl {
            if ceiling < MIN_PLAYABLE_CEILING_FT {
                self.ceiling_ft_agl = Some(MIN_PLAYABLE_CEILING_FT);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_raises_low_minimums() {
        let mut w = WeatherState {
            winds: vec![],
            altimeter_inhg: 29.92,
            temperature_c: 10.0,
            visibility_sm: 0.1,
            ceiling_ft_agl: Some(50.0),
        };
        w.clamp_for_playability();
        assert_eq!(w.visibility_sm, MIN_PLAYABLE_VISIBILITY_SM);
        assert_eq!(w.ceiling_ft_agl, Some(MIN_PLAYABLE_CEILING_FT));
    }

    #[test]
    fn wind_interpolates_between_layers() {
        let w = WeatherState {
            winds: vec![
                WindLayer { altitude_ft: 0.0, direction_deg: 0.0, speed_kt: 10.0, gusts_kt: None },
                WindLayer { altitude_ft: 10000.0, direction_deg: 90.0, speed_kt: 30.0, gusts_kt: None },
            ],
            altimeter_inhg: 29.92,
            temperature_c: 10.0,
            visibility_sm: 10.0,
            ceiling_ft_agl: None,
        };
        let (dir, speed) = w.wind_at_altitude(5000.0);
        assert!((dir - 45.0).abs() < 1e-6);
        assert!((speed - 20.0).abs() < 1e-6);
    }
}
