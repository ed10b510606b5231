//! Wind-driven drift and decay of confirmed turbulence cells.
//!
//! Each step displaces every cell by the wind over one time step, nudges its
//! altitude and diameter from the vertical shear, and decays its confidence.
//! Cells whose confidence falls at or below the drop threshold are pruned, so
//! no cell survives indefinitely.

use thiserror::Error;

use crate::cells::TurbulenceCell;
use crate::sources::WindSample;

/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 111_000.0;
/// Meters per degree of longitude, taken as latitude-independent at the
/// mid-latitudes the drift model targets.
const METERS_PER_DEG_LON: f64 = 85_000.0;

/// Altitude response to differential shear, meters per m/s.
const SHEAR_ALTITUDE_FACTOR: f64 = 0.1;
/// Diameter growth per unit of total shear, km per m/s.
const SHEAR_DIAMETER_FACTOR: f64 = 0.01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdvectionError {
    #[error("{cells} cells but {winds} wind samples; inputs must be index-aligned")]
    LengthMismatch { cells: usize, winds: usize },
}

/// Parameters of the advection simulation.
#[derive(Debug, Clone, Copy)]
pub struct AdvectionEngine {
    /// Simulated time step per call, in seconds.
    pub delta_t_secs: f64,
    /// Multiplicative confidence decay applied on every call.
    pub decay_factor: f64,
    /// Cells whose decayed confidence is at or below this are dropped.
    pub drop_threshold: f64,
}

impl Default for AdvectionEngine {
    fn default() -> Self {
        Self {
            delta_t_secs: 60.0,
            decay_factor: 0.95,
            drop_threshold: 0.2,
        }
    }
}

impl AdvectionEngine {
    /// Advance every cell one time step under its index-aligned wind sample.
    ///
    /// Output order follows input order, minus pruned cells. Mismatched input
    /// lengths are an input contract violation and fail fast.
    pub fn step(
        &self,
        cells: &[TurbulenceCell],
        winds: &[WindSample],
    ) -> Result<Vec<TurbulenceCell>, AdvectionError> {
        if cells.len() != winds.len() {
            return Err(AdvectionError::LengthMismatch {
                cells: cells.len(),
                winds: winds.len(),
            });
        }

        let mut survivors = Vec::with_capacity(cells.len());
        for (cell, wind) in cells.iter().zip(winds) {
            let confidence = cell.confidence * self.decay_factor;
            if confidence <= self.drop_threshold {
                continue;
            }

            let direction_rad = wind.direction_deg.to_radians();
            let dx_m = wind.speed_ms * self.delta_t_secs * direction_rad.cos();
            let dy_m = wind.speed_ms * self.delta_t_secs * direction_rad.sin();

            let shear_spread = wind.shear_above_ms.abs() + wind.shear_below_ms.abs();

            survivors.push(TurbulenceCell {
                latitude: cell.latitude + dy_m / METERS_PER_DEG_LAT,
                longitude: cell.longitude + dx_m / METERS_PER_DEG_LON,
                altitude_m: cell.altitude_m
                    + (wind.shear_above_ms - wind.shear_below_ms) * SHEAR_ALTITUDE_FACTOR,
                diameter_km: (cell.diameter_km + shear_spread * SHEAR_DIAMETER_FACTOR).max(0.0),
                confidence,
            });
        }
        Ok(survivors)
    }
}
