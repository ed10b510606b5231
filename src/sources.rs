//! Collaborator interfaces: live telemetry and wind data.
//!
//! The orchestrator only ever talks to these traits; the concrete OpenSky and
//! Open-Meteo clients live in their own modules and tests substitute scripted
//! implementations.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cells::GeoPoint;

/// One aircraft state vector as delivered by the telemetry source.
///
/// Sources drop rows missing position or vertical rate before they get here,
/// so every field is always populated.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftFix {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub vertical_rate_ms: f64,
}

impl AircraftFix {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude, self.altitude_m)
    }
}

/// Area filter forwarded verbatim to the telemetry source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

/// Wind observed at one queried position and pressure level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub speed_ms: f64,
    pub direction_deg: f64,
    /// Speed difference to the adjacent pressure level above, m/s.
    pub shear_above_ms: f64,
    /// Speed difference to the adjacent pressure level below, m/s.
    pub shear_below_ms: f64,
}

impl WindSample {
    /// No wind, no shear. Leaves an advected cell in place.
    pub fn calm() -> Self {
        Self {
            speed_ms: 0.0,
            direction_deg: 0.0,
            shear_above_ms: 0.0,
            shear_below_ms: 0.0,
        }
    }
}

/// Live aircraft telemetry.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Fetch the current batch of aircraft states, optionally restricted to a
    /// bounding box. Incomplete rows must already be filtered out.
    async fn fetch(&self, bbox: Option<&BoundingBox>) -> Result<Vec<AircraftFix>>;
}

/// Wind lookup for active cells.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// One wind sample per queried point, index-aligned with the input.
    async fn query(&self, points: &[GeoPoint]) -> Result<Vec<WindSample>>;
}
