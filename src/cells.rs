//! Turbulence data model shared by the lifecycle tracker, the advection
//! engine, and the published snapshot.

use serde::{Deserialize, Serialize};

use crate::geometry::haversine_km;

/// Confidence assigned to a freshly confirmed cell.
pub const INITIAL_CONFIDENCE: f64 = 100.0;

/// A geographic position with altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m,
        }
    }

    /// Horizontal great-circle distance to another point, in kilometers.
    /// Altitude does not contribute.
    pub fn horizontal_distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Component-wise midpoint between two positions.
    pub fn midpoint(&self, other: &GeoPoint) -> GeoPoint {
        GeoPoint {
            latitude: (self.latitude + other.latitude) / 2.0,
            longitude: (self.longitude + other.longitude) / 2.0,
            altitude_m: (self.altitude_m + other.altitude_m) / 2.0,
        }
    }
}

/// A closed turbulence segment emitted by the lifecycle tracker: where the
/// oscillation started, where the aircraft settled, and the horizontal
/// distance between the two.
#[derive(Debug, Clone, PartialEq)]
pub struct TurbulenceEvent {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub distance_km: f64,
}

/// A drifting turbulence estimate published to consumers.
///
/// Confidence lives in `0..=100` and strictly decreases after detection; the
/// advection engine prunes cells once it falls at or below its drop
/// threshold, so no published cell ever carries zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceCell {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub diameter_km: f64,
    pub confidence: f64,
}

impl TurbulenceCell {
    /// Build a cell from a closed event: centered on the segment midpoint,
    /// sized by the segment length, at full confidence.
    pub fn from_event(event: &TurbulenceEvent) -> Self {
        let center = event.start.midpoint(&event.end);
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            altitude_m: center.altitude_m,
            diameter_km: event.distance_km,
            confidence: INITIAL_CONFIDENCE,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude, self.altitude_m)
    }
}
