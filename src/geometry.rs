//! Geometry and standard-atmosphere helpers shared by the tracker and the
//! weather client.

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// ISA sea-level pressure in hPa.
const ISA_SEA_LEVEL_HPA: f64 = 1013.25;
/// ISA temperature lapse rate in K/m.
const ISA_LAPSE_RATE_K_PER_M: f64 = 0.0065;
/// ISA sea-level temperature in K.
const ISA_SEA_LEVEL_TEMP_K: f64 = 288.15;
/// Barometric formula exponent g·M/(R·L).
const ISA_EXPONENT: f64 = 5.255877;

pub const FEET_TO_METERS: f64 = 0.3048;

/// Great-circle distance between two lat/lon points in kilometers, using the
/// haversine formula on a spherical Earth. Altitude is ignored.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Standard-atmosphere pressure in hPa at the given altitude in meters.
///
/// Valid within the troposphere, which covers every altitude an airliner
/// reports. Altitudes reported in feet must go through [`feet_to_meters`]
/// before calling this.
pub fn pressure_hpa_at(altitude_m: f64) -> f64 {
    ISA_SEA_LEVEL_HPA
        * (1.0 - ISA_LAPSE_RATE_K_PER_M * altitude_m / ISA_SEA_LEVEL_TEMP_K).powf(ISA_EXPONENT)
}

/// Convert an altitude reported in feet to meters.
pub fn feet_to_meters(feet: f64) -> f64 {
    feet * FEET_TO_METERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_same_point() {
        assert_eq!(haversine_km(45.5, -73.6, 45.5, -73.6), 0.0);
    }

    #[test]
    fn haversine_one_degree_of_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn haversine_is_symmetric() {
        let d1 = haversine_km(40.0, -74.0, 41.0, -73.0);
        let d2 = haversine_km(41.0, -73.0, 40.0, -74.0);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn pressure_at_sea_level() {
        assert!((pressure_hpa_at(0.0) - 1013.25).abs() < 1e-9);
    }

    #[test]
    fn pressure_at_tropopause() {
        // ISA tropopause: 11 km, ~226.3 hPa
        let p = pressure_hpa_at(11_000.0);
        assert!((p - 226.3).abs() < 0.5, "got {p}");
    }

    #[test]
    fn pressure_decreases_with_altitude() {
        assert!(pressure_hpa_at(5_000.0) > pressure_hpa_at(10_000.0));
    }

    #[test]
    fn feet_conversion() {
        assert!((feet_to_meters(35_000.0) - 10_668.0).abs() < 1e-9);
    }
}
