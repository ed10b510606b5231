//! Open-Meteo wind client.
//!
//! For each queried point the cell altitude is converted to its standard-
//! atmosphere pressure and snapped to the nearest pressure level the API
//! serves. Wind speed and direction come from that level; the speeds at the
//! adjacent levels above and below provide the vertical shear.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::cells::GeoPoint;
use crate::geometry;
use crate::sources::{WeatherSource, WindSample};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Pressure levels served by the forecast API, surface first.
const PRESSURE_LEVELS_HPA: [u32; 19] = [
    1000, 975, 950, 925, 900, 850, 800, 700, 600, 500, 400, 300, 250, 200, 150, 100, 70, 50, 30,
];

#[derive(Debug, serde::Deserialize)]
struct ForecastResponse {
    hourly: HashMap<String, Vec<Option<f64>>>,
}

pub struct OpenMeteoClient {
    client: reqwest::Client,
    base_url: String,
}

/// Index of the served pressure level closest to the given pressure.
fn nearest_level_index(pressure_hpa: f64) -> usize {
    PRESSURE_LEVELS_HPA
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            let da = (f64::from(**a) - pressure_hpa).abs();
            let db = (f64::from(**b) - pressure_hpa).abs();
            da.total_cmp(&db)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Pressure levels adjacent to the given index: (above, below) in altitude
/// terms. Clamped at the ends of the table, where the missing neighbor
/// collapses onto the level itself and contributes zero shear.
fn level_neighbors(index: usize) -> (u32, u32) {
    let above = PRESSURE_LEVELS_HPA[(index + 1).min(PRESSURE_LEVELS_HPA.len() - 1)];
    let below = PRESSURE_LEVELS_HPA[index.saturating_sub(1)];
    (above, below)
}

/// First forecast value of an hourly series.
fn first_value(hourly: &HashMap<String, Vec<Option<f64>>>, name: &str) -> Result<f64> {
    hourly
        .get(name)
        .and_then(|series| series.iter().flatten().next())
        .copied()
        .ok_or_else(|| anyhow!("hourly series {name} missing from forecast response"))
}

impl OpenMeteoClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: FORECAST_URL.to_string(),
        })
    }

    async fn wind_at(&self, point: &GeoPoint) -> Result<WindSample> {
        let pressure_hpa = geometry::pressure_hpa_at(point.altitude_m);
        let index = nearest_level_index(pressure_hpa);
        let level = PRESSURE_LEVELS_HPA[index];
        let (above, below) = level_neighbors(index);

        let mut series: Vec<String> = vec![
            format!("wind_speed_{level}hPa"),
            format!("wind_direction_{level}hPa"),
        ];
        if above != level {
            series.push(format!("wind_speed_{above}hPa"));
        }
        if below != level {
            series.push(format!("wind_speed_{below}hPa"));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", point.latitude.to_string()),
                ("longitude", point.longitude.to_string()),
                ("hourly", series.join(",")),
                ("wind_speed_unit", "ms".to_string()),
                ("forecast_days", "1".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .context("Open-Meteo request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Open-Meteo request failed with status {}",
                response.status()
            ));
        }

        let forecast: ForecastResponse = response
            .json()
            .await
            .context("Failed to parse Open-Meteo response")?;

        let speed_ms = first_value(&forecast.hourly, &format!("wind_speed_{level}hPa"))?;
        let direction_deg = first_value(&forecast.hourly, &format!("wind_direction_{level}hPa"))?;
        let speed_above = if above == level {
            speed_ms
        } else {
            first_value(&forecast.hourly, &format!("wind_speed_{above}hPa"))?
        };
        let speed_below = if below == level {
            speed_ms
        } else {
            first_value(&forecast.hourly, &format!("wind_speed_{below}hPa"))?
        };

        Ok(WindSample {
            speed_ms,
            direction_deg,
            shear_above_ms: speed_above - speed_ms,
            shear_below_ms: speed_ms - speed_below,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn query(&self, points: &[GeoPoint]) -> Result<Vec<WindSample>> {
        let mut samples = Vec::with_capacity(points.len());
        for point in points {
            samples.push(self.wind_at(point).await?);
        }
        Ok(samples)
    }
}
