//! OpenSky Network telemetry client.
//!
//! Fetches live state vectors from `GET /api/states/all`, optionally
//! authenticated through the OpenSky OAuth2 token endpoint. Rows missing
//! position or vertical rate are dropped here so the tracker only ever sees
//! complete fixes.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::OpenSkyConfig;
use crate::sources::{AircraftFix, BoundingBox, TelemetrySource};

const TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
const STATES_URL: &str = "https://opensky-network.org/api/states/all";

// State vector indices per the OpenSky REST API
const IDX_ICAO24: usize = 0;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VERTICAL_RATE: usize = 11;
const IDX_GEO_ALTITUDE: usize = 13;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    states: Option<Vec<Vec<Value>>>,
}

pub struct OpenSkyClient {
    client: reqwest::Client,
    token_url: String,
    states_url: String,
    credentials: Option<(String, String)>,
}

impl OpenSkyClient {
    pub fn new(config: &OpenSkyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        let credentials = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => {
                debug!("no OpenSky credentials configured, using anonymous access");
                None
            }
        };

        Ok(Self {
            client,
            token_url: TOKEN_URL.to_string(),
            states_url: STATES_URL.to_string(),
            credentials,
        })
    }

    /// Obtain a short-lived bearer token via the client-credentials grant.
    async fn fetch_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .context("OpenSky token request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenSky token request failed with status {}",
                response.status()
            ));
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse OpenSky token response")?;
        Ok(token.access_token)
    }
}

/// Normalize one raw state vector, or reject it when a required field is
/// missing. Barometric altitude is preferred; the geometric altitude stands
/// in when it is absent or zero. Altitudes and vertical rates arrive in
/// meters and m/s.
fn state_to_fix(state: &[Value]) -> Option<AircraftFix> {
    let id = state.get(IDX_ICAO24)?.as_str()?.trim().to_string();
    if id.is_empty() {
        return None;
    }
    let longitude = state.get(IDX_LONGITUDE)?.as_f64()?;
    let latitude = state.get(IDX_LATITUDE)?.as_f64()?;
    let altitude_m = match state.get(IDX_BARO_ALTITUDE).and_then(Value::as_f64) {
        Some(alt) if alt != 0.0 => alt,
        _ => state.get(IDX_GEO_ALTITUDE)?.as_f64()?,
    };
    let vertical_rate_ms = state.get(IDX_VERTICAL_RATE)?.as_f64()?;

    Some(AircraftFix {
        id,
        latitude,
        longitude,
        altitude_m,
        vertical_rate_ms,
    })
}

#[async_trait]
impl TelemetrySource for OpenSkyClient {
    async fn fetch(&self, bbox: Option<&BoundingBox>) -> Result<Vec<AircraftFix>> {
        let mut request = self.client.get(&self.states_url);

        if let Some(bbox) = bbox {
            request = request.query(&[
                ("lamin", bbox.min_latitude),
                ("lamax", bbox.max_latitude),
                ("lomin", bbox.min_longitude),
                ("lomax", bbox.max_longitude),
            ]);
        }

        if let Some((id, secret)) = &self.credentials {
            let token = self.fetch_token(id, secret).await?;
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("OpenSky request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenSky request failed with status {}",
                response.status()
            ));
        }

        let body: StatesResponse = response
            .json()
            .await
            .context("Failed to parse OpenSky state vectors")?;

        let states = body.states.unwrap_or_default();
        let total = states.len();
        let fixes: Vec<AircraftFix> = states.iter().map(Vec::as_slice).filter_map(state_to_fix).collect();
        if fixes.len() < total {
            debug!(
                dropped = total - fixes.len(),
                kept = fixes.len(),
                "dropped incomplete state vectors"
            );
        }
        Ok(fixes)
    }
}
