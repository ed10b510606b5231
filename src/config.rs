//! Application configuration: collaborator credentials, the watched area, and
//! loop/advection tuning.
//!
//! Loaded from a TOML file; OpenSky credentials can be overridden from the
//! environment so they never need to live in the file at all.

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::instability;
use crate::sources::BoundingBox;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub opensky: OpenSkyConfig,
    /// Area watched for telemetry; absent means worldwide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub advection: AdvectionConfig,
}

/// OpenSky OAuth2 client credentials. Both optional: without them the client
/// falls back to anonymous (rate-limited) access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenSkyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl OpenSkyConfig {
    /// Replace credentials with the given overrides where present.
    pub fn apply_overrides(&mut self, client_id: Option<String>, client_secret: Option<String>) {
        if client_id.is_some() {
            self.client_id = client_id;
        }
        if client_secret.is_some() {
            self.client_secret = client_secret;
        }
    }

    /// Pull `OPENSKY_CLIENT_ID` / `OPENSKY_CLIENT_SECRET` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("OPENSKY_CLIENT_ID").ok(),
            std::env::var("OPENSKY_CLIENT_SECRET").ok(),
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Sliding-window size for the instability classifier.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

/// Loop timing. Detection and advection refresh run on independent clocks;
/// the defaults reproduce one detection plus two advection refreshes per 6 s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    #[serde(default = "default_detection_interval_secs")]
    pub detection_interval_secs: u64,
    #[serde(default = "default_advection_interval_secs")]
    pub advection_interval_secs: u64,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            detection_interval_secs: default_detection_interval_secs(),
            advection_interval_secs: default_advection_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvectionConfig {
    /// Simulated seconds of drift per advection step.
    #[serde(default = "default_delta_t_secs")]
    pub delta_t_secs: f64,
    /// Multiplicative confidence decay per step.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,
    /// Cells at or below this confidence are dropped.
    #[serde(default = "default_drop_threshold")]
    pub drop_threshold: f64,
}

impl Default for AdvectionConfig {
    fn default() -> Self {
        Self {
            delta_t_secs: default_delta_t_secs(),
            decay_factor: default_decay_factor(),
            drop_threshold: default_drop_threshold(),
        }
    }
}

fn default_window_size() -> usize {
    instability::WINDOW_SIZE
}

fn default_detection_interval_secs() -> u64 {
    6
}

fn default_advection_interval_secs() -> u64 {
    3
}

fn default_delta_t_secs() -> f64 {
    60.0
}

fn default_decay_factor() -> f64 {
    0.95
}

fn default_drop_threshold() -> f64 {
    0.2
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    fn validate(&self) -> Result<()> {
        ensure!(
            self.detection.window_size >= instability::WINDOW_SIZE,
            "detection.window_size is {}, the classifier needs at least {}",
            self.detection.window_size,
            instability::WINDOW_SIZE
        );
        Ok(())
    }

    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `CLEARAIR_CONFIG` env var
/// 2. `./clearair.toml`
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLEARAIR_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("./clearair.toml")
}
