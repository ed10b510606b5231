//! Clear-air turbulence detection and drift forecasting.
//!
//! Ingests live ADS-B state vectors, detects turbulence from oscillatory
//! vertical-rate patterns per aircraft, and forecasts how each confirmed cell
//! drifts and fades under the observed wind. Consumers read a continuously
//! refreshed, thread-safe snapshot of the active cells.

pub mod advection;
pub mod cells;
pub mod config;
pub mod geometry;
pub mod instability;
pub mod open_meteo;
pub mod opensky;
pub mod orchestrator;
pub mod sources;
pub mod tracker;

pub use advection::{AdvectionEngine, AdvectionError};
pub use cells::{GeoPoint, TurbulenceCell, TurbulenceEvent};
pub use config::AppConfig;
pub use instability::ClassifierError;
pub use orchestrator::{Orchestrator, SnapshotHandle};
pub use sources::{AircraftFix, BoundingBox, TelemetrySource, WeatherSource, WindSample};
pub use tracker::TurbulenceTracker;
