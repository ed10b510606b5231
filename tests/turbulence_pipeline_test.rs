//! End-to-end test of the telemetry → tracker → wind → advection → snapshot
//! pipeline, driving the orchestrator cycle by cycle with scripted sources.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use clearair::cells::GeoPoint;
use clearair::config::AppConfig;
use clearair::geometry::haversine_km;
use clearair::orchestrator::Orchestrator;
use clearair::sources::{
    AircraftFix, BoundingBox, TelemetrySource, WeatherSource, WindSample,
};

/// Telemetry source that replays pre-built batches, one per fetch.
struct ScriptedTelemetry {
    batches: Mutex<VecDeque<Result<Vec<AircraftFix>>>>,
}

impl ScriptedTelemetry {
    fn new(batches: Vec<Result<Vec<AircraftFix>>>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().collect()),
        }
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn fetch(&self, _bbox: Option<&BoundingBox>) -> Result<Vec<AircraftFix>> {
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("telemetry script exhausted")))
    }
}

/// Weather source that answers every point with the same wind.
struct ConstantWeather {
    wind: WindSample,
}

#[async_trait]
impl WeatherSource for ConstantWeather {
    async fn query(&self, points: &[GeoPoint]) -> Result<Vec<WindSample>> {
        Ok(vec![self.wind; points.len()])
    }
}

/// Weather source that fails exactly one of its calls.
struct FlakyWeather {
    wind: WindSample,
    fail_on_call: u32,
    calls: Mutex<u32>,
}

#[async_trait]
impl WeatherSource for FlakyWeather {
    async fn query(&self, points: &[GeoPoint]) -> Result<Vec<WindSample>> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        if *calls == self.fail_on_call {
            return Err(anyhow!("gateway timeout"));
        }
        Ok(vec![self.wind; points.len()])
    }
}

fn fix(id: &str, lat: f64, vr: f64) -> AircraftFix {
    AircraftFix {
        id: id.to_string(),
        latitude: lat,
        longitude: -74.0,
        altitude_m: 10_000.0,
        vertical_rate_ms: vr,
    }
}

/// Vertical rates whose sliding windows are unstable from tick 6 through
/// tick 11 and stable afterwards: confirmed at tick 8, closed at tick 13.
const ONE_EVENT_RATES: [f64; 13] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 15.0, 0.0, 15.0, 15.0, 15.0, 15.0, 15.0, 15.0,
];

fn one_event_batches() -> Vec<Result<Vec<AircraftFix>>> {
    ONE_EVENT_RATES
        .iter()
        .enumerate()
        .map(|(tick, &vr)| Ok(vec![fix("4b1814", 40.0 + 0.01 * (tick + 1) as f64, vr)]))
        .collect()
}

#[tokio::test]
async fn one_aircraft_produces_one_full_confidence_cell() {
    let telemetry = ScriptedTelemetry::new(one_event_batches());
    let weather = ConstantWeather {
        wind: WindSample::calm(),
    };
    let mut orchestrator = Orchestrator::new(telemetry, weather, &AppConfig::default());
    let snapshot = orchestrator.snapshot();

    // Nothing published while the event is still open
    for _ in 0..12 {
        orchestrator.detection_cycle().await.unwrap();
    }
    assert!(snapshot.read().is_empty());

    // Tick 13 closes the event and publishes the cell
    orchestrator.detection_cycle().await.unwrap();
    let cells = snapshot.read();
    assert_eq!(cells.len(), 1);

    let cell = &cells[0];
    assert_eq!(cell.confidence, 100.0);
    // Start was recorded at tick 6, candidate end at tick 11
    let expected_diameter = haversine_km(40.06, -74.0, 40.11, -74.0);
    assert!((cell.diameter_km - expected_diameter).abs() < 1e-9);
    assert!((cell.latitude - 40.085).abs() < 1e-9);
    assert!((cell.longitude - -74.0).abs() < 1e-9);
}

#[tokio::test]
async fn active_cells_keep_drifting_without_new_detections() {
    let mut batches = one_event_batches();
    // One more tick with the aircraft steady: no new cells, existing ones advect
    batches.push(Ok(vec![fix("4b1814", 40.14, 15.0)]));

    let telemetry = ScriptedTelemetry::new(batches);
    let weather = ConstantWeather {
        wind: WindSample {
            speed_ms: 10.0,
            direction_deg: 0.0,
            shear_above_ms: 2.0,
            shear_below_ms: 1.0,
        },
    };
    let mut orchestrator = Orchestrator::new(telemetry, weather, &AppConfig::default());
    let snapshot = orchestrator.snapshot();

    for _ in 0..13 {
        orchestrator.detection_cycle().await.unwrap();
    }
    let fresh = snapshot.read()[0].clone();
    assert_eq!(fresh.confidence, 100.0);

    // Detection cycle without new cells: wind pushes the cell east, shear
    // lifts it, confidence decays
    orchestrator.detection_cycle().await.unwrap();
    let drifted = snapshot.read()[0].clone();
    assert!((drifted.longitude - (fresh.longitude + 600.0 / 85_000.0)).abs() < 1e-9);
    assert!((drifted.latitude - fresh.latitude).abs() < 1e-9);
    assert!((drifted.altitude_m - (fresh.altitude_m + 0.1)).abs() < 1e-9);
    assert!((drifted.diameter_km - (fresh.diameter_km + 0.03)).abs() < 1e-9);
    assert!((drifted.confidence - 95.0).abs() < 1e-9);

    // An advection refresh step between detections keeps the view moving
    orchestrator.refresh_cycle().await.unwrap();
    let refreshed = snapshot.read()[0].clone();
    assert!((refreshed.confidence - 90.25).abs() < 1e-9);
    assert!(refreshed.longitude > drifted.longitude);
}

#[tokio::test]
async fn a_failing_source_skips_the_cycle_without_losing_state() {
    let mut batches: Vec<Result<Vec<AircraftFix>>> = one_event_batches();
    // Outage right after the cell is published, then service recovers with
    // the aircraft flying steady
    batches.push(Err(anyhow!("connection reset by peer")));
    batches.push(Ok(vec![fix("4b1814", 40.15, 15.0)]));

    let telemetry = ScriptedTelemetry::new(batches);
    let weather = ConstantWeather {
        wind: WindSample::calm(),
    };
    let mut orchestrator = Orchestrator::new(telemetry, weather, &AppConfig::default());
    let snapshot = orchestrator.snapshot();

    for _ in 0..13 {
        orchestrator.detection_cycle().await.unwrap();
    }
    assert_eq!(snapshot.read().len(), 1);

    // The outage surfaces as an error the loop logs and skips; the published
    // snapshot is untouched
    assert!(orchestrator.detection_cycle().await.is_err());
    let cells = snapshot.read();
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].confidence, 100.0);

    // Next cycle proceeds normally: the surviving cell decays one step
    orchestrator.detection_cycle().await.unwrap();
    assert!((snapshot.read()[0].confidence - 95.0).abs() < 1e-9);
}

#[tokio::test]
async fn a_cell_closed_during_a_weather_outage_is_still_published() {
    // "early" closes its event at tick 13; "late" flies the same pattern
    // three ticks behind and closes at tick 16, the tick the wind fetch for
    // the already-active cell fails.
    let mut early_rates: Vec<f64> = ONE_EVENT_RATES.to_vec();
    early_rates.extend([15.0; 4]);
    let mut late_rates = vec![0.0; 3];
    late_rates.extend(ONE_EVENT_RATES);
    late_rates.push(15.0);

    let batches: Vec<Result<Vec<AircraftFix>>> = early_rates
        .iter()
        .zip(&late_rates)
        .enumerate()
        .map(|(tick, (&early_vr, &late_vr))| {
            let lat = 40.0 + 0.01 * (tick + 1) as f64;
            Ok(vec![fix("early", lat, early_vr), fix("late", lat, late_vr)])
        })
        .collect();

    let telemetry = ScriptedTelemetry::new(batches);
    // Wind is looked up on ticks 14 through 17; the third lookup is tick 16
    let weather = FlakyWeather {
        wind: WindSample::calm(),
        fail_on_call: 3,
        calls: Mutex::new(0),
    };
    let mut orchestrator = Orchestrator::new(telemetry, weather, &AppConfig::default());
    let snapshot = orchestrator.snapshot();

    for _ in 0..15 {
        orchestrator.detection_cycle().await.unwrap();
    }
    assert_eq!(snapshot.read().len(), 1);

    // The outage surfaces as an error, but the cell closed this tick is
    // appended and published all the same
    assert!(orchestrator.detection_cycle().await.is_err());
    let cells = snapshot.read();
    assert_eq!(cells.len(), 2);
    assert!(cells.iter().any(|c| c.confidence == 100.0));

    // After the source recovers both cells survive and advect together
    orchestrator.detection_cycle().await.unwrap();
    let cells = snapshot.read();
    assert_eq!(cells.len(), 2);
    assert!(cells.iter().all(|c| c.confidence < 100.0));
}

#[tokio::test]
async fn refresh_with_no_active_cells_is_a_no_op() {
    let telemetry = ScriptedTelemetry::new(vec![]);
    let weather = ConstantWeather {
        wind: WindSample::calm(),
    };
    let mut orchestrator = Orchestrator::new(telemetry, weather, &AppConfig::default());
    let snapshot = orchestrator.snapshot();

    orchestrator.refresh_cycle().await.unwrap();
    assert!(snapshot.read().is_empty());
}
