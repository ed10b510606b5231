//! The refresh loop: telemetry → lifecycle tracking → wind → advection →
//! published snapshot.
//!
//! One background task owns the authoritative active-cell set and runs the
//! whole pipeline sequentially. Detection and advection refresh run on
//! independent clocks so the published view keeps drifting between detection
//! cycles. A collaborator failure skips the current cycle and the loop
//! resumes at the next tick; the worker never dies.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use metrics::{counter, gauge};
use tracing::{debug, info, warn};

use crate::advection::AdvectionEngine;
use crate::cells::{GeoPoint, TurbulenceCell};
use crate::config::AppConfig;
use crate::sources::{BoundingBox, TelemetrySource, WeatherSource};
use crate::tracker::TurbulenceTracker;

/// Shared handle to the most recently published cell set.
///
/// The worker write-locks only long enough to install a fresh copy; readers
/// lock, clone the current set out, and release. Nobody ever observes a
/// partially written snapshot.
#[derive(Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Vec<TurbulenceCell>>>,
}

impl SnapshotHandle {
    /// Copy out the current snapshot.
    pub fn read(&self) -> Vec<TurbulenceCell> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn publish(&self, cells: &[TurbulenceCell]) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = cells.to_vec();
    }
}

pub struct Orchestrator<T, W> {
    telemetry: T,
    weather: W,
    tracker: TurbulenceTracker,
    engine: AdvectionEngine,
    bbox: Option<BoundingBox>,
    detection_interval: Duration,
    advection_interval: Duration,
    active: Vec<TurbulenceCell>,
    snapshot: SnapshotHandle,
}

impl<T: TelemetrySource, W: WeatherSource> Orchestrator<T, W> {
    pub fn new(telemetry: T, weather: W, config: &AppConfig) -> Self {
        Self {
            telemetry,
            weather,
            tracker: TurbulenceTracker::new(config.detection.window_size),
            engine: AdvectionEngine {
                delta_t_secs: config.advection.delta_t_secs,
                decay_factor: config.advection.decay_factor,
                drop_threshold: config.advection.drop_threshold,
            },
            bbox: config.bbox,
            detection_interval: Duration::from_secs(config.cadence.detection_interval_secs),
            advection_interval: Duration::from_secs(config.cadence.advection_interval_secs),
            active: Vec::new(),
            snapshot: SnapshotHandle::default(),
        }
    }

    /// Handle for consumers; cheap to clone and safe to read from any thread.
    pub fn snapshot(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    /// Run the loop forever. Detection fires once per detection interval,
    /// with advection refresh steps in between at their own cadence.
    pub async fn run(mut self) {
        info!(
            detection_interval_secs = self.detection_interval.as_secs(),
            advection_interval_secs = self.advection_interval.as_secs(),
            "starting turbulence refresh loop"
        );

        let refreshes_per_cycle = (self.detection_interval.as_secs_f64()
            / self.advection_interval.as_secs_f64().max(1.0))
        .round()
        .max(1.0) as u32;

        loop {
            if let Err(e) = self.detection_cycle().await {
                warn!("detection cycle skipped: {e:#}");
                counter!("clearair.orchestrator.cycles_skipped_total").increment(1);
            }
            for _ in 0..refreshes_per_cycle {
                tokio::time::sleep(self.advection_interval).await;
                if let Err(e) = self.refresh_cycle().await {
                    warn!("advection refresh skipped: {e:#}");
                    counter!("clearair.orchestrator.cycles_skipped_total").increment(1);
                }
            }
        }
    }

    /// One detection cycle: fetch telemetry, close turbulence events, fold
    /// the new cells into the (advected) active set, publish.
    ///
    /// Cells closed this tick are appended and published even when the wind
    /// fetch for the pre-existing set fails; the error still surfaces to the
    /// caller afterwards.
    pub async fn detection_cycle(&mut self) -> Result<()> {
        let fixes = self
            .telemetry
            .fetch(self.bbox.as_ref())
            .await
            .context("telemetry fetch failed")?;
        debug!(aircraft = fixes.len(), "telemetry batch received");

        let new_cells = self.tracker.update(&fixes)?;

        let mut advected = Ok(());
        if !new_cells.is_empty() {
            info!(new_cells = new_cells.len(), "turbulence cells confirmed");
            if !self.active.is_empty() {
                // The tracker has already consumed these closures; bailing
                // out here would discard them with no way to re-emit.
                advected = self.advect_active().await;
            }
            self.active.extend(new_cells);
            self.publish();
        } else if !self.active.is_empty() {
            advected = self.advect_active().await;
            if advected.is_ok() {
                self.publish();
            }
        }

        gauge!("clearair.orchestrator.active_cells").set(self.active.len() as f64);
        advected
    }

    /// One advection refresh: drift the active set one step and publish, so
    /// the displayed cells keep moving between detection cycles.
    pub async fn refresh_cycle(&mut self) -> Result<()> {
        if self.active.is_empty() {
            return Ok(());
        }
        self.advect_active().await?;
        self.publish();
        gauge!("clearair.orchestrator.active_cells").set(self.active.len() as f64);
        Ok(())
    }

    /// Fetch wind for every active cell and advance the set one step.
    async fn advect_active(&mut self) -> Result<()> {
        let points: Vec<GeoPoint> = self.active.iter().map(TurbulenceCell::position).collect();
        let winds = self
            .weather
            .query(&points)
            .await
            .context("weather query failed")?;
        self.active = self.engine.step(&self.active, &winds)?;
        Ok(())
    }

    fn publish(&self) {
        self.snapshot.publish(&self.active);
    }
}
