//! Per-aircraft tracking state: sliding telemetry window and lifecycle phase.

use std::collections::VecDeque;

use crate::cells::GeoPoint;

/// One retained telemetry sample for an aircraft.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HistorySample {
    pub position: GeoPoint,
    pub vertical_rate_ms: f64,
}

/// Lifecycle phase of one aircraft.
///
/// A single tagged value per aircraft makes "provisional and confirmed at the
/// same time" unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Phase {
    Stable,
    /// Instability seen on fewer than the confirmation threshold of
    /// consecutive windows. `start` is the position of the first unstable
    /// window.
    Provisional { count: u32, start: GeoPoint },
    /// Confirmed turbulence, awaiting enough consecutive stable windows to
    /// close. `candidate_end` is recorded on the first stable window.
    Confirmed {
        start: GeoPoint,
        stable_count: u32,
        candidate_end: Option<GeoPoint>,
    },
}

/// Sliding window and phase for a single tracked aircraft.
#[derive(Debug)]
pub(crate) struct TrackedAircraft {
    history: VecDeque<HistorySample>,
    pub phase: Phase,
    window_size: usize,
}

impl TrackedAircraft {
    pub fn new(window_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window_size),
            phase: Phase::Stable,
            window_size,
        }
    }

    /// Append a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, sample: HistorySample) {
        if self.history.len() >= self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(sample);
    }

    pub fn window_full(&self) -> bool {
        self.history.len() >= self.window_size
    }

    /// Vertical rates oldest first, sized for the classifier once the window
    /// is full.
    pub fn vertical_rates(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.vertical_rate_ms).collect()
    }

    /// Position at the most recent sample.
    pub fn latest_position(&self) -> Option<GeoPoint> {
        self.history.back().map(|s| s.position)
    }

    /// Position one sample before the most recent.
    pub fn second_latest_position(&self) -> Option<GeoPoint> {
        let len = self.history.len();
        if len < 2 {
            return None;
        }
        self.history.get(len - 2).map(|s| s.position)
    }
}
