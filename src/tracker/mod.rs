//! Per-aircraft turbulence lifecycle tracking.
//!
//! Each telemetry tick appends to a sliding window per aircraft. Once a
//! window is full it is classified; three consecutive unstable windows
//! confirm a turbulence, two consecutive stable windows afterwards close it
//! and emit a cell. Aircraft absent from a tick are purged outright, so an
//! in-flight detection for a vanished aircraft is abandoned without an event.

mod aircraft;

use std::collections::{HashMap, HashSet};

use metrics::{counter, gauge};
use tracing::debug;

use crate::cells::{TurbulenceCell, TurbulenceEvent};
use crate::instability::{self, ClassifierError};
use crate::sources::AircraftFix;
use aircraft::{HistorySample, Phase, TrackedAircraft};

/// Consecutive unstable windows needed to confirm a turbulence.
const CONFIRMATION_THRESHOLD: u32 = 3;
/// Consecutive stable windows needed to close a confirmed turbulence.
const CLOSURE_THRESHOLD: u32 = 2;

/// Turns raw telemetry ticks into discrete turbulence cells.
pub struct TurbulenceTracker {
    window_size: usize,
    aircraft: HashMap<String, TrackedAircraft>,
}

impl Default for TurbulenceTracker {
    fn default() -> Self {
        Self::new(instability::WINDOW_SIZE)
    }
}

impl TurbulenceTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            aircraft: HashMap::new(),
        }
    }

    /// Number of aircraft currently held in the sliding-window maps.
    pub fn tracked_aircraft(&self) -> usize {
        self.aircraft.len()
    }

    /// Process one telemetry tick and return the cells closed by it.
    ///
    /// Every returned cell starts at full confidence, centered on the
    /// midpoint of its event's start and end positions and sized by the
    /// great-circle distance between them.
    pub fn update(&mut self, fixes: &[AircraftFix]) -> Result<Vec<TurbulenceCell>, ClassifierError> {
        // Aircraft that stopped reporting are dropped from every map without
        // emitting an event; a later reappearance starts from scratch.
        let current: HashSet<&str> = fixes.iter().map(|f| f.id.as_str()).collect();
        self.aircraft.retain(|id, _| current.contains(id.as_str()));

        for fix in fixes {
            let tracked = self
                .aircraft
                .entry(fix.id.clone())
                .or_insert_with(|| TrackedAircraft::new(self.window_size));
            tracked.push(HistorySample {
                position: fix.position(),
                vertical_rate_ms: fix.vertical_rate_ms,
            });
        }

        let mut closed = Vec::new();
        for (id, tracked) in self.aircraft.iter_mut() {
            if !tracked.window_full() {
                continue;
            }
            let unstable = instability::instability_detected(&tracked.vertical_rates())?;
            if let Some(event) = Self::advance_phase(id, tracked, unstable) {
                closed.push(TurbulenceCell::from_event(&event));
            }
        }

        gauge!("clearair.tracker.aircraft_tracked").set(self.aircraft.len() as f64);
        if !closed.is_empty() {
            counter!("clearair.tracker.events_closed_total").increment(closed.len() as u64);
        }
        Ok(closed)
    }

    /// Advance one aircraft's lifecycle phase given the latest window verdict.
    /// Returns the closed event when the phase transitions out of Confirmed.
    fn advance_phase(
        id: &str,
        tracked: &mut TrackedAircraft,
        unstable: bool,
    ) -> Option<TurbulenceEvent> {
        // The window is full here, so both positions exist.
        let latest = tracked.latest_position()?;
        let second_latest = tracked.second_latest_position()?;

        let phase = std::mem::replace(&mut tracked.phase, Phase::Stable);
        let (next, event) = match phase {
            Phase::Confirmed {
                start,
                stable_count,
                candidate_end,
            } => {
                if unstable {
                    // Instability recurred while stabilizing: closure starts over.
                    (
                        Phase::Confirmed {
                            start,
                            stable_count: 0,
                            candidate_end,
                        },
                        None,
                    )
                } else {
                    let stable_count = stable_count + 1;
                    // The last clearly turbulent position is one sample back
                    // from the first stable window.
                    let candidate_end = if stable_count == 1 {
                        Some(second_latest)
                    } else {
                        candidate_end
                    };
                    if stable_count >= CLOSURE_THRESHOLD {
                        let end = candidate_end.unwrap_or(second_latest);
                        let distance_km = start.horizontal_distance_km(&end);
                        debug!(aircraft = id, distance_km, "turbulence closed");
                        (
                            Phase::Stable,
                            Some(TurbulenceEvent {
                                start,
                                end,
                                distance_km,
                            }),
                        )
                    } else {
                        (
                            Phase::Confirmed {
                                start,
                                stable_count,
                                candidate_end,
                            },
                            None,
                        )
                    }
                }
            }
            Phase::Provisional { count, start } => {
                if unstable {
                    let count = count + 1;
                    if count >= CONFIRMATION_THRESHOLD {
                        debug!(aircraft = id, "turbulence confirmed");
                        (
                            Phase::Confirmed {
                                start,
                                stable_count: 0,
                                candidate_end: None,
                            },
                            None,
                        )
                    } else {
                        (Phase::Provisional { count, start }, None)
                    }
                } else {
                    // Settled before confirmation: forget the provisional record.
                    (Phase::Stable, None)
                }
            }
            Phase::Stable => {
                if unstable {
                    (
                        Phase::Provisional {
                            count: 1,
                            start: latest,
                        },
                        None,
                    )
                } else {
                    (Phase::Stable, None)
                }
            }
        };

        tracked.phase = next;
        event
    }
}
