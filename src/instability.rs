//! Vertical-rate instability classifier.
//!
//! Looks at a short sliding window of vertical-rate samples and decides
//! whether the aircraft is oscillating the way it does inside turbulence.
//! Pure and deterministic; the lifecycle tracker owns all state.

use thiserror::Error;

/// Number of consecutive vertical-rate samples the classifier needs.
pub const WINDOW_SIZE: usize = 5;

/// A single step of at least this magnitude (m/s) is turbulent on its own.
const LARGE_JUMP_MS: f64 = 10.0;
/// Cumulative movement required when the rate flips direction twice or more.
const MULTI_FLIP_MOVEMENT_MS: f64 = 12.0;
/// Cumulative movement required when the rate flips direction exactly once.
const SINGLE_FLIP_MOVEMENT_MS: f64 = 15.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("vertical-rate window holds {got} samples, need at least {need}")]
    WindowTooShort { got: usize, need: usize },
}

/// Classify a window of consecutive vertical-rate samples (m/s, oldest first).
///
/// Returns `true` when the window shows turbulent behavior: an instant jump of
/// at least 10 m/s between steps, two or more direction reversals with more
/// than 12 m/s of cumulative movement, or a single reversal with more than
/// 15 m/s. Zero differences are ignored when counting reversals.
pub fn instability_detected(rates: &[f64]) -> Result<bool, ClassifierError> {
    if rates.len() < WINDOW_SIZE {
        return Err(ClassifierError::WindowTooShort {
            got: rates.len(),
            need: WINDOW_SIZE,
        });
    }

    let diffs: Vec<f64> = rates.windows(2).map(|pair| pair[1] - pair[0]).collect();

    let mut sign_changes = 0u32;
    let mut last_sign = 0i8;
    for &diff in &diffs {
        if diff == 0.0 {
            continue;
        }
        let sign: i8 = if diff > 0.0 { 1 } else { -1 };
        if last_sign == 0 {
            last_sign = sign;
        } else if sign != last_sign {
            sign_changes += 1;
            last_sign = sign;
        }
    }

    let total_movement: f64 = diffs.iter().map(|d| d.abs()).sum();

    let large_jump = diffs.iter().any(|d| d.abs() >= LARGE_JUMP_MS);
    let multi_flip = sign_changes >= 2 && total_movement > MULTI_FLIP_MOVEMENT_MS;
    let single_flip = sign_changes == 1 && total_movement > SINGLE_FLIP_MOVEMENT_MS;

    Ok(large_jump || multi_flip || single_flip)
}
