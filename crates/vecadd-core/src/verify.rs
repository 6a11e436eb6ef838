//! Correctness check on the mean of the output buffer.

use serde::Serialize;

/// Mean every element of `C` should have.
pub const EXPECTED_MEAN: f64 = 1.0;

/// Outcome of checking one process's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verification {
    /// Arithmetic mean of `C`.
    pub mean: f64,
    /// `|mean - 1| / 1`.
    pub relative_difference: f64,
    /// Tolerance the difference was compared against.
    pub tolerance: f64,
    /// Whether `relative_difference <= tolerance`.
    pub passed: bool,
}

/// Compute the mean of `c` and compare it with [`EXPECTED_MEAN`].
///
/// The sum runs front to back so the result does not depend on thread count.
/// An empty buffer never passes.
pub fn verify(c: &[f64], tolerance: f64) -> Verification {
    let mean = if c.is_empty() {
        f64::NAN
    } else {
        c.iter().sum::<f64>() / c.len() as f64
    };
    let relative_difference = ((mean - EXPECTED_MEAN) / EXPECTED_MEAN).abs();

    Verification {
        mean,
        relative_difference,
        tolerance,
        // NaN compares false, so a NaN anywhere in C fails.
        passed: relative_difference <= tolerance,
    }
}
