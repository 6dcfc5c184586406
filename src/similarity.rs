//! Sample/control similarity
//!
//! Two traces are compared point by point after cutting both to their
//! common length. There is no time alignment: if two acquisitions were
//! sampled at different rates the comparison silently shifts, which the
//! screening method accepts because all four runs share one instrument
//! method.

use crate::extract::ChromatogramSlice;

/// Decimal places R² is reported with
pub const R2_DECIMALS: i32 = 6;

/// Cut two traces to their common length, keeping the leading points
pub fn truncate_pair(
    a: &ChromatogramSlice,
    b: &ChromatogramSlice,
) -> (ChromatogramSlice, ChromatogramSlice) {
    let len = a.len().min(b.len());
    (a.truncated(len), b.truncated(len))
}

/// Coefficient of determination of `predicted` against `observed`.
///
/// `1 - SS_res / SS_tot` with `SS_tot` taken over `observed`, so the score
/// is not symmetric. Both slices are cut to the shorter length first. The
/// result is rounded to [`R2_DECIMALS`] places; it is NaN when the common
/// length is zero or `observed` is constant.
pub fn r_squared(observed: &[f64], predicted: &[f64]) -> f64 {
    let len = observed.len().min(predicted.len());
    if len == 0 {
        return f64::NAN;
    }
    let observed = &observed[..len];
    let predicted = &predicted[..len];

    // The mean of a flat series carries rounding error, so SS_tot alone
    // cannot detect it
    if observed.iter().all(|&y| y == observed[0]) {
        return f64::NAN;
    }
    let mean = observed.iter().sum::<f64>() / len as f64;
    let ss_tot: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    let ss_res: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    round_to(1.0 - ss_res / ss_tot, R2_DECIMALS)
}

/// R² of the control trace against the sample trace (sample is observed)
pub fn score(sample: &ChromatogramSlice, control: &ChromatogramSlice) -> f64 {
    r_squared(sample.intensities(), control.intensities())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}
