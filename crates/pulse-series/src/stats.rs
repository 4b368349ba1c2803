//! Descriptive statistics shared by the series algorithms and detectors

/// Arithmetic mean, `0.0` for an empty slice
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / len(values)
}

/// Population variance, `0.0` for fewer than two values
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mu = mean(values);
    values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / len(values)
}

/// Population standard deviation
#[inline]
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Percentile with linear interpolation between closest ranks
///
/// `p` is in `0..=100` and is clamped. Returns `None` for an empty slice.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (len(&sorted) - 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    let frac = rank - rank.floor();
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Ordinary least squares fit of `values[i]` against `i`
///
/// Returns `(slope, intercept)`. A single value yields a flat line through
/// it; an empty slice yields `(0.0, 0.0)`.
#[must_use]
pub fn linear_regression(values: &[f64]) -> (f64, f64) {
    match values.len() {
        0 => (0.0, 0.0),
        1 => (0.0, values[0]),
        _ => {
            let n = len(values);
            let x_mean = (n - 1.0) / 2.0;
            let y_mean = mean(values);
            let (mut num, mut den) = (0.0, 0.0);
            for (i, y) in values.iter().enumerate() {
                let dx = index(i) - x_mean;
                num += dx * (y - y_mean);
                den += dx * dx;
            }
            let slope = if den == 0.0 { 0.0 } else { num / den };
            (slope, y_mean - slope * x_mean)
        }
    }
}

#[allow(clippy::cast_precision_loss)]
#[inline]
fn len(values: &[f64]) -> f64 {
    values.len() as f64
}

#[allow(clippy::cast_precision_loss)]
#[inline]
pub(crate) fn index(i: usize) -> f64 {
    i as f64
}
