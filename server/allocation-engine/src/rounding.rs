//! Sum-preserving rounding to a fixed number of decimals.

use tracing::warn;

use crate::config::MAX_ROUNDING_PRECISION;

/// Round half away from zero to `precision` decimals.
pub fn round_to(value: f64, precision: u32) -> f64 {
  let factor = 10f64.powi(precision as i32);
  (value * factor).round() / factor
}

/// `total / count` for every slot, rounded to `precision`.
pub fn equal_split(total: f64, count: usize, precision: u32) -> Vec<f64> {
  if count == 0 {
    return Vec::new();
  }
  vec![round_to(total / count as f64, precision); count]
}

/// Round every value to `precision` decimals so that the results add up to `total`.
///
/// After plain rounding, the leftover is settled one step (`10^-precision`)
/// at a time: a shortfall goes to the smallest values, a surplus comes off the
/// largest. Ties go to the earlier index. Falls back to an equal split if the
/// sum still misses `total` by more than 0.01.
pub fn round_preserving_sum(values: &[f64], total: f64, precision: u32) -> Vec<f64> {
  if values.is_empty() {
    return Vec::new();
  }
  let precision = precision.min(MAX_ROUNDING_PRECISION as u32);

  if values.iter().any(|v| !v.is_finite()) {
    warn!(?values, "non-finite hours before rounding, using equal split");
    return equal_split(total, values.len(), precision);
  }

  let mut rounded: Vec<f64> = values.iter().map(|v| round_to(*v, precision)).collect();
  let diff = total - rounded.iter().sum::<f64>();
  if diff.abs() < 1e-5 {
    return rounded;
  }

  let step = 10f64.powi(-(precision as i32));
  let adjustments = (diff.abs() / step).round() as usize;

  // Stable sorts keep equal values in input order.
  let mut order: Vec<usize> = (0..rounded.len()).collect();
  if diff > 0.0 {
    order.sort_by(|&a, &b| rounded[a].total_cmp(&rounded[b]));
    for &i in order.iter().take(adjustments) {
      rounded[i] = round_to(rounded[i] + step, precision);
    }
  } else {
    order.sort_by(|&a, &b| rounded[b].total_cmp(&rounded[a]));
    for &i in order.iter().take(adjustments) {
      rounded[i] = round_to((rounded[i] - step).max(0.0), precision);
    }
  }

  let sum: f64 = rounded.iter().sum();
  if (sum - total).abs() > 0.01 {
    warn!(sum, total, precision, "rounding missed the total, using equal split");
    return equal_split(total, values.len(), precision);
  }
  rounded
}
