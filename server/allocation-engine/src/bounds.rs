//! Bounds normalizer: pull proportional hours into [min, max] while keeping their sum.
//!
//! Iterative clamp-and-redistribute, capped at `MAX_ITERATIONS`. When the
//! bounds cannot hold the total, a final rescale restores the sum and values
//! may end up outside the bounds.

use tracing::{debug, warn};

pub const MAX_ITERATIONS: usize = 100;
const EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
  pub hours: Vec<f64>,
  pub iterations: usize,
  /// The final rescale ran, so bounds may have been given up for the sum.
  pub rescaled: bool,
}

/// Clamp `hours` into `[min, max]` and spread what clamping added or removed
/// over the values that can still move, until nothing is left to spread.
pub fn normalize(hours: &[f64], min: f64, max: f64, total: f64) -> Normalized {
  let mut h = hours.to_vec();

  if !(min.is_finite() && max.is_finite() && min <= max) {
    warn!(min, max, "unusable bounds, leaving hours unbounded");
    return Normalized {
      hours: h,
      iterations: 0,
      rescaled: false,
    };
  }

  let mut iterations = 0;
  // Net hours the last redistribution's re-clamp added (negative: removed).
  let mut carry = 0.0;

  while iterations < MAX_ITERATIONS {
    // Net hours the clamp put in: positive means values were raised to `min`.
    let mut excess = carry;
    for v in h.iter_mut() {
      let clamped = v.clamp(min, max);
      excess += clamped - *v;
      *v = clamped;
    }
    carry = 0.0;

    if excess.abs() < EPSILON {
      break;
    }

    // Took too much: only values above `min` can give some back.
    // Took too little: only values below `max` can absorb more.
    let adjustable: Vec<usize> = (0..h.len())
      .filter(|&i| if excess > 0.0 { h[i] > min } else { h[i] < max })
      .collect();
    if adjustable.is_empty() {
      break;
    }

    let share = excess / adjustable.len() as f64;
    for i in adjustable {
      let target = h[i] - share;
      let clamped = target.clamp(min, max);
      carry += clamped - target;
      h[i] = clamped;
    }
    iterations += 1;
  }

  let sum: f64 = h.iter().sum();
  let mut rescaled = false;
  if (sum - total).abs() > EPSILON && sum > 0.0 {
    warn!(
      sum,
      total,
      min,
      max,
      units = h.len(),
      "bounds cannot hold the total, rescaling"
    );
    let factor = total / sum;
    for v in h.iter_mut() {
      *v *= factor;
    }
    rescaled = true;
  }

  debug!(iterations, rescaled, "bounds normalized");
  Normalized {
    hours: h,
    iterations,
    rescaled,
  }
}
