//! Allocation orchestrator: weights -> proportional hours -> bounds -> rounding.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::bounds;
use crate::config::AllocationPolicy;
use crate::error::AllocationError;
use crate::rounding;
use crate::types::{Allocation, Hours, Weight, WorkUnit};
use crate::weight::WeightStrategy;

/// Split `total_budget` hours across `units` under `policy`.
///
/// Invalid numbers never fail the call: an invalid budget yields an empty
/// allocation, bad weights become 1.0 and bad policy fields take defaults.
/// Duplicate unit ids are rejected.
pub fn allocate(
  units: &[WorkUnit],
  total_budget: f64,
  policy: &AllocationPolicy,
) -> Result<Allocation, AllocationError> {
  ensure_unique_ids(units)?;
  Ok(allocate_distinct(units, total_budget, policy))
}

/// `allocate` for a unit set whose ids are already known to be unique.
pub(crate) fn allocate_distinct(
  units: &[WorkUnit],
  total_budget: f64,
  policy: &AllocationPolicy,
) -> Allocation {
  let mut allocation = Allocation::new();
  if units.is_empty() {
    return allocation;
  }

  if !(total_budget.is_finite() && total_budget > 0.0) {
    warn!(total_budget, "invalid total budget, nothing allocated");
    return allocation;
  }

  let policy = policy.sanitized();
  let precision = policy.precision();

  let weights: Vec<Weight> = units
    .iter()
    .map(|unit| {
      let raw = policy.strategy.weight(unit, units);
      Weight::new(raw).unwrap_or_else(|| {
        warn!(
          unit_id = %unit.id,
          raw,
          strategy = policy.strategy.as_str(),
          "invalid weight, using 1.0"
        );
        Weight::NEUTRAL
      })
    })
    .collect();
  let total_weight: f64 = weights.iter().map(|w| w.value()).sum();

  let hours = if !(total_weight.is_finite() && total_weight > 0.0) {
    warn!(total_weight, "invalid total weight, splitting equally");
    rounding::equal_split(total_budget, units.len(), precision)
  } else {
    let proportional: Vec<f64> = weights
      .iter()
      .map(|w| w.value() / total_weight * total_budget)
      .collect();
    let bounded = if policy.strategy.uses_bounds() {
      bounds::normalize(
        &proportional,
        policy.min_unit_hours,
        policy.max_unit_hours,
        total_budget,
      )
      .hours
    } else {
      proportional
    };
    rounding::round_preserving_sum(&bounded, total_budget, precision)
  };

  let fallback = rounding::round_to(total_budget / units.len() as f64, precision);
  for (unit, h) in units.iter().zip(hours) {
    let h = Hours::new(h).unwrap_or_else(|| {
      warn!(unit_id = %unit.id, hours = h, fallback, "invalid final hours, using equal share");
      Hours::new(fallback).unwrap_or(Hours::ZERO)
    });
    allocation.insert(unit.id.clone(), h);
  }

  debug!(
    units = units.len(),
    total_budget,
    strategy = policy.strategy.as_str(),
    "allocated"
  );
  allocation
}

/// Reject a unit set that repeats an id.
pub fn ensure_unique_ids(units: &[WorkUnit]) -> Result<(), AllocationError> {
  let mut seen = HashSet::with_capacity(units.len());
  for unit in units {
    if !seen.insert(unit.id.as_str()) {
      return Err(AllocationError::DuplicateUnit {
        id: unit.id.clone(),
      });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Strategy;
  use crate::fixtures::{stats, unit_at, worked_example};
  use crate::types::FileCategory;

  fn policy(strategy: Strategy) -> AllocationPolicy {
    AllocationPolicy {
      strategy,
      ..AllocationPolicy::default()
    }
  }

  fn values(a: &Allocation) -> Vec<f64> {
    a.iter().map(|(_, h)| h.value()).collect()
  }

  #[test]
  fn empty_units_give_empty_allocation() {
    let out = allocate(&[], 8.0, &AllocationPolicy::default()).unwrap();
    assert!(out.is_empty());
  }

  #[test]
  fn invalid_budget_gives_empty_allocation() {
    let units = worked_example();
    assert!(allocate(&units, 0.0, &AllocationPolicy::default()).unwrap().is_empty());
    assert!(allocate(&units, -2.0, &AllocationPolicy::default()).unwrap().is_empty());
    assert!(allocate(&units, f64::NAN, &AllocationPolicy::default()).unwrap().is_empty());
  }

  #[test]
  fn equal_strategy_splits_thirds() {
    let units = worked_example();
    let out = allocate(&units, 8.0, &policy(Strategy::Equal)).unwrap();
    let mut v = values(&out);
    v.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(v, vec![2.66, 2.67, 2.67]);
    assert!((out.total() - 8.0).abs() < 1e-9);
  }

  #[test]
  fn equal_strategy_ignores_bounds() {
    let units: Vec<_> = (0..2)
      .map(|i| unit_at(&i.to_string(), "2025-01-15T10:00:00Z", None))
      .collect();
    let p = AllocationPolicy {
      strategy: Strategy::Equal,
      max_unit_hours: 1.0,
      ..AllocationPolicy::default()
    };
    let out = allocate(&units, 8.0, &p).unwrap();
    assert_eq!(values(&out), vec![4.0, 4.0]);
  }

  #[test]
  fn sole_unit_receives_whole_budget() {
    let unit = unit_at(
      "only",
      "2025-01-15T10:00:00Z",
      Some(stats(1, 5, 2, vec![("config.json", 7, FileCategory::Config)])),
    );
    let out = allocate(&[unit], 8.0, &policy(Strategy::SizeWeighted)).unwrap();
    assert_eq!(out.get("only").unwrap().value(), 8.0);
  }

  #[test]
  fn size_weighted_worked_example_respects_max() {
    let units = worked_example();
    let out = allocate(&units, 8.0, &policy(Strategy::SizeWeighted)).unwrap();
    assert_eq!(out.get("1").unwrap().value(), 1.22);
    assert_eq!(out.get("2").unwrap().value(), 4.0);
    assert_eq!(out.get("3").unwrap().value(), 2.78);
    assert!((out.total() - 8.0).abs() < 0.01);
  }

  #[test]
  fn allocation_is_deterministic() {
    let units = worked_example();
    for strategy in [
      Strategy::Equal,
      Strategy::SizeWeighted,
      Strategy::TimeWeighted,
      Strategy::ImpactWeighted,
    ] {
      let a = allocate(&units, 7.5, &policy(strategy)).unwrap();
      let b = allocate(&units, 7.5, &policy(strategy)).unwrap();
      assert_eq!(a, b);
      assert!((a.total() - 7.5).abs() <= 0.01);
    }
  }

  #[test]
  fn nan_policy_fields_are_substituted() {
    let units = worked_example();
    let p = AllocationPolicy {
      min_unit_hours: f64::NAN,
      max_unit_hours: f64::NAN,
      rounding_precision: -3,
      ..AllocationPolicy::default()
    };
    let out = allocate(&units, 8.0, &p).unwrap();
    assert!((out.total() - 8.0).abs() < 1e-9);
    for (_, h) in out.iter() {
      assert_eq!(h.value().fract(), 0.0);
    }
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let units = vec![
      unit_at("dup", "2025-01-15T10:00:00Z", None),
      unit_at("dup", "2025-01-15T11:00:00Z", None),
    ];
    let err = allocate(&units, 8.0, &AllocationPolicy::default()).unwrap_err();
    assert!(matches!(err, AllocationError::DuplicateUnit { ref id } if id == "dup"));
  }
}
