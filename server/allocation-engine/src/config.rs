//! Allocation policy and session configuration with sane defaults.
//!
//! Everything here is caller-owned and passed into the engine explicitly.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

pub const DEFAULT_DAILY_BUDGET: f64 = 8.0;
pub const DEFAULT_MIN_UNIT_HOURS: f64 = 0.25;
pub const DEFAULT_MAX_UNIT_HOURS: f64 = 4.0;
pub const DEFAULT_ROUNDING_PRECISION: i32 = 2;
pub const MAX_ROUNDING_PRECISION: i32 = 4;

/// How a unit's relative claim on the budget is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
  /// Every unit weighs the same; bounds do not apply.
  Equal,
  /// Files touched, lines changed and file kinds.
  #[default]
  #[serde(alias = "commit-size")]
  SizeWeighted,
  /// Local hour of the commit, nudged by size.
  #[serde(alias = "time-based")]
  TimeWeighted,
  /// Area of the codebase touched (core, ui, api, ...) and breadth.
  #[serde(alias = "impact-analysis")]
  ImpactWeighted,
}

impl Strategy {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Equal => "equal",
      Self::SizeWeighted => "size-weighted",
      Self::TimeWeighted => "time-weighted",
      Self::ImpactWeighted => "impact-weighted",
    }
  }

  /// Bounds are meaningless when every unit gets the same share.
  pub fn uses_bounds(self) -> bool {
    !matches!(self, Self::Equal)
  }
}

/// Per-call allocation policy.
///
/// Missing, null or mistyped fields take their default with a warning; they
/// never fail the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
  #[serde(alias = "distribution_strategy", deserialize_with = "lenient_strategy")]
  pub strategy: Strategy,
  #[serde(alias = "minimum_commit_hours", deserialize_with = "lenient_min_hours")]
  pub min_unit_hours: f64,
  #[serde(alias = "maximum_commit_hours", deserialize_with = "lenient_max_hours")]
  pub max_unit_hours: f64,
  #[serde(deserialize_with = "lenient_precision")]
  pub rounding_precision: i32,
  /// Share one budget across all repositories for a date instead of one per repository.
  #[serde(
    alias = "distribute_across_repositories",
    deserialize_with = "lenient_cross_scope"
  )]
  pub cross_scope_distribution: bool,
}

impl Default for AllocationPolicy {
  fn default() -> Self {
    Self {
      strategy: Strategy::default(),
      min_unit_hours: DEFAULT_MIN_UNIT_HOURS,
      max_unit_hours: DEFAULT_MAX_UNIT_HOURS,
      rounding_precision: DEFAULT_ROUNDING_PRECISION,
      cross_scope_distribution: false,
    }
  }
}

impl AllocationPolicy {
  /// Copy of this policy with invalid fields replaced by defaults.
  ///
  /// Bad values are recoverable: each substitution is logged, never returned as an error.
  pub fn sanitized(&self) -> Self {
    let mut p = self.clone();

    if !(0..=MAX_ROUNDING_PRECISION).contains(&p.rounding_precision) {
      let clamped = p.rounding_precision.clamp(0, MAX_ROUNDING_PRECISION);
      warn!(
        field = "rounding_precision",
        value = p.rounding_precision,
        substitute = clamped,
        "rounding precision out of range, clamping"
      );
      p.rounding_precision = clamped;
    }
    if !is_positive(p.min_unit_hours) {
      warn!(
        field = "min_unit_hours",
        value = p.min_unit_hours,
        substitute = DEFAULT_MIN_UNIT_HOURS,
        "invalid minimum hours, using default"
      );
      p.min_unit_hours = DEFAULT_MIN_UNIT_HOURS;
    }
    if !is_positive(p.max_unit_hours) {
      warn!(
        field = "max_unit_hours",
        value = p.max_unit_hours,
        substitute = DEFAULT_MAX_UNIT_HOURS,
        "invalid maximum hours, using default"
      );
      p.max_unit_hours = DEFAULT_MAX_UNIT_HOURS;
    }
    if p.min_unit_hours > p.max_unit_hours {
      warn!(
        min = p.min_unit_hours,
        max = p.max_unit_hours,
        "minimum hours above maximum, swapping"
      );
      std::mem::swap(&mut p.min_unit_hours, &mut p.max_unit_hours);
    }
    p
  }

  /// Precision as a usable exponent. Only meaningful after `sanitized()`.
  pub fn precision(&self) -> u32 {
    self.rounding_precision.clamp(0, MAX_ROUNDING_PRECISION) as u32
  }
}

fn is_positive(v: f64) -> bool {
  v.is_finite() && v > 0.0
}

/// Decode `value` as `T`, or log and fall back to `default`.
fn recover<T: DeserializeOwned>(field: &'static str, value: Value, default: T) -> T {
  T::deserialize(&value).unwrap_or_else(|e| {
    warn!(field, value = %value, error = %e, "unusable policy field, using default");
    default
  })
}

fn lenient_strategy<'de, D: Deserializer<'de>>(d: D) -> Result<Strategy, D::Error> {
  Ok(recover("strategy", Value::deserialize(d)?, Strategy::default()))
}

fn lenient_min_hours<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  Ok(recover("min_unit_hours", Value::deserialize(d)?, DEFAULT_MIN_UNIT_HOURS))
}

fn lenient_max_hours<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
  Ok(recover("max_unit_hours", Value::deserialize(d)?, DEFAULT_MAX_UNIT_HOURS))
}

fn lenient_precision<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
  Ok(recover(
    "rounding_precision",
    Value::deserialize(d)?,
    DEFAULT_ROUNDING_PRECISION,
  ))
}

fn lenient_cross_scope<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
  Ok(recover("cross_scope_distribution", Value::deserialize(d)?, false))
}

/// Session-level settings around the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Hours each scope must add up to.
  pub daily_budget: f64,
  /// When false, scopes may exceed the budget; non-positive hours are still rejected.
  #[serde(alias = "enforce_8_hours")]
  pub enforce_daily_budget: bool,
  /// Redistribute the rest of the scope as soon as a manual override is applied.
  #[serde(alias = "auto_redistribute_hours")]
  pub auto_redistribute: bool,
  /// Allowed distance between a scope's total and its budget.
  pub tolerance: f64,
  pub policy: AllocationPolicy,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      daily_budget: DEFAULT_DAILY_BUDGET,
      enforce_daily_budget: true,
      auto_redistribute: true,
      tolerance: 0.01,
      policy: AllocationPolicy::default(),
    }
  }
}

impl Config {
  /// Policy that applies to `repository`.
  ///
  /// With cross-scope distribution every repository shares one budget, so the
  /// global policy wins regardless of per-repository preferences.
  pub fn effective_policy(
    &self,
    repository: &str,
    repositories: &BTreeMap<String, RepositoryPreferences>,
  ) -> AllocationPolicy {
    if self.policy.cross_scope_distribution {
      return self.policy.clone();
    }
    match repositories.get(repository) {
      Some(prefs) if !prefs.use_global_settings => AllocationPolicy {
        cross_scope_distribution: false,
        ..prefs.policy.clone()
      },
      _ => self.policy.clone(),
    }
  }
}

/// Repository-specific preferences; ignored while `use_global_settings` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPreferences {
  pub use_global_settings: bool,
  pub policy: AllocationPolicy,
}

impl Default for RepositoryPreferences {
  fn default() -> Self {
    Self {
      use_global_settings: true,
      policy: AllocationPolicy::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitized_replaces_invalid_fields() {
    let policy = AllocationPolicy {
      min_unit_hours: f64::NAN,
      max_unit_hours: -1.0,
      rounding_precision: 9,
      ..AllocationPolicy::default()
    };
    let p = policy.sanitized();
    assert_eq!(p.min_unit_hours, DEFAULT_MIN_UNIT_HOURS);
    assert_eq!(p.max_unit_hours, DEFAULT_MAX_UNIT_HOURS);
    assert_eq!(p.rounding_precision, MAX_ROUNDING_PRECISION);
  }

  #[test]
  fn sanitized_keeps_zero_precision_and_swaps_inverted_bounds() {
    let policy = AllocationPolicy {
      min_unit_hours: 3.0,
      max_unit_hours: 1.0,
      rounding_precision: 0,
      ..AllocationPolicy::default()
    };
    let p = policy.sanitized();
    assert_eq!(p.rounding_precision, 0);
    assert_eq!((p.min_unit_hours, p.max_unit_hours), (1.0, 3.0));
  }

  #[test]
  fn strategy_accepts_legacy_names() {
    let s: Strategy = serde_json::from_str(r#""commit-size""#).unwrap();
    assert_eq!(s, Strategy::SizeWeighted);
    let s: Strategy = serde_json::from_str(r#""impact-analysis""#).unwrap();
    assert_eq!(s, Strategy::ImpactWeighted);
    let s: Strategy = serde_json::from_str(r#""time-weighted""#).unwrap();
    assert_eq!(s, Strategy::TimeWeighted);
    assert!(!Strategy::Equal.uses_bounds());
  }

  #[test]
  fn config_defaults_fill_missing_fields() {
    let cfg: Config = serde_json::from_str(r#"{"policy": {"strategy": "equal"}}"#).unwrap();
    assert_eq!(cfg.daily_budget, 8.0);
    assert!(cfg.enforce_daily_budget);
    assert_eq!(cfg.policy.strategy, Strategy::Equal);
    assert_eq!(cfg.policy.max_unit_hours, 4.0);
  }

  #[test]
  fn unusable_policy_fields_fall_back_to_defaults() {
    let p: AllocationPolicy = serde_json::from_str(
      r#"{
        "strategy": "bogus",
        "min_unit_hours": null,
        "max_unit_hours": "six",
        "rounding_precision": 2.5,
        "cross_scope_distribution": 1
      }"#,
    )
    .unwrap();
    assert_eq!(p, AllocationPolicy::default());

    let cfg: Config = serde_json::from_str(
      r#"{
        "daily_budget": 6,
        "policy": {"distribution_strategy": "equal", "minimum_commit_hours": null}
      }"#,
    )
    .unwrap();
    assert_eq!(cfg.daily_budget, 6.0);
    assert_eq!(cfg.policy.strategy, Strategy::Equal);
    assert_eq!(cfg.policy.min_unit_hours, DEFAULT_MIN_UNIT_HOURS);
  }

  #[test]
  fn effective_policy_respects_repository_opt_out() {
    let cfg = Config::default();
    let mut repos = BTreeMap::new();
    repos.insert(
      "api".to_string(),
      RepositoryPreferences {
        use_global_settings: false,
        policy: AllocationPolicy {
          strategy: Strategy::TimeWeighted,
          ..AllocationPolicy::default()
        },
      },
    );
    repos.insert("web".to_string(), RepositoryPreferences::default());

    assert_eq!(cfg.effective_policy("api", &repos).strategy, Strategy::TimeWeighted);
    assert_eq!(cfg.effective_policy("web", &repos).strategy, Strategy::SizeWeighted);
    assert_eq!(cfg.effective_policy("other", &repos), cfg.policy);

    let shared = Config {
      policy: AllocationPolicy {
        cross_scope_distribution: true,
        ..AllocationPolicy::default()
      },
      ..Config::default()
    };
    assert_eq!(shared.effective_policy("api", &repos).strategy, Strategy::SizeWeighted);
  }
}
