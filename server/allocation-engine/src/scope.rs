//! Budget scopes and the validator that gates hand-off to the time-record sink.
//!
//! A scope is one date, either for a single repository or for every
//! repository at once (cross-scope distribution).

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::Config;
use crate::error::AllocationError;
use crate::types::{TimeRecord, WorkUnit};

/// Units that must jointly fit one budget.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScopeKey {
  pub date: NaiveDate,
  /// `None` when the budget is shared across repositories.
  pub repository: Option<String>,
}

impl ScopeKey {
  pub fn new(date: NaiveDate, repository: &str, cross_scope: bool) -> Self {
    Self {
      date,
      repository: (!cross_scope).then(|| repository.to_string()),
    }
  }

  pub fn for_unit(unit: &WorkUnit, cross_scope: bool) -> Self {
    Self::new(unit.date(), &unit.repository, cross_scope)
  }

  pub fn for_record(record: &TimeRecord, cross_scope: bool) -> Self {
    Self::new(record.date, &record.repository, cross_scope)
  }

  pub fn contains(&self, unit: &WorkUnit) -> bool {
    unit.date() == self.date
      && self
        .repository
        .as_deref()
        .map_or(true, |repo| repo == unit.repository)
  }
}

impl fmt::Display for ScopeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.repository {
      Some(repo) => write!(f, "{} in {}", self.date, repo),
      None => write!(f, "{} across all repositories", self.date),
    }
  }
}

/// Group units by scope, keeping input order inside each group.
pub fn group_units(units: &[WorkUnit], cross_scope: bool) -> BTreeMap<ScopeKey, Vec<WorkUnit>> {
  let mut groups: BTreeMap<ScopeKey, Vec<WorkUnit>> = BTreeMap::new();
  for unit in units {
    groups
      .entry(ScopeKey::for_unit(unit, cross_scope))
      .or_default()
      .push(unit.clone());
  }
  groups
}

/// Why a set of records may not be submitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeViolation {
  OverBudget {
    date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    total: f64,
    budget: f64,
    overage: f64,
  },
  NonPositiveHours {
    unit_id: String,
    date: NaiveDate,
    hours: f64,
  },
}

impl fmt::Display for ScopeViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::OverBudget {
        date,
        repository,
        total,
        budget,
        overage,
      } => {
        let scope = ScopeKey {
          date: *date,
          repository: repository.clone(),
        };
        write!(
          f,
          "{}: {:.2}h logged, budget {:.2}h ({:.2}h over)",
          scope, total, budget, overage
        )
      }
      Self::NonPositiveHours {
        unit_id,
        date,
        hours,
      } => write!(f, "{} on {}: hours must be positive, got {}", unit_id, date, hours),
    }
  }
}

/// Every reason `records` cannot be submitted; empty when they can.
///
/// Never corrects the data. Under-budget scopes are fine; over-budget scopes
/// are only reported while the daily budget is enforced.
pub fn validate(records: &[TimeRecord], config: &Config) -> Vec<ScopeViolation> {
  let mut violations = Vec::new();

  for record in records {
    if !(record.hours.is_finite() && record.hours > 0.0) {
      violations.push(ScopeViolation::NonPositiveHours {
        unit_id: record.unit_id.clone(),
        date: record.date,
        hours: record.hours,
      });
    }
  }

  if config.enforce_daily_budget {
    let cross_scope = config.policy.cross_scope_distribution;
    let mut totals: BTreeMap<ScopeKey, f64> = BTreeMap::new();
    for record in records.iter().filter(|r| r.hours.is_finite()) {
      *totals.entry(ScopeKey::for_record(record, cross_scope)).or_insert(0.0) += record.hours;
    }
    for (key, total) in totals {
      if total > config.daily_budget + config.tolerance {
        violations.push(ScopeViolation::OverBudget {
          date: key.date,
          repository: key.repository,
          total,
          budget: config.daily_budget,
          overage: ((total - config.daily_budget) * 100.0).round() / 100.0,
        });
      }
    }
  }

  violations
}

/// `validate`, as a `Result` for callers that stop at the first problem set.
pub fn ensure_valid(records: &[TimeRecord], config: &Config) -> Result<(), AllocationError> {
  let violations = validate(records, config);
  if violations.is_empty() {
    Ok(())
  } else {
    Err(AllocationError::ScopeViolations(violations))
  }
}
