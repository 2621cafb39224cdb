//! Session state: the current allocation, manual pins, and redistribution.
//!
//! The engine itself is stateless; a `Session` owns the only mutable state
//! (displayed hours and pins) for one user interaction. Mutate it from one
//! thread; put it behind a mutex if several callers share it.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::allocate::{allocate_distinct, ensure_unique_ids};
use crate::config::{AllocationPolicy, Config, RepositoryPreferences};
use crate::error::AllocationError;
use crate::scope::{self, ScopeKey};
use crate::types::{Allocation, Hours, WorkUnit};

/// A manual override on one unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
  pub hours: Hours,
  /// What the engine had computed right before the first pin, for reset.
  pub computed: Hours,
}

/// Result of spreading a scope's remaining budget over its unpinned units.
#[derive(Debug, Clone, PartialEq)]
pub struct Redistribution {
  pub scope: ScopeKey,
  pub remaining: f64,
  /// New hours for the units that were redistributed.
  pub updated: Allocation,
}

pub struct Session {
  config: Config,
  repositories: BTreeMap<String, RepositoryPreferences>,
  units: Vec<WorkUnit>,
  current: Allocation,
  pins: HashMap<String, Pin>,
}

impl Session {
  pub fn new(config: Config) -> Self {
    Self {
      config,
      repositories: BTreeMap::new(),
      units: Vec::new(),
      current: Allocation::new(),
      pins: HashMap::new(),
    }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  pub fn with_repositories(
    mut self,
    repositories: BTreeMap<String, RepositoryPreferences>,
  ) -> Self {
    self.repositories = repositories;
    self
  }

  /// Replace the session's units and compute a fresh allocation per scope.
  /// Any existing pins are dropped.
  pub fn load(&mut self, units: Vec<WorkUnit>) -> Result<&Allocation, AllocationError> {
    ensure_unique_ids(&units)?;

    let mut current = Allocation::new();
    let cross_scope = self.config.policy.cross_scope_distribution;
    for (key, members) in scope::group_units(&units, cross_scope) {
      let policy = self.policy_for(&key);
      let allocation = allocate_distinct(&members, self.config.daily_budget, &policy);
      for (id, hours) in allocation.iter() {
        current.insert(id, hours);
      }
    }

    self.units = units;
    self.current = current;
    self.pins.clear();
    Ok(&self.current)
  }

  /// Recompute everything from scratch, discarding manual overrides.
  pub fn refresh(&mut self) -> Result<&Allocation, AllocationError> {
    let units = std::mem::take(&mut self.units);
    self.load(units)
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn units(&self) -> &[WorkUnit] {
    &self.units
  }

  pub fn allocation(&self) -> &Allocation {
    &self.current
  }

  pub fn hours(&self, unit_id: &str) -> Option<Hours> {
    self.current.get(unit_id)
  }

  pub fn pin(&self, unit_id: &str) -> Option<Pin> {
    self.pins.get(unit_id).copied()
  }

  pub fn is_manual(&self, unit_id: &str) -> bool {
    self.pins.contains_key(unit_id)
  }

  pub fn has_manual_overrides(&self) -> bool {
    !self.pins.is_empty()
  }

  /// Scope whose budget `unit_id` draws from.
  pub fn scope_of(&self, unit_id: &str) -> Result<ScopeKey, AllocationError> {
    let unit = self.unit(unit_id)?;
    Ok(ScopeKey::for_unit(unit, self.config.policy.cross_scope_distribution))
  }

  /// Sum of the current hours of every unit in `key`.
  pub fn scope_total(&self, key: &ScopeKey) -> f64 {
    self
      .units
      .iter()
      .filter(|u| key.contains(u))
      .filter_map(|u| self.current.get(&u.id))
      .map(Hours::value)
      .sum()
  }

  /// Pin `unit_id` to `hours`. Zero, negative and non-finite values are rejected.
  pub fn set_manual(&mut self, unit_id: &str, hours: f64) -> Result<(), AllocationError> {
    self.unit(unit_id)?;
    let pinned = Hours::new(hours)
      .filter(|h| h.is_positive())
      .ok_or_else(|| AllocationError::InvalidManualHours {
        id: unit_id.to_string(),
        hours,
      })?;

    let computed = self.pins.get(unit_id).map_or_else(
      || self.current.get(unit_id).unwrap_or(Hours::ZERO),
      |pin| pin.computed,
    );
    self.pins.insert(
      unit_id.to_string(),
      Pin {
        hours: pinned,
        computed,
      },
    );
    self.current.insert(unit_id, pinned);
    debug!(unit_id, hours, "manual hours set");
    Ok(())
  }

  /// Drop the pin on `unit_id` and show the hours computed before it.
  /// Returns the restored value; a unit without a pin keeps its current hours.
  pub fn reset(&mut self, unit_id: &str) -> Result<Hours, AllocationError> {
    self.unit(unit_id)?;
    match self.pins.remove(unit_id) {
      Some(pin) => {
        self.current.insert(unit_id, pin.computed);
        Ok(pin.computed)
      }
      None => Ok(self.current.get(unit_id).unwrap_or(Hours::ZERO)),
    }
  }

  /// Pin `unit_id` to `new_hours` and spread `daily_budget - new_hours` over
  /// the unpinned units sharing its scope. Other pins in the scope are left as
  /// they are. An existing pin on `unit_id` is replaced by `new_hours`.
  ///
  /// Fails with `CannotRedistribute`, changing nothing, when no budget is left
  /// or every other unit in the scope is pinned.
  pub fn redistribute_after_manual_change(
    &mut self,
    unit_id: &str,
    new_hours: f64,
  ) -> Result<Redistribution, AllocationError> {
    self.unit(unit_id)?;
    if Hours::new(new_hours).filter(|h| h.is_positive()).is_none() {
      return Err(AllocationError::InvalidManualHours {
        id: unit_id.to_string(),
        hours: new_hours,
      });
    }

    let key = self.scope_of(unit_id)?;
    let remaining = self.config.daily_budget - new_hours;
    if remaining <= 0.0 {
      warn!(unit_id, new_hours, scope = %key, "no budget left to redistribute");
      return Err(AllocationError::cannot_redistribute(
        key.to_string(),
        format!(
          "{:.2}h on {} uses the whole {:.2}h budget",
          new_hours, unit_id, self.config.daily_budget
        ),
      ));
    }

    let candidates: Vec<WorkUnit> = self
      .units
      .iter()
      .filter(|u| u.id != unit_id && key.contains(u) && !self.pins.contains_key(&u.id))
      .cloned()
      .collect();
    if candidates.is_empty() {
      warn!(unit_id, scope = %key, "no unpinned units to redistribute to");
      return Err(AllocationError::cannot_redistribute(
        key.to_string(),
        "every other unit in the scope is pinned or there are none",
      ));
    }

    let policy = self.policy_for(&key);
    let updated = allocate_distinct(&candidates, remaining, &policy);
    self.set_manual(unit_id, new_hours)?;
    for (id, hours) in updated.iter() {
      self.current.insert(id, hours);
    }
    debug!(unit_id, remaining, scope = %key, units = candidates.len(), "redistributed");

    Ok(Redistribution {
      scope: key,
      remaining,
      updated,
    })
  }

  /// Pin `unit_id` and, when auto-redistribution is on and the budget is
  /// enforced, redistribute its scope. A refused redistribution is returned
  /// as an error but the pin stays in place.
  pub fn apply_manual(
    &mut self,
    unit_id: &str,
    hours: f64,
  ) -> Result<Option<Redistribution>, AllocationError> {
    self.set_manual(unit_id, hours)?;
    if self.config.auto_redistribute && self.config.enforce_daily_budget {
      self.redistribute_after_manual_change(unit_id, hours).map(Some)
    } else {
      Ok(None)
    }
  }

  fn unit(&self, unit_id: &str) -> Result<&WorkUnit, AllocationError> {
    self
      .units
      .iter()
      .find(|u| u.id == unit_id)
      .ok_or_else(|| AllocationError::UnknownUnit {
        id: unit_id.to_string(),
      })
  }

  fn policy_for(&self, key: &ScopeKey) -> AllocationPolicy {
    match &key.repository {
      Some(repo) => self.config.effective_policy(repo, &self.repositories),
      None => self.config.policy.clone(),
    }
  }
}
