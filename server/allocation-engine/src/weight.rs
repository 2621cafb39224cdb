//! Weight strategies: score one work unit's relative claim on the budget.
//!
//! Every strategy is pure. Raw scores are floored at `Weight::FLOOR`; the
//! orchestrator still guards against anything non-positive or NaN.

use serde::Serialize;

use crate::classify;
use crate::config::Strategy;
use crate::types::{FileCategory, Weight, WorkUnit};

/// Running score for one unit. Optionally records a readable line per step.
#[derive(Debug, Default)]
pub struct Tally {
  total: f64,
  notes: Option<Vec<String>>,
}

impl Tally {
  pub fn silent() -> Self {
    Self::default()
  }

  pub fn recording() -> Self {
    Self {
      total: 0.0,
      notes: Some(Vec::new()),
    }
  }

  pub fn add(&mut self, amount: f64, label: impl FnOnce() -> String) {
    self.total += amount;
    if let Some(notes) = self.notes.as_mut() {
      notes.push(format!("{}: {:.2}", label(), amount));
    }
  }

  pub fn scale(&mut self, factor: f64, label: impl FnOnce() -> String) {
    self.total *= factor;
    if let Some(notes) = self.notes.as_mut() {
      notes.push(format!("{}: x{:.2}", label(), factor));
    }
  }

  pub fn floor(&mut self, min: f64) {
    if self.total < min {
      if let Some(notes) = self.notes.as_mut() {
        notes.push(format!("raised to floor: {:.2}", min));
      }
      self.total = min;
    }
  }

  pub fn total(&self) -> f64 {
    self.total
  }
}

/// Scores a unit. `context` is every unit taking part in the same call.
pub trait WeightStrategy {
  fn score(&self, unit: &WorkUnit, context: &[WorkUnit], tally: &mut Tally);

  fn weight(&self, unit: &WorkUnit, context: &[WorkUnit]) -> f64 {
    let mut tally = Tally::silent();
    self.score(unit, context, &mut tally);
    tally.total()
  }
}

pub struct EqualWeight;

impl WeightStrategy for EqualWeight {
  fn score(&self, _unit: &WorkUnit, _context: &[WorkUnit], tally: &mut Tally) {
    tally.add(1.0, || "equal share".into());
  }
}

pub struct SizeWeight;

impl SizeWeight {
  fn category_weight(category: FileCategory) -> f64 {
    match category {
      FileCategory::Source => 1.0,
      FileCategory::Test => 0.5,
      FileCategory::Config => 0.3,
      FileCategory::Other => 0.2,
    }
  }
}

impl WeightStrategy for SizeWeight {
  fn score(&self, unit: &WorkUnit, _context: &[WorkUnit], tally: &mut Tally) {
    let Some(stats) = &unit.size_stats else {
      tally.add(1.0, || "no diff stats, equal share".into());
      return;
    };

    let files = stats.files_changed;
    tally.add(0.5 * files as f64, || format!("files changed ({} x 0.5)", files));

    let lines = stats.total_lines();
    tally.add(0.3 * (lines as f64 / 50.0).min(2.0), || {
      format!("lines changed ({} / 50 x 0.3, max 2)", lines)
    });

    for file in &stats.files {
      tally.add(Self::category_weight(file.category), || {
        format!("{} ({})", file.path, file.category.as_str())
      });
      tally.add(0.5 * (file.changed_lines as f64 / 100.0).min(1.0), || {
        format!("{} size ({} lines)", file.path, file.changed_lines)
      });
    }

    tally.floor(Weight::FLOOR);
  }
}

pub struct TimeWeight;

impl TimeWeight {
  /// Core hours count most, shoulder hours a bit less, the night least.
  pub fn time_of_day_factor(hour: u32) -> f64 {
    match hour {
      9..=16 => 1.5,
      6..=8 | 17..=19 => 1.2,
      _ => 0.8,
    }
  }
}

impl WeightStrategy for TimeWeight {
  fn score(&self, unit: &WorkUnit, _context: &[WorkUnit], tally: &mut Tally) {
    tally.add(1.0, || "base".into());

    let hour = unit.local_hour();
    tally.scale(Self::time_of_day_factor(hour), || format!("committed at {:02}:00", hour));

    if let Some(stats) = &unit.size_stats {
      let files = stats.files_changed;
      tally.add(0.1 * files as f64, || format!("files changed ({} x 0.1)", files));
      let lines = stats.total_lines();
      tally.add(0.1 * (lines as f64 / 50.0).min(1.0), || {
        format!("lines changed ({} / 50 x 0.1, max 1)", lines)
      });
    }

    tally.floor(Weight::FLOOR);
  }
}

pub struct ImpactWeight;

impl ImpactWeight {
  /// Rewards touching more files: 0.5 for none, 1.0 at five, capped at 1.25.
  pub fn breadth_multiplier(files_changed: u32) -> f64 {
    1.0 + 0.5 * ((files_changed as f64 / 5.0).min(1.5) - 1.0)
  }
}

impl WeightStrategy for ImpactWeight {
  fn score(&self, unit: &WorkUnit, _context: &[WorkUnit], tally: &mut Tally) {
    let Some(stats) = &unit.size_stats else {
      tally.add(1.0, || "no diff stats, equal share".into());
      return;
    };

    for file in &stats.files {
      let area = classify::impact_area(&file.path);
      tally.add(area.base_weight(), || format!("{} ({})", file.path, area.as_str()));
      tally.add(0.5 * (file.changed_lines as f64 / 50.0).min(2.0), || {
        format!("{} size ({} lines)", file.path, file.changed_lines)
      });
    }

    let files = stats.files_changed;
    tally.scale(Self::breadth_multiplier(files), || {
      format!("breadth ({} files)", files)
    });

    tally.floor(Weight::FLOOR);
  }
}

impl WeightStrategy for Strategy {
  fn score(&self, unit: &WorkUnit, context: &[WorkUnit], tally: &mut Tally) {
    match self {
      Strategy::Equal => EqualWeight.score(unit, context, tally),
      Strategy::SizeWeighted => SizeWeight.score(unit, context, tally),
      Strategy::TimeWeighted => TimeWeight.score(unit, context, tally),
      Strategy::ImpactWeighted => ImpactWeight.score(unit, context, tally),
    }
  }
}

/// How one unit's weight was reached.
#[derive(Debug, Clone, Serialize)]
pub struct WeightBreakdown {
  pub unit_id: String,
  pub strategy: Strategy,
  pub weight: f64,
  pub contributions: Vec<String>,
}

/// Score `unit` under `strategy`, keeping a line per contribution.
pub fn explain(unit: &WorkUnit, context: &[WorkUnit], strategy: Strategy) -> WeightBreakdown {
  let mut tally = Tally::recording();
  strategy.score(unit, context, &mut tally);
  WeightBreakdown {
    unit_id: unit.id.clone(),
    strategy,
    weight: tally.total(),
    contributions: tally.notes.unwrap_or_default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fixtures::{stats, unit_at, worked_example};

  fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
  }

  #[test]
  fn equal_ignores_size_stats() {
    let units = worked_example();
    for u in &units {
      assert!(close(Strategy::Equal.weight(u, &units), 1.0));
    }
  }

  #[test]
  fn size_weights_match_worked_example() {
    let units = worked_example();
    let w: Vec<f64> = units
      .iter()
      .map(|u| Strategy::SizeWeighted.weight(u, &units))
      .collect();
    // config.json alone: 0.5 + 0.3 * 0.14 + 0.3 + 0.5 * 0.07
    assert!(close(w[0], 0.877));
    assert!(close(w[1], 4.7));
    assert!(close(w[2], 2.44));
  }

  #[test]
  fn missing_stats_fall_back_to_one() {
    let u = unit_at("a", "2025-01-15T10:00:00Z", None);
    assert!(close(Strategy::SizeWeighted.weight(&u, &[]), 1.0));
    assert!(close(Strategy::ImpactWeighted.weight(&u, &[]), 1.0));
  }

  #[test]
  fn size_weight_never_below_floor() {
    let u = unit_at("a", "2025-01-15T10:00:00Z", Some(stats(0, 0, 0, vec![])));
    assert!(close(Strategy::SizeWeighted.weight(&u, &[]), Weight::FLOOR));
  }

  #[test]
  fn time_of_day_factor_bands() {
    assert_eq!(TimeWeight::time_of_day_factor(9), 1.5);
    assert_eq!(TimeWeight::time_of_day_factor(16), 1.5);
    assert_eq!(TimeWeight::time_of_day_factor(17), 1.2);
    assert_eq!(TimeWeight::time_of_day_factor(6), 1.2);
    assert_eq!(TimeWeight::time_of_day_factor(19), 1.2);
    assert_eq!(TimeWeight::time_of_day_factor(20), 0.8);
    assert_eq!(TimeWeight::time_of_day_factor(5), 0.8);
  }

  #[test]
  fn time_weight_uses_committer_local_hour() {
    // 08:30 UTC is 10:30 at +02:00: core hours.
    let u = unit_at("a", "2025-01-15T10:30:00+02:00", None);
    assert!(close(Strategy::TimeWeighted.weight(&u, &[]), 1.5));

    let night = unit_at("b", "2025-01-15T23:10:00-05:00", None);
    assert!(close(Strategy::TimeWeighted.weight(&night, &[]), 0.8));

    let sized = unit_at("c", "2025-01-15T10:00:00Z", Some(stats(2, 60, 40, vec![])));
    assert!(close(Strategy::TimeWeighted.weight(&sized, &[]), 1.5 + 0.2 + 0.1));
  }

  #[test]
  fn impact_weight_rewards_core_and_breadth() {
    let one_core = unit_at(
      "a",
      "2025-01-15T10:00:00Z",
      Some(stats(1, 80, 20, vec![("src/services/billing.ts", 100, FileCategory::Source)])),
    );
    // (2.0 + 0.5 * 2) * (1 + 0.5 * (0.2 - 1))
    assert!(close(Strategy::ImpactWeighted.weight(&one_core, &[]), 1.8));

    let files: Vec<_> = (0..10)
      .map(|_| ("src/utils/x.ts", 0, FileCategory::Source))
      .collect();
    let broad = unit_at("b", "2025-01-15T10:00:00Z", Some(stats(10, 0, 0, files)));
    assert!(close(Strategy::ImpactWeighted.weight(&broad, &[]), 10.0 * 1.25));
  }

  #[test]
  fn explain_lists_contributions() {
    let units = worked_example();
    let b = explain(&units[1], &units, Strategy::SizeWeighted);
    assert_eq!(b.unit_id, "2");
    assert!(close(b.weight, 4.7));
    // files + lines + two lines per file
    assert_eq!(b.contributions.len(), 2 + 3 * 2);
    assert!(b.contributions[0].starts_with("files changed (3 x 0.5)"));
  }
}
