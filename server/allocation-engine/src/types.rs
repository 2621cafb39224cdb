//! Core types for the allocation engine (JSON contracts + internal models).

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::{Config, RepositoryPreferences};
use crate::scope::ScopeViolation;

// ---------------------------------------------------------------------------
// Validity-carrying numbers
// ---------------------------------------------------------------------------

/// A non-negative, finite amount of hours. NaN and negatives are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Hours(f64);

impl Hours {
  pub const ZERO: Hours = Hours(0.0);

  pub fn new(value: f64) -> Option<Self> {
    (value.is_finite() && value >= 0.0).then_some(Self(value))
  }

  pub fn value(self) -> f64 {
    self.0
  }

  pub fn is_positive(self) -> bool {
    self.0 > 0.0
  }
}

impl TryFrom<f64> for Hours {
  type Error = String;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    Self::new(value).ok_or_else(|| format!("hours must be finite and >= 0, got {}", value))
  }
}

impl From<Hours> for f64 {
  fn from(h: Hours) -> f64 {
    h.0
  }
}

impl fmt::Display for Hours {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A strictly positive, finite weight.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
  /// Lowest weight any strategy hands out.
  pub const FLOOR: f64 = 0.1;
  /// Substitute for invalid strategy output.
  pub const NEUTRAL: Weight = Weight(1.0);

  pub fn new(raw: f64) -> Option<Self> {
    (raw.is_finite() && raw > 0.0).then_some(Self(raw))
  }

  pub fn value(self) -> f64 {
    self.0
  }
}

// ---------------------------------------------------------------------------
// Work units (internal, validated)
// ---------------------------------------------------------------------------

/// Coarse file classification used by the size strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
  Source,
  Test,
  Config,
  Other,
}

impl FileCategory {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Source => "source",
      Self::Test => "test",
      Self::Config => "config",
      Self::Other => "other",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
  /// Normalized path (forward slashes, lowercase).
  pub path: String,
  pub changed_lines: u32,
  pub insertions: u32,
  pub deletions: u32,
  pub category: FileCategory,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SizeStats {
  pub files_changed: u32,
  pub insertions: u32,
  pub deletions: u32,
  pub files: Vec<FileChange>,
}

impl SizeStats {
  pub fn total_lines(&self) -> u32 {
    self.insertions.saturating_add(self.deletions)
  }
}

/// One allocatable item: a commit made on one repository.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
  pub id: String,
  pub repository: String,
  /// Committer-local time; the offset decides local hour and calendar date.
  pub timestamp: DateTime<FixedOffset>,
  pub size_stats: Option<SizeStats>,
  /// Branch-derived label, if the source supplied one.
  pub label: Option<String>,
}

impl WorkUnit {
  pub fn date(&self) -> NaiveDate {
    self.timestamp.date_naive()
  }

  pub fn local_hour(&self) -> u32 {
    self.timestamp.hour()
  }
}

// ---------------------------------------------------------------------------
// Allocation result
// ---------------------------------------------------------------------------

/// Hours per unit id. Iteration order is by id, so output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Allocation {
  hours: BTreeMap<String, Hours>,
}

impl Allocation {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, id: impl Into<String>, hours: Hours) {
    self.hours.insert(id.into(), hours);
  }

  pub fn get(&self, id: &str) -> Option<Hours> {
    self.hours.get(id).copied()
  }

  pub fn len(&self) -> usize {
    self.hours.len()
  }

  pub fn is_empty(&self) -> bool {
    self.hours.is_empty()
  }

  pub fn total(&self) -> f64 {
    self.hours.values().map(|h| h.value()).sum()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Hours)> {
    self.hours.iter().map(|(id, h)| (id.as_str(), *h))
  }
}

// ---------------------------------------------------------------------------
// Inbound types (JSON contract: what the shell sends)
// ---------------------------------------------------------------------------

/// One commit as reported by the version-control reader. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundUnit {
  #[serde(alias = "hash")]
  pub id: String,
  #[serde(alias = "repo_path")]
  pub repository: String,
  #[serde(alias = "date")]
  pub timestamp: String,
  #[serde(default, alias = "diff_stats")]
  pub size_stats: Option<InboundSizeStats>,
  #[serde(default)]
  pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundSizeStats {
  #[serde(default)]
  pub files_changed: Option<u32>,
  #[serde(default)]
  pub insertions: u32,
  #[serde(default)]
  pub deletions: u32,
  #[serde(default)]
  pub files: Vec<InboundFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundFile {
  #[serde(alias = "filename")]
  pub path: String,
  #[serde(default, alias = "changes")]
  pub changed_lines: Option<u32>,
  #[serde(default)]
  pub insertions: u32,
  #[serde(default)]
  pub deletions: u32,
  #[serde(default, rename = "category", alias = "type")]
  pub category: Option<FileCategory>,
}

/// Manual hours as typed by the user: a number or text like "3h 30m".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoursInput {
  Decimal(f64),
  Text(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualOverride {
  pub unit_id: String,
  pub hours: HoursInput,
}

/// One allocation request read from stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
  #[serde(default)]
  pub config: Config,
  /// Per-repository preference overrides keyed by repository.
  #[serde(default)]
  pub repositories: BTreeMap<String, RepositoryPreferences>,
  pub units: Vec<InboundUnit>,
  #[serde(default)]
  pub overrides: Vec<ManualOverride>,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what we emit)
// ---------------------------------------------------------------------------

/// Finalized entry for the downstream time-tracking sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeRecord {
  pub unit_id: String,
  pub repository: String,
  /// Committer-local calendar date, serialized `yyyy-MM-dd`.
  pub date: NaiveDate,
  pub hours: f64,
  pub label: String,
  /// Stable id so resubmitting the same record is idempotent downstream.
  pub reference_id: String,
}

/// An override that was applied but could not be spread over its scope.
#[derive(Debug, Clone, Serialize)]
pub struct RedistributionNote {
  pub unit_id: String,
  pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
  pub records: Vec<TimeRecord>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub redistributions: Vec<RedistributionNote>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub violations: Vec<ScopeViolation>,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for an invalid request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
