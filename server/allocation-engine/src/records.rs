//! Turn an allocation into time records for the downstream sink.

use chrono::NaiveDate;

use crate::types::{Allocation, TimeRecord, WorkUnit};

const SHORT_ID_LEN: usize = 7;

/// Stable id for one unit's entry on one date: "tr-" + 16 hex chars.
pub fn reference_id(repository: &str, unit_id: &str, date: NaiveDate) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(repository.as_bytes());
  hasher.update(b"|");
  hasher.update(unit_id.as_bytes());
  hasher.update(b"|");
  hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("tr-{}", &hex[..16])
}

/// One record per allocated unit, ordered by date, repository, time, then id.
/// Units missing from `allocation` are left out.
pub fn build_records(units: &[WorkUnit], allocation: &Allocation) -> Vec<TimeRecord> {
  let mut ordered: Vec<&WorkUnit> = units.iter().collect();
  ordered.sort_by(|a, b| {
    (a.date(), &a.repository, a.timestamp, &a.id)
      .cmp(&(b.date(), &b.repository, b.timestamp, &b.id))
  });

  ordered
    .into_iter()
    .filter_map(|unit| {
      let hours = allocation.get(&unit.id)?;
      let date = unit.date();
      Some(TimeRecord {
        unit_id: unit.id.clone(),
        repository: unit.repository.clone(),
        date,
        hours: hours.value(),
        label: label_for(unit),
        reference_id: reference_id(&unit.repository, &unit.id, date),
      })
    })
    .collect()
}

fn label_for(unit: &WorkUnit) -> String {
  match unit.label.as_deref().map(str::trim) {
    Some(label) if !label.is_empty() => label.to_string(),
    _ => unit.id.chars().take(SHORT_ID_LEN).collect(),
  }
}
