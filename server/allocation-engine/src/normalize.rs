//! Normalize inbound commit records into validated WorkUnit models.

use chrono::{DateTime, FixedOffset};

use crate::classify;
use crate::error::AllocationError;
use crate::types::*;

/// Validate and normalize a batch. Id uniqueness is checked when the units
/// are loaded into a session.
pub fn normalize_units(raw: &[InboundUnit]) -> Result<Vec<WorkUnit>, AllocationError> {
  raw.iter().map(normalize_unit).collect()
}

/// Parse and normalize one InboundUnit.
pub fn normalize_unit(raw: &InboundUnit) -> Result<WorkUnit, AllocationError> {
  let id = raw.id.trim();
  if id.is_empty() {
    return Err(AllocationError::validation("id", "must not be empty"));
  }
  let repository = raw.repository.trim();
  if repository.is_empty() {
    return Err(AllocationError::validation("repository", "must not be empty"));
  }

  // Keep the committer's offset: local hour and calendar date depend on it.
  let timestamp: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(raw.timestamp.trim())
    .map_err(|e| AllocationError::validation("timestamp", &format!("invalid RFC3339: {}", e)))?;

  let size_stats = raw.size_stats.as_ref().map(normalize_stats);

  let label = raw
    .label
    .as_deref()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .map(str::to_string);

  Ok(WorkUnit {
    id: id.to_string(),
    repository: repository.to_string(),
    timestamp,
    size_stats,
    label,
  })
}

fn normalize_stats(raw: &InboundSizeStats) -> SizeStats {
  let files: Vec<FileChange> = raw
    .files
    .iter()
    .map(|f| {
      let path = classify::canonical_path(&f.path);
      FileChange {
        changed_lines: f
          .changed_lines
          .unwrap_or_else(|| f.insertions.saturating_add(f.deletions)),
        insertions: f.insertions,
        deletions: f.deletions,
        category: f.category.unwrap_or_else(|| classify::file_category(&path)),
        path,
      }
    })
    .collect();

  SizeStats {
    files_changed: raw.files_changed.unwrap_or(files.len() as u32),
    insertions: raw.insertions,
    deletions: raw.deletions,
    files,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Timelike;

  fn inbound(id: &str, timestamp: &str) -> InboundUnit {
    InboundUnit {
      id: id.into(),
      repository: "/work/app".into(),
      timestamp: timestamp.into(),
      size_stats: None,
      label: None,
    }
  }

  #[test]
  fn normalize_keeps_local_offset() {
    let unit = normalize_unit(&inbound("abc", "2025-01-15T23:30:00-03:00")).unwrap();
    assert_eq!(unit.local_hour(), 23);
    assert_eq!(unit.date().to_string(), "2025-01-15");
    assert_eq!(unit.timestamp.with_timezone(&chrono::Utc).hour(), 2);
  }

  #[test]
  fn normalize_fills_missing_stats_fields() {
    let mut raw = inbound("abc", "2025-01-15T10:00:00Z");
    raw.size_stats = Some(InboundSizeStats {
      files_changed: None,
      insertions: 12,
      deletions: 3,
      files: vec![
        InboundFile {
          path: ".\\src\\Feature.ts".into(),
          changed_lines: None,
          insertions: 10,
          deletions: 2,
          category: None,
        },
        InboundFile {
          path: "package.json".into(),
          changed_lines: Some(3),
          insertions: 2,
          deletions: 1,
          category: Some(FileCategory::Other),
        },
      ],
    });
    let stats = normalize_unit(&raw).unwrap().size_stats.unwrap();
    assert_eq!(stats.files_changed, 2);
    assert_eq!(stats.files[0].path, "src/feature.ts");
    assert_eq!(stats.files[0].changed_lines, 12);
    assert_eq!(stats.files[0].category, FileCategory::Source);
    // An explicit category is kept as sent.
    assert_eq!(stats.files[1].category, FileCategory::Other);
  }

  #[test]
  fn normalize_rejects_bad_fields() {
    let err = normalize_unit(&inbound("", "2025-01-15T10:00:00Z")).unwrap_err();
    assert!(err.to_string().contains("id"));
    let err = normalize_unit(&inbound("abc", "yesterday")).unwrap_err();
    assert!(err.to_string().contains("timestamp"));
  }
}
