//! Shared builders for unit tests.

use chrono::DateTime;

use crate::types::{FileCategory, FileChange, SizeStats, WorkUnit};

pub fn unit_at(id: &str, timestamp: &str, size_stats: Option<SizeStats>) -> WorkUnit {
  unit_in("repo", id, timestamp, size_stats)
}

pub fn unit_in(
  repository: &str,
  id: &str,
  timestamp: &str,
  size_stats: Option<SizeStats>,
) -> WorkUnit {
  WorkUnit {
    id: id.into(),
    repository: repository.into(),
    timestamp: DateTime::parse_from_rfc3339(timestamp).unwrap(),
    size_stats,
    label: None,
  }
}

/// `files` entries are (path, changed lines, category).
pub fn stats(
  files_changed: u32,
  insertions: u32,
  deletions: u32,
  files: Vec<(&str, u32, FileCategory)>,
) -> SizeStats {
  SizeStats {
    files_changed,
    insertions,
    deletions,
    files: files
      .into_iter()
      .map(|(path, changed_lines, category)| FileChange {
        path: path.into(),
        changed_lines,
        insertions: changed_lines,
        deletions: 0,
        category,
      })
      .collect(),
  }
}

/// Config tweak, feature with tests and docs, test-only update.
pub fn worked_example() -> Vec<WorkUnit> {
  vec![
    unit_at(
      "1",
      "2025-01-15T09:10:00Z",
      Some(stats(1, 5, 2, vec![("config.json", 7, FileCategory::Config)])),
    ),
    unit_at(
      "2",
      "2025-01-15T11:45:00Z",
      Some(stats(
        3,
        150,
        50,
        vec![
          ("src/feature.ts", 120, FileCategory::Source),
          ("src/feature.test.ts", 60, FileCategory::Test),
          ("readme.md", 20, FileCategory::Other),
        ],
      )),
    ),
    unit_at(
      "3",
      "2025-01-15T15:20:00Z",
      Some(stats(
        2,
        30,
        10,
        vec![
          ("src/feature.test.ts", 35, FileCategory::Test),
          ("test/helpers.ts", 5, FileCategory::Test),
        ],
      )),
    ),
  ]
}
