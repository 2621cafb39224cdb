//! File classification from path patterns.
//!
//! Paths are expected normalized (forward slashes); matching is case-insensitive.

use crate::types::FileCategory;

/// Area of the codebase a file belongs to, for impact weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactArea {
  Core,
  Ui,
  Api,
  Utils,
  Test,
  Config,
  Other,
}

impl ImpactArea {
  pub fn base_weight(self) -> f64 {
    match self {
      Self::Core => 2.0,
      Self::Ui => 1.5,
      Self::Api => 1.8,
      Self::Utils => 1.0,
      Self::Test => 0.8,
      Self::Config => 0.5,
      Self::Other => 0.3,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Core => "core",
      Self::Ui => "ui",
      Self::Api => "api",
      Self::Utils => "utils",
      Self::Test => "test",
      Self::Config => "config",
      Self::Other => "other",
    }
  }
}

const CORE_DIRS: &[&str] = &["/services/", "/models/", "/core/", "/domain/", "/entities/"];
const UI_DIRS: &[&str] = &["/components/", "/views/", "/pages/", "/screens/", "/layouts/"];
const API_DIRS: &[&str] = &["/api/", "/repositories/", "/routes/", "/controllers/", "/handlers/"];
const UTIL_DIRS: &[&str] = &["/utils/", "/helpers/", "/util/", "/common/"];
const CONFIG_EXTS: &[&str] = &["json", "yml", "yaml", "config", "env"];

const SOURCE_EXTS: &[&str] = &[
  "rs", "ts", "tsx", "js", "jsx", "mjs", "py", "go", "java", "kt", "swift", "rb", "c", "h",
  "cc", "cpp", "hpp", "cs", "php", "scala", "vue", "svelte", "sql", "sh",
];
const EXTRA_CONFIG_EXTS: &[&str] = &["toml", "ini", "lock", "xml", "properties"];

/// Impact area of one path. File-name rules (tests, config) win over directory rules.
pub fn impact_area(path: &str) -> ImpactArea {
  let p = anchored(path);
  let name = file_name(&p);

  if is_test_name(name) {
    return ImpactArea::Test;
  }
  if CONFIG_EXTS.contains(&extension(name)) {
    return ImpactArea::Config;
  }
  if contains_any(&p, CORE_DIRS) {
    ImpactArea::Core
  } else if contains_any(&p, UI_DIRS) {
    ImpactArea::Ui
  } else if contains_any(&p, API_DIRS) {
    ImpactArea::Api
  } else if contains_any(&p, UTIL_DIRS) {
    ImpactArea::Utils
  } else {
    ImpactArea::Other
  }
}

/// Coarse category for a path whose diff did not carry one.
pub fn file_category(path: &str) -> FileCategory {
  let p = anchored(path);
  let name = file_name(&p);
  let ext = extension(name);

  if is_test_name(name)
    || name.contains("_test.")
    || p.contains("/test/")
    || p.contains("/tests/")
    || p.contains("/__tests__/")
    || p.contains("/spec/")
  {
    FileCategory::Test
  } else if CONFIG_EXTS.contains(&ext)
    || EXTRA_CONFIG_EXTS.contains(&ext)
    || name.starts_with(".env")
  {
    FileCategory::Config
  } else if SOURCE_EXTS.contains(&ext) {
    FileCategory::Source
  } else {
    FileCategory::Other
  }
}

/// Stable form of a repository path: forward slashes, no empty or "."
/// segments, lowercase.
pub fn canonical_path(path: &str) -> String {
  path
    .trim()
    .split(|c: char| c == '/' || c == '\\')
    .filter(|seg| !seg.is_empty() && *seg != ".")
    .collect::<Vec<_>>()
    .join("/")
    .to_ascii_lowercase()
}

/// Canonical path with a leading slash so top-level directories match "/dir/" patterns.
fn anchored(path: &str) -> String {
  format!("/{}", canonical_path(path))
}

fn file_name(path: &str) -> &str {
  path.rsplit('/').next().unwrap_or(path)
}

/// Extension without the dot; ".env" yields "env", "Makefile" yields "".
fn extension(name: &str) -> &str {
  match name.rfind('.') {
    Some(i) => &name[i + 1..],
    None => "",
  }
}

fn is_test_name(name: &str) -> bool {
  name.contains(".test.") || name.contains(".spec.")
}

fn contains_any(path: &str, patterns: &[&str]) -> bool {
  patterns.iter().any(|pat| path.contains(pat))
}
