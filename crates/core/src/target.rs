//! Test targets
//!
//! A target names either one spec file (optionally with a `:<line>` suffix
//! selecting a single spec or describe block) or the spec directory itself,
//! which means "run everything".

use std::fmt;
use std::path::{Path, PathBuf};

/// One requested test target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target {
    /// Spec file or spec directory path.
    pub path: PathBuf,

    /// Source line selecting a single block within the file.
    pub line: Option<u32>,
}

impl Target {
    /// Parse a raw target string. A trailing `:<digits>` is a line
    /// selector; anything else is part of the path.
    pub fn parse(raw: &str) -> Self {
        if let Some((path, line)) = raw.rsplit_once(':') {
            if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
                return Self {
                    path: PathBuf::from(path),
                    line: line.parse().ok(),
                };
            }
        }
        Self {
            path: PathBuf::from(raw),
            line: None,
        }
    }

    /// True when this target is the spec directory, i.e. the whole suite.
    pub fn is_suite(&self, spec_dir: &Path) -> bool {
        self.path == spec_dir
    }

    /// True when the underlying file (or directory) exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// The key this target is reported under.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path.display(), line),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

impl From<&str> for Target {
    fn from(raw: &str) -> Self {
        Target::parse(raw)
    }
}

/// Tidy a requested target list before a run: drop paths outside the spec
/// tree, deduplicate while keeping order, and collapse to the spec
/// directory alone when it is present ("run everything" wins).
pub fn clean(raw: &[String], spec_dir: &Path) -> Vec<Target> {
    let mut targets: Vec<Target> = Vec::new();

    for entry in raw {
        let target = Target::parse(entry);
        if !target.path.starts_with(spec_dir) {
            tracing::warn!("Ignoring target outside the spec directory: {}", entry);
            continue;
        }
        if target.is_suite(spec_dir) {
            return vec![target];
        }
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_path() {
        let target = Target::parse("spec/javascripts/a_spec.js");
        assert_eq!(target.path, PathBuf::from("spec/javascripts/a_spec.js"));
        assert_eq!(target.line, None);
    }

    #[test]
    fn test_parse_line_selector() {
        let target = Target::parse("spec/javascripts/a_spec.js:10");
        assert_eq!(target.path, PathBuf::from("spec/javascripts/a_spec.js"));
        assert_eq!(target.line, Some(10));
        assert_eq!(target.key(), "spec/javascripts/a_spec.js:10");
    }

    #[test]
    fn test_non_numeric_suffix_stays_in_path() {
        let target = Target::parse("spec/javascripts/a:b_spec.js");
        assert_eq!(target.path, PathBuf::from("spec/javascripts/a:b_spec.js"));
        assert_eq!(target.line, None);
    }

    #[test]
    fn test_suite_detection() {
        let spec_dir = Path::new("spec/javascripts");
        assert!(Target::parse("spec/javascripts").is_suite(spec_dir));
        assert!(!Target::parse("spec/javascripts/a_spec.js").is_suite(spec_dir));
    }

    #[test]
    fn test_clean_dedupes_and_filters() {
        let spec_dir = Path::new("spec/javascripts");
        let raw = vec![
            "spec/javascripts/a_spec.js".to_string(),
            "app/assets/a.js".to_string(),
            "spec/javascripts/a_spec.js".to_string(),
            "spec/javascripts/b_spec.js".to_string(),
        ];
        let targets = clean(&raw, spec_dir);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].key(), "spec/javascripts/a_spec.js");
        assert_eq!(targets[1].key(), "spec/javascripts/b_spec.js");
    }

    #[test]
    fn test_clean_collapses_to_suite() {
        let spec_dir = Path::new("spec/javascripts");
        let raw = vec![
            "spec/javascripts/a_spec.js".to_string(),
            "spec/javascripts".to_string(),
            "spec/javascripts/b_spec.js".to_string(),
        ];
        let targets = clean(&raw, spec_dir);
        assert_eq!(targets.len(), 1);
        assert!(targets[0].is_suite(spec_dir));
    }
}
