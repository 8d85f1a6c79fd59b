//! Null value handling for data loading

use serde::{Serialize, Deserialize};

/// Null value configuration
///
/// The empty string is always null; `patterns` adds further tokens such as
/// the `-` and `**` annotations census exports use for suppressed cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullConfig {
    /// Extra tokens to treat as null
    pub patterns: Vec<String>,

    /// Case sensitive matching
    pub case_sensitive: bool,
}

impl NullConfig {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            case_sensitive: false,
        }
    }

    /// Check if a value should be treated as null
    pub fn is_null(&self, value: &str) -> bool {
        let test_value = value.trim();
        if test_value.is_empty() {
            return true;
        }

        self.patterns.iter().any(|pattern| {
            if self.case_sensitive {
                test_value == pattern
            } else {
                test_value.eq_ignore_ascii_case(pattern)
            }
        })
    }

    /// Add a null pattern
    pub fn add_pattern(&mut self, pattern: String) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Copy of this config with `extra` patterns appended
    pub fn merged(&self, extra: &[String]) -> Self {
        let mut merged = self.clone();
        for pattern in extra {
            merged.add_pattern(pattern.clone());
        }
        merged
    }
}
