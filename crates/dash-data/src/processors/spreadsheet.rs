//! Cleanup for tables exported from spreadsheets

use std::collections::HashSet;

use dash_core::TabularResult;

use crate::config::LoadOptions;
use crate::DataError;

/// Trim a header, then drop byte-order marks and punctuation
///
/// Keeps ASCII letters and digits, `_`, `-` and whitespace. Trimming
/// happens first, so whitespace left next to removed punctuation stays
/// (`" Cost (%) "` becomes `"Cost "`).
pub fn clean_header(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|&c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace())
        .collect()
}

/// Clean every header name; values are left untouched
pub fn process(table: TabularResult, _options: &LoadOptions) -> Result<TabularResult, DataError> {
    let mut taken = HashSet::new();
    let cleaned = table.rename_columns(|name| {
        let base = clean_header(name);
        let mut candidate = base.clone();
        let mut suffix = 0;
        while !taken.insert(candidate.clone()) {
            suffix += 1;
            candidate = format!("{}_{}", base, suffix);
        }
        candidate
    })?;
    Ok(cleaned)
}
