//! Delimited text parsing

use std::collections::HashMap;

use dash_core::{Row, TabularResult};
use tracing::{debug, warn};

use crate::schema::ValueInferrer;
use crate::DataError;

/// Delimiters tried by auto-detection, in tie-break order
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Pick the most frequent candidate delimiter in a line
///
/// Ties go to the earlier candidate, and a line with none of them falls
/// back to a comma.
pub fn detect_delimiter(line: &str) -> char {
    let mut best = ',';
    let mut max_count = 0;
    for candidate in DELIMITER_CANDIDATES {
        let count = line.matches(candidate).count();
        if count > max_count {
            max_count = count;
            best = candidate;
        }
    }
    best
}

/// Split one line into trimmed fields
///
/// A double quote toggles quoted mode, `""` inside quotes is a literal
/// quote, and the delimiter is plain data while quoted.
pub fn tokenize_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }

    fields.push(current.trim().to_string());
    fields
}

/// Split text into records at line feeds outside double quotes
///
/// Each record comes with the 1-based line it starts on. A quoted field
/// may span several lines.
fn split_records(text: &str) -> Vec<(usize, &str)> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;
    let mut in_quotes = false;
    for (idx, byte) in text.bytes().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' => {
                line += 1;
                if !in_quotes {
                    records.push((record_line, &text[start..idx]));
                    start = idx + 1;
                    record_line = line;
                }
            }
            _ => {}
        }
    }
    records.push((record_line, &text[start..]));
    records
}

/// Make header names unique by suffixing repeats with `_1`, `_2`, ...
fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        while seen.contains_key(&candidate) {
            let count = seen.entry(name.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{}_{}", name, count);
        }
        seen.insert(candidate.clone(), 0);
        headers.push(candidate);
    }
    headers
}

/// Parser for comma/semicolon/tab/pipe separated text
#[derive(Debug, Clone)]
pub struct DelimitedParser {
    delimiter: Option<char>,
    has_header: bool,
    inferrer: ValueInferrer,
}

impl DelimitedParser {
    pub fn new(inferrer: ValueInferrer) -> Self {
        Self {
            delimiter: None,
            has_header: true,
            inferrer,
        }
    }

    /// Fix the delimiter instead of detecting it
    pub fn with_delimiter(mut self, delimiter: Option<char>) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Parse text into a table
    ///
    /// Lines whose field count differs from the header count are dropped
    /// and counted in `metadata.dropped_rows`.
    pub fn parse(&self, text: &str) -> Result<TabularResult, DataError> {
        let mut lines = split_records(text)
            .into_iter()
            .map(|(line, record)| (line, record.strip_suffix('\r').unwrap_or(record)))
            .filter(|(_, record)| !record.trim().is_empty())
            .peekable();

        let Some(&(_, first_line)) = lines.peek() else {
            return Ok(TabularResult::default());
        };

        let delimiter = self.delimiter.unwrap_or_else(|| detect_delimiter(first_line));
        let first_fields = tokenize_line(first_line, delimiter);

        let headers = if self.has_header {
            lines.next();
            unique_headers(first_fields)
        } else {
            (0..first_fields.len()).map(|i| format!("column_{}", i)).collect()
        };
        debug!(?delimiter, columns = headers.len(), "parsing delimited text");

        let mut table = TabularResult::new(headers.clone())?;
        let mut dropped = 0;
        for (line_no, line) in lines {
            let fields = tokenize_line(line, delimiter);
            if fields.len() != headers.len() {
                warn!(
                    line = line_no,
                    expected = headers.len(),
                    found = fields.len(),
                    "skipping row with wrong field count"
                );
                dropped += 1;
                continue;
            }

            let row: Row = headers
                .iter()
                .cloned()
                .zip(fields.iter().map(|field| self.inferrer.infer(field)))
                .collect();
            table.push_row(row)?;
        }

        table.metadata.delimiter = Some(delimiter);
        table.metadata.dropped_rows = dropped;
        Ok(table)
    }
}

impl Default for DelimitedParser {
    fn default() -> Self {
        Self::new(ValueInferrer::default())
    }
}
