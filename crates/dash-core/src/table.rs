//! Tabular result model

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoFeatureCollection;
use crate::value::Value;

/// A single record, ordered like the table headers
pub type Row = IndexMap<String, Value>;

/// Errors raised when a row does not fit the table shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("row has {found} fields, expected {expected}")]
    FieldCount { expected: usize, found: usize },

    #[error("row is missing column {0}")]
    MissingColumn(String),

    #[error("duplicate header: {0}")]
    DuplicateHeader(String),
}

/// Provenance recorded while loading and processing a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Path the table was loaded from
    pub source: Option<String>,
    /// Survey name set by the ACS processor
    pub survey: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Share of non-null cells, 0 to 1
    pub quality_score: Option<f64>,
    /// Delimiter used for delimited text
    pub delimiter: Option<char>,
    /// Source lines dropped for having the wrong field count
    pub dropped_rows: usize,
}

/// Headers plus typed rows; every row carries exactly the header keys
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TabularResult {
    headers: Vec<String>,
    rows: Vec<Row>,
    pub metadata: Metadata,
    /// Enriched feature collection when the table came from GeoJSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoFeatureCollection>,
}

impl TabularResult {
    /// Create an empty table with the given headers
    pub fn new(headers: Vec<String>) -> Result<Self, TableError> {
        let mut seen = std::collections::HashSet::with_capacity(headers.len());
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(TableError::DuplicateHeader(header.clone()));
            }
        }
        Ok(Self {
            headers,
            rows: Vec::new(),
            metadata: Metadata::default(),
            geometry: None,
        })
    }

    /// Build a table from rows, checking each against the headers
    pub fn from_rows(headers: Vec<String>, rows: Vec<Row>) -> Result<Self, TableError> {
        let mut table = Self::new(headers)?;
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Iterate the values of one column
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |row| row.get(name))
    }

    /// Append a row; keys must match the headers exactly, in any order
    pub fn push_row(&mut self, mut row: Row) -> Result<(), TableError> {
        if row.len() != self.headers.len() {
            return Err(TableError::FieldCount {
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        let mut ordered = Row::with_capacity(self.headers.len());
        for header in &self.headers {
            match row.swap_remove(header) {
                Some(value) => {
                    ordered.insert(header.clone(), value);
                }
                None => return Err(TableError::MissingColumn(header.clone())),
            }
        }
        self.rows.push(ordered);
        Ok(())
    }

    /// Append a column, filling every existing row with `fill`
    ///
    /// Does nothing if the column already exists.
    pub fn add_column(&mut self, name: &str, fill: Value) {
        if self.has_column(name) {
            return;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.insert(name.to_string(), fill.clone());
        }
    }

    /// Set a single cell; the column must already exist
    pub fn set(&mut self, row_idx: usize, column: &str, value: Value) -> Result<(), TableError> {
        if !self.has_column(column) {
            return Err(TableError::MissingColumn(column.to_string()));
        }
        if let Some(row) = self.rows.get_mut(row_idx) {
            row.insert(column.to_string(), value);
        }
        Ok(())
    }

    /// Append `extra` columns (existing names are skipped) and let `f`
    /// update every row; each row must end up with exactly the header keys
    pub fn map_rows<I, S, F>(self, extra: I, mut f: F) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(usize, &mut Row),
    {
        let mut headers = self.headers;
        for name in extra {
            let name = name.into();
            if !headers.contains(&name) {
                headers.push(name);
            }
        }

        let mut mapped = Self::new(headers)?;
        mapped.metadata = self.metadata;
        mapped.geometry = self.geometry;
        mapped.rows.reserve(self.rows.len());
        for (idx, mut row) in self.rows.into_iter().enumerate() {
            f(idx, &mut row);
            mapped.push_row(row)?;
        }
        Ok(mapped)
    }

    /// Rename headers through `rename`, keeping values in place
    pub fn rename_columns<F>(self, mut rename: F) -> Result<Self, TableError>
    where
        F: FnMut(&str) -> String,
    {
        let new_headers: Vec<String> = self.headers.iter().map(|h| rename(h)).collect();
        let mut renamed = Self::new(new_headers.clone())?;
        renamed.metadata = self.metadata;
        renamed.geometry = self.geometry;
        renamed.rows = self
            .rows
            .into_iter()
            .map(|row| {
                new_headers
                    .iter()
                    .cloned()
                    .zip(row.into_iter().map(|(_, v)| v))
                    .collect()
            })
            .collect();
        Ok(renamed)
    }

    /// Same headers, metadata and geometry, no rows
    pub fn empty_like(&self) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: Vec::new(),
            metadata: self.metadata.clone(),
            geometry: self.geometry.clone(),
        }
    }

    /// Share of non-null cells; an empty table scores 1
    pub fn non_null_ratio(&self) -> f64 {
        let total = self.row_count() * self.column_count();
        if total == 0 {
            return 1.0;
        }
        let filled = self
            .rows
            .iter()
            .flat_map(|row| row.values())
            .filter(|v| !v.is_null())
            .count();
        filled as f64 / total as f64
    }
}
