//! Grouped aggregation

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use dash_core::{Row, TabularResult, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::DataError;

/// Summary statistic computed per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl Aggregation {
    pub const ALL: [Aggregation; 5] = [
        Aggregation::Sum,
        Aggregation::Avg,
        Aggregation::Count,
        Aggregation::Min,
        Aggregation::Max,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Count => "count",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
        }
    }

    /// Apply to the numeric values of one group
    pub fn apply(&self, values: &[f64]) -> Value {
        match self {
            Aggregation::Sum => Value::Number(values.iter().sum()),
            Aggregation::Avg if values.is_empty() => Value::Number(0.0),
            Aggregation::Avg => Value::Number(values.iter().sum::<f64>() / values.len() as f64),
            Aggregation::Count => Value::from(values.len()),
            Aggregation::Min => Value::from(values.iter().copied().reduce(f64::min)),
            Aggregation::Max => Value::from(values.iter().copied().reduce(f64::max)),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Aggregation::ALL
            .into_iter()
            .find(|a| a.name() == lower)
            .ok_or_else(|| DataError::UnknownAggregation(s.to_string()))
    }
}

/// Aggregation output with group bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTable {
    pub table: TabularResult,
    /// Input row count
    pub aggregated_from: usize,
    /// Number of groups
    pub aggregated_to: usize,
}

/// Hashable form of a cell used in group keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Number(u64),
    Bool(bool),
    Date(NaiveDateTime),
    Text(String),
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            // -0.0 and 0.0 share a group
            Value::Number(n) if *n == 0.0 => KeyPart::Number(0.0f64.to_bits()),
            Value::Number(n) => KeyPart::Number(n.to_bits()),
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Date(d) => KeyPart::Date(*d),
            Value::String(s) => KeyPart::Text(s.clone()),
        }
    }
}

struct Group<'a> {
    first: &'a Row,
    rows: Vec<&'a Row>,
}

fn output_name(column: &str, aggregation: Aggregation) -> String {
    format!("{}_{}", column, aggregation.name())
}

/// Group rows by `group_by` and summarise each group
///
/// Groups appear in first-seen order. Each aggregation produces a
/// `<column>_<stat>` column computed over the group's numeric values.
pub fn aggregate(
    table: &TabularResult,
    group_by: &[&str],
    aggregations: &[(&str, Aggregation)],
) -> Result<AggregatedTable, DataError> {
    for column in group_by.iter().chain(aggregations.iter().map(|(c, _)| c)) {
        if !table.has_column(column) {
            return Err(DataError::UnknownColumn(column.to_string()));
        }
    }

    let mut groups: IndexMap<Vec<KeyPart>, Group<'_>> = IndexMap::new();
    for row in table.rows() {
        let key: Vec<KeyPart> = group_by
            .iter()
            .map(|c| row.get(*c).map(KeyPart::from).unwrap_or(KeyPart::Null))
            .collect();
        groups
            .entry(key)
            .or_insert_with(|| Group { first: row, rows: Vec::new() })
            .rows
            .push(row);
    }

    let mut headers: Vec<String> = group_by.iter().map(|c| c.to_string()).collect();
    for (column, aggregation) in aggregations {
        let name = output_name(column, *aggregation);
        if !headers.contains(&name) {
            headers.push(name);
        }
    }

    let mut out = TabularResult::new(headers)?;
    for group in groups.values() {
        let mut row = Row::new();
        for column in group_by {
            let value = group.first.get(*column).cloned().unwrap_or(Value::Null);
            row.insert(column.to_string(), value);
        }
        for (column, aggregation) in aggregations {
            let values: Vec<f64> = group
                .rows
                .iter()
                .filter_map(|r| r.get(*column).and_then(Value::as_f64))
                .collect();
            row.insert(output_name(column, *aggregation), aggregation.apply(&values));
        }
        out.push_row(row)?;
    }
    out.metadata = table.metadata.clone();

    Ok(AggregatedTable {
        aggregated_from: table.row_count(),
        aggregated_to: out.row_count(),
        table: out,
    })
}
