//! Criteria-based row filtering

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dash_core::{TabularResult, Value};

use crate::DataError;

/// Test applied to one column's value
#[derive(Clone)]
pub enum Criterion {
    /// Value equals the literal
    Equals(Value),
    /// Value is one of the literals
    OneOf(Vec<Value>),
    /// Arbitrary predicate
    Predicate(Arc<dyn Fn(&Value) -> bool + Send + Sync>),
}

impl Criterion {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Criterion::Predicate(Arc::new(f))
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Criterion::Equals(expected) => value == expected,
            Criterion::OneOf(allowed) => allowed.contains(value),
            Criterion::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Criterion::OneOf(vs) => f.debug_tuple("OneOf").field(vs).finish(),
            Criterion::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Value> for Criterion {
    fn from(value: Value) -> Self {
        Criterion::Equals(value)
    }
}

impl From<Vec<Value>> for Criterion {
    fn from(values: Vec<Value>) -> Self {
        Criterion::OneOf(values)
    }
}

/// Column criteria combined with logical AND
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    entries: Vec<(String, Criterion)>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, criterion: impl Into<Criterion>) -> Self {
        self.entries.push((column.into(), criterion.into()));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, Criterion::Equals(value.into()))
    }

    pub fn one_of<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with(column, Criterion::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn matching<F>(self, column: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with(column, Criterion::predicate(f))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.entries.iter().map(|(c, k)| (c.as_str(), k))
    }
}

/// Filter output with row bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTable {
    pub table: TabularResult,
    pub filtered_row_count: usize,
    pub original_row_count: usize,
}

/// Keep the rows that satisfy every criterion
///
/// Geometry attached to the table is narrowed to the surviving rows'
/// features.
pub fn filter(table: &TabularResult, criteria: &Criteria) -> Result<FilteredTable, DataError> {
    for (column, _) in criteria.iter() {
        if !table.has_column(column) {
            return Err(DataError::UnknownColumn(column.to_string()));
        }
    }

    let mut filtered = table.empty_like();
    let mut kept = HashSet::new();
    for (idx, row) in table.rows().iter().enumerate() {
        let keep = criteria
            .iter()
            .all(|(column, criterion)| row.get(column).map_or(false, |v| criterion.matches(v)));
        if keep {
            filtered.push_row(row.clone())?;
            kept.insert(idx);
        }
    }

    if let Some(collection) = filtered.geometry.as_mut() {
        if collection.len() == table.row_count() {
            let mut idx = 0;
            collection.features.retain(|_| {
                let keep = kept.contains(&idx);
                idx += 1;
                keep
            });
        } else {
            filtered.geometry = None;
        }
    }

    Ok(FilteredTable {
        filtered_row_count: filtered.row_count(),
        original_row_count: table.row_count(),
        table: filtered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::{GeoFeature, GeoFeatureCollection, Row};

    fn sample() -> TabularResult {
        let rows: Vec<Row> = [("A", 10), ("A", 20), ("B", 5)]
            .into_iter()
            .map(|(g, v)| {
                [("g".to_string(), Value::from(g)), ("v".to_string(), Value::from(v))]
                    .into_iter()
                    .collect()
            })
            .collect();
        TabularResult::from_rows(vec!["g".to_string(), "v".to_string()], rows).unwrap()
    }

    #[test]
    fn test_equality_filter() {
        let out = filter(&sample(), &Criteria::new().eq("g", "A")).unwrap();
        assert_eq!(out.filtered_row_count, 2);
        assert_eq!(out.original_row_count, 3);
        assert!(out.table.rows().iter().all(|r| r["g"] == Value::from("A")));
    }

    #[test]
    fn test_membership_and_predicate_combine() {
        let criteria = Criteria::new()
            .one_of("g", ["A", "B"])
            .matching("v", |v| v.as_f64().map_or(false, |n| n < 15.0));
        let out = filter(&sample(), &criteria).unwrap();
        assert_eq!(out.filtered_row_count, 2);
        assert_eq!(out.table.rows()[0]["v"], Value::Number(10.0));
        assert_eq!(out.table.rows()[1]["v"], Value::Number(5.0));
    }

    #[test]
    fn test_empty_criteria_keeps_everything() {
        let out = filter(&sample(), &Criteria::new()).unwrap();
        assert_eq!(out.filtered_row_count, 3);
        assert_eq!(out.table.headers(), sample().headers());
    }

    #[test]
    fn test_unknown_column() {
        let err = filter(&sample(), &Criteria::new().eq("missing", 1)).unwrap_err();
        assert!(matches!(err, DataError::UnknownColumn(c) if c == "missing"));
    }

    #[test]
    fn test_geometry_narrowed() {
        let mut table = sample();
        let feature = |name: &str| GeoFeature {
            kind: "Feature".to_string(),
            geometry: None,
            properties: Some(
                [("name".to_string(), serde_json::json!(name))].into_iter().collect(),
            ),
            extra: Default::default(),
        };
        table.geometry = Some(GeoFeatureCollection {
            kind: "FeatureCollection".to_string(),
            features: vec![feature("first"), feature("second"), feature("third")],
            extra: Default::default(),
        });

        let out = filter(&table, &Criteria::new().eq("g", "B")).unwrap();
        let features = &out.table.geometry.as_ref().unwrap().features;
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].property("name"), Some(&serde_json::json!("third")));
    }
}
