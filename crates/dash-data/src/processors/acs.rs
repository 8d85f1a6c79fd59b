//! American Community Survey tables
//!
//! ACS exports pair every estimate column (`B01001_001E`) with a margin of
//! error column sharing the base name (`B01001_001M`). Geography comes in a
//! `GEO_ID` column such as `1400000US36055000100`.

use chrono::Utc;
use dash_core::{TabularResult, Value};

use crate::config::LoadOptions;
use crate::DataError;

pub const GEO_ID_COLUMN: &str = "GEO_ID";
pub const GEOID_COLUMN: &str = "GEOID";
pub const TRACT_COLUMN: &str = "tractNumber";
pub const SURVEY_NAME: &str = "ACS 5-Year Estimates";

const GEOID_LEN: usize = 11;
const TRACT_LEN: usize = 6;

/// Trailing 11-digit census GEOID of a `GEO_ID` value
pub fn extract_geoid(geo_id: &str) -> Option<&str> {
    let start = geo_id.len().checked_sub(GEOID_LEN)?;
    let tail = geo_id.get(start..)?;
    tail.bytes().all(|b| b.is_ascii_digit()).then_some(tail)
}

/// Tract code: the last six digits of the GEOID
pub fn extract_tract(geo_id: &str) -> Option<&str> {
    let geoid = extract_geoid(geo_id)?;
    geoid.get(GEOID_LEN - TRACT_LEN..)
}

/// Margin of error as a percentage of the estimate
///
/// `None` when either side is missing or the estimate is zero.
pub fn coefficient_of_variation(estimate: Option<f64>, margin: Option<f64>) -> Option<f64> {
    let estimate = estimate.filter(|e| *e != 0.0)?;
    Some(margin? / estimate * 100.0)
}

/// An estimate column and its derived names
#[derive(Debug, Clone)]
struct EstimateColumn {
    estimate: String,
    margin: Option<String>,
    base: String,
}

impl EstimateColumn {
    fn estimate_out(&self) -> String {
        format!("{}_estimate", self.base)
    }

    fn moe_out(&self) -> String {
        format!("{}_moe", self.base)
    }

    fn cv_out(&self) -> String {
        format!("{}_cv", self.base)
    }
}

fn estimate_columns(headers: &[String]) -> Vec<EstimateColumn> {
    headers
        .iter()
        .filter(|h| !h.contains("NAME"))
        .filter_map(|h| {
            let base = h.strip_suffix('E').filter(|b| !b.is_empty())?;
            let margin = format!("{}M", base);
            Some(EstimateColumn {
                estimate: h.clone(),
                margin: headers.contains(&margin).then_some(margin),
                base: base.to_string(),
            })
        })
        .collect()
}

fn geo_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Split geography identifiers and derive estimate/margin/CV columns
pub fn process(table: TabularResult, _options: &LoadOptions) -> Result<TabularResult, DataError> {
    let has_geo_id = table.has_column(GEO_ID_COLUMN);
    let estimates = estimate_columns(table.headers());

    let mut extra = Vec::new();
    if has_geo_id {
        extra.push(GEOID_COLUMN.to_string());
        extra.push(TRACT_COLUMN.to_string());
    }
    for column in &estimates {
        extra.push(column.estimate_out());
        if column.margin.is_some() {
            extra.push(column.moe_out());
            extra.push(column.cv_out());
        }
    }

    let mut processed = table.map_rows(extra, |_, row| {
        if has_geo_id {
            let geo_id = geo_text(row.get(GEO_ID_COLUMN));
            let geoid = geo_id.as_deref().and_then(extract_geoid).map(str::to_string);
            let tract = geo_id.as_deref().and_then(extract_tract).map(str::to_string);
            row.insert(GEOID_COLUMN.to_string(), Value::from(geoid));
            row.insert(TRACT_COLUMN.to_string(), Value::from(tract));
        }

        for column in &estimates {
            let estimate = row.get(&column.estimate).cloned().unwrap_or(Value::Null);
            let Some(margin_name) = &column.margin else {
                row.insert(column.estimate_out(), estimate);
                continue;
            };
            let margin = row.get(margin_name).cloned().unwrap_or(Value::Null);
            let cv = coefficient_of_variation(estimate.as_f64(), margin.as_f64());
            row.insert(column.estimate_out(), estimate);
            row.insert(column.moe_out(), margin);
            row.insert(column.cv_out(), Value::from(cv));
        }
    })?;

    processed.metadata.survey = Some(SURVEY_NAME.to_string());
    processed.metadata.processed_at = Some(Utc::now());
    Ok(processed)
}
