//! Subcommand handlers

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use arrow::util::pretty::pretty_format_batches;
use tracing::info;

use dash_core::TabularResult;
use dash_data::export::{to_csv_string, to_record_batch};
use dash_data::schema::describe;
use dash_data::{Aggregation, Criteria, DataLoader, LoadOptions, ValueInferrer};

pub async fn load(loader: &DataLoader, path: &str, options: &LoadOptions) -> Result<TabularResult> {
    loader
        .load(path, options)
        .await
        .with_context(|| format!("loading {}", path))
}

/// Split a `COL=VALUE` argument
fn split_pair(arg: &str) -> Result<(&str, &str)> {
    let (column, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("expected COL=VALUE, got {:?}", arg))?;
    if column.is_empty() {
        bail!("missing column name in {:?}", arg);
    }
    Ok((column, value))
}

fn print_table(table: &TabularResult, limit: Option<usize>) -> Result<()> {
    let shown = match limit {
        Some(limit) if limit < table.row_count() => {
            TabularResult::from_rows(table.headers().to_vec(), table.rows()[..limit].to_vec())?
        }
        _ => table.clone(),
    };
    let batch = to_record_batch(&shown)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

pub fn inspect(table: &TabularResult, json: bool, limit: usize) -> Result<()> {
    let limit = limit.min(table.row_count());
    if json {
        let rows = &table.rows()[..limit];
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!(
        "{} rows x {} columns (source: {})",
        table.row_count(),
        table.column_count(),
        table.metadata.source.as_deref().unwrap_or("-"),
    );
    if let Some(delimiter) = table.metadata.delimiter {
        println!("delimiter: {:?}, dropped rows: {}", delimiter, table.metadata.dropped_rows);
    }
    if let Some(survey) = &table.metadata.survey {
        println!("survey: {}", survey);
    }
    if let Some(score) = table.metadata.quality_score {
        println!("non-null cells: {:.1}%", score * 100.0);
    }
    if let Some(geometry) = &table.geometry {
        println!("features: {}", geometry.len());
    }

    println!();
    for column in describe(table) {
        println!(
            "  {:<24} {:<8} nulls={:<6} distinct={}",
            column.name,
            column.kind.name(),
            column.null_count,
            column.distinct_count
        );
    }
    println!();
    print_table(table, Some(limit))
}

pub fn filter(table: &TabularResult, args: &[String]) -> Result<()> {
    let inferrer = ValueInferrer::default();
    let mut criteria = Criteria::new();
    for arg in args {
        let (column, value) = split_pair(arg)?;
        criteria = criteria.eq(column, inferrer.infer(value));
    }

    let filtered = dash_data::filter(table, &criteria)?;
    info!(
        kept = filtered.filtered_row_count,
        of = filtered.original_row_count,
        "rows filtered"
    );
    println!(
        "{} of {} rows match",
        filtered.filtered_row_count, filtered.original_row_count
    );
    print_table(&filtered.table, None)
}

pub fn aggregate(table: &TabularResult, group_by: &[String], args: &[String]) -> Result<()> {
    let mut aggregations = Vec::with_capacity(args.len());
    for arg in args {
        let (column, stat) = split_pair(arg)?;
        aggregations.push((column, stat.parse::<Aggregation>()?));
    }
    let group_by: Vec<&str> = group_by.iter().map(String::as_str).collect();

    let aggregated = dash_data::aggregate(table, &group_by, &aggregations)?;
    println!(
        "{} rows into {} groups",
        aggregated.aggregated_from, aggregated.aggregated_to
    );
    print_table(&aggregated.table, None)
}

pub fn export(table: &TabularResult, out: &Path) -> Result<()> {
    let text = to_csv_string(table)?;
    std::fs::write(out, text).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), rows = table.row_count(), "dataset exported");
    println!("wrote {} rows to {}", table.row_count(), out.display());
    Ok(())
}
