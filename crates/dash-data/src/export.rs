//! Export loaded tables as CSV text or Arrow record batches

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, StringBuilder, TimestampMillisecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use dash_core::{TabularResult, Value};

use crate::schema::{detect_kind, ColumnKind};
use crate::DataError;

/// Serialize a table as CSV with a header row
///
/// Nulls are written as empty fields.
pub fn to_csv_string(table: &TabularResult) -> Result<String, DataError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if table.column_count() > 0 {
        writer.write_record(table.headers())?;
    }
    for row in table.rows() {
        writer.write_record(
            table
                .headers()
                .iter()
                .map(|h| row.get(h).map(Value::to_string).unwrap_or_default()),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DataError::Csv(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| DataError::Csv(e.to_string()))
}

fn data_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Number => DataType::Float64,
        ColumnKind::Boolean => DataType::Boolean,
        ColumnKind::Date => DataType::Timestamp(TimeUnit::Millisecond, None),
        ColumnKind::Empty | ColumnKind::Text => DataType::Utf8,
    }
}

fn build_column(table: &TabularResult, name: &str, data_type: &DataType) -> ArrayRef {
    match data_type {
        DataType::Float64 => {
            let mut builder = Float64Builder::new();
            for value in table.column(name) {
                builder.append_option(value.as_f64());
            }
            Arc::new(builder.finish())
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::new();
            for value in table.column(name) {
                builder.append_option(value.as_bool());
            }
            Arc::new(builder.finish())
        }
        DataType::Timestamp(_, _) => {
            let mut builder = TimestampMillisecondBuilder::new();
            for value in table.column(name) {
                builder.append_option(value.as_datetime().map(|d| d.and_utc().timestamp_millis()));
            }
            Arc::new(builder.finish())
        }
        _ => {
            let mut builder = StringBuilder::new();
            for value in table.column(name) {
                match value {
                    Value::Null => builder.append_null(),
                    other => builder.append_value(other.to_string()),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

/// Convert a table to a single Arrow record batch
///
/// Columns holding only numbers, booleans or dates (ignoring nulls) get
/// the matching Arrow type; everything else becomes Utf8.
pub fn to_record_batch(table: &TabularResult) -> Result<RecordBatch, DataError> {
    let fields: Vec<Field> = table
        .headers()
        .iter()
        .map(|name| Field::new(name, data_type(detect_kind(table.column(name))), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    if schema.fields().is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns: Vec<ArrayRef> = schema
        .fields()
        .iter()
        .map(|field| build_column(table, field.name(), field.data_type()))
        .collect();

    RecordBatch::try_new(schema, columns).map_err(|e| e.into())
}
