//! Generic delimited-text processing

use dash_core::{TabularResult, Value};

use crate::config::LoadOptions;
use crate::DataError;

pub const ROW_INDEX_COLUMN: &str = "row_index";

/// Number every row with a `row_index` column
pub fn process(table: TabularResult, _options: &LoadOptions) -> Result<TabularResult, DataError> {
    let indexed = table.map_rows([ROW_INDEX_COLUMN], |idx, row| {
        row.insert(ROW_INDEX_COLUMN.to_string(), Value::from(idx));
    })?;
    Ok(indexed)
}
