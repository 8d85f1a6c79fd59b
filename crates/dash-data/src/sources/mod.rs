pub mod delimited;
pub mod fetch;
pub mod geojson_source;
pub mod json_source;

pub use delimited::{detect_delimiter, tokenize_line, DelimitedParser};
pub use fetch::{FileFetcher, MemoryFetcher};
pub use geojson_source::{feature_table, parse_feature_collection};
pub use json_source::parse_json_table;

use crate::DataError;

/// Source formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    GeoJson,
}

impl DataFormat {
    /// Resolve the format of a dataset path
    ///
    /// Spreadsheet binaries are refused outright; they have to be converted
    /// to CSV or JSON before loading.
    pub fn detect(path: &str) -> Result<Self, DataError> {
        let extension = path.rsplit('.').next().unwrap_or(path).to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "geojson" => Ok(DataFormat::GeoJson),
            "xlsx" | "xls" => Err(DataError::ExcelUnsupported(path.to_string())),
            _ => Err(DataError::UnsupportedFormat(extension)),
        }
    }
}
