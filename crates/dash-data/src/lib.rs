//! Dataset loading, parsing and tabular operations for the dashboards

pub mod cache;
pub mod config;
pub mod export;
pub mod loader;
pub mod ops;
pub mod processors;
pub mod schema;
pub mod sources;

use arrow::error::ArrowError;
use dash_core::{FetchError, TableError};
use thiserror::Error;

// Re-exports
pub use cache::{CacheStats, DataCache};
pub use config::{DatasetSpec, LoadOptions, LoaderConfig, NullConfig, ProcessingType};
pub use loader::DataLoader;
pub use ops::{aggregate, filter, AggregatedTable, Aggregation, Criteria, Criterion, FilteredTable};
pub use processors::ProcessorRegistry;
pub use schema::{ColumnKind, TypeMatcher, ValueInferrer};
pub use sources::{DataFormat, FileFetcher, MemoryFetcher};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to fetch {path}: status {status}")]
    FetchFailure { path: String, status: u16 },

    #[error("Excel files must be converted to CSV format for loading: {0}")]
    ExcelUnsupported(String),

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Invalid JSON table: {0}")]
    InvalidJson(String),

    #[error("Invalid dataset path: {0:?}")]
    InvalidPath(String),

    #[error("Unknown processor: {0}")]
    UnknownProcessor(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    #[error("Table shape error: {0}")]
    Table(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<FetchError> for DataError {
    fn from(error: FetchError) -> Self {
        DataError::FetchFailure {
            path: error.path,
            status: error.status,
        }
    }
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}
