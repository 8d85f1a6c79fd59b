//! Core types for the dashboard data layer
//!
//! This crate provides the value model shared by the loader and its
//! consumers, plus the fetch abstraction the loader reads resources through.

pub mod geo;
pub mod table;
pub mod value;

// Re-export commonly used types
pub use geo::{GeoFeature, GeoFeatureCollection};
pub use table::{Metadata, Row, TableError, TabularResult};
pub use value::Value;
pub use data::{FetchError, ResourceFetcher};

pub mod data {
    use thiserror::Error;

    /// Failure reported by a fetcher, carrying a status code in the HTTP range
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    #[error("fetching {path} failed with status {status}: {message}")]
    pub struct FetchError {
        pub path: String,
        pub status: u16,
        pub message: String,
    }

    impl FetchError {
        pub fn new(path: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
            Self {
                path: path.into(),
                status,
                message: message.into(),
            }
        }
    }

    /// Trait for anything that can hand back the raw bytes of a dataset
    #[async_trait::async_trait]
    pub trait ResourceFetcher: Send + Sync {
        /// Fetch the resource at a path relative to the fetcher's root
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError>;

        /// Human readable name of the backing store
        fn source_name(&self) -> &str;
    }
}
