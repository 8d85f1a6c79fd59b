//! Named post-processing steps run after parsing

pub mod acs;
pub mod generic;
pub mod geo;
pub mod spreadsheet;

use ahash::AHashMap;
use dash_core::TabularResult;

use crate::config::{LoadOptions, ProcessingType};
use crate::DataError;

/// A post-processing step
pub type ProcessorFn = fn(TabularResult, &LoadOptions) -> Result<TabularResult, DataError>;

/// Maps each [`ProcessingType`] to the function that implements it
#[derive(Clone)]
pub struct ProcessorRegistry {
    processors: AHashMap<ProcessingType, ProcessorFn>,
}

impl ProcessorRegistry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            processors: AHashMap::new(),
        }
    }

    /// The built-in processors for every processing type
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register_kind(ProcessingType::Csv, generic::process);
        registry.register_kind(ProcessingType::Excel, spreadsheet::process);
        registry.register_kind(ProcessingType::Geojson, geo::process);
        registry.register_kind(ProcessingType::Acs, acs::process);
        registry
    }

    /// Register by name; names outside the known processing types are refused
    pub fn register(&mut self, name: &str, processor: ProcessorFn) -> Result<(), DataError> {
        let kind: ProcessingType = name.parse()?;
        self.register_kind(kind, processor);
        Ok(())
    }

    pub fn register_kind(&mut self, kind: ProcessingType, processor: ProcessorFn) {
        self.processors.insert(kind, processor);
    }

    pub fn contains(&self, kind: ProcessingType) -> bool {
        self.processors.contains_key(&kind)
    }

    /// Run the processor registered for `kind`
    pub fn apply(
        &self,
        kind: ProcessingType,
        table: TabularResult,
        options: &LoadOptions,
    ) -> Result<TabularResult, DataError> {
        let processor = self
            .processors
            .get(&kind)
            .ok_or_else(|| DataError::UnknownProcessor(kind.name().to_string()))?;
        processor(table, options)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
