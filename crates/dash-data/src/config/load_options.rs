//! Per-request load options

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::DataError;

/// Named post-processing step applied after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingType {
    /// Generic delimited text, adds `row_index`
    Csv,
    /// Spreadsheet export cleanup of header names
    Excel,
    /// Feature ids and polygon areas for GeoJSON
    Geojson,
    /// American Community Survey estimate/margin pairs
    Acs,
}

impl ProcessingType {
    pub const ALL: [ProcessingType; 4] = [
        ProcessingType::Csv,
        ProcessingType::Excel,
        ProcessingType::Geojson,
        ProcessingType::Acs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProcessingType::Csv => "csv",
            ProcessingType::Excel => "excel",
            ProcessingType::Geojson => "geojson",
            ProcessingType::Acs => "acs",
        }
    }
}

impl fmt::Display for ProcessingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessingType {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessingType::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DataError::UnknownProcessor(s.to_string()))
    }
}

/// Options recognised by [`crate::DataLoader::load`]
///
/// Everything except `force_refresh` is part of the cache key, so a forced
/// reload replaces the entry that ordinary loads of the same request read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    #[serde(skip)]
    pub force_refresh: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,

    /// Defaults to true when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_header: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_type: Option<ProcessingType>,

    /// Extra tokens treated as null on top of the loader defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub null_values: Vec<String>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = Some(has_header);
        self
    }

    pub fn with_processing(mut self, kind: ProcessingType) -> Self {
        self.processing_type = Some(kind);
        self
    }

    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn has_header(&self) -> bool {
        self.has_header.unwrap_or(true)
    }

    /// Cache key: the path followed by the serialized options
    pub fn cache_key(&self, path: &str) -> Result<String, DataError> {
        let serialized = serde_json::to_string(self)
            .map_err(|e| DataError::Config(e.to_string()))?;
        Ok(format!("{}_{}", path, serialized))
    }
}

/// One entry of a [`crate::DataLoader::load_multiple`] request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub path: String,
    #[serde(default)]
    pub options: LoadOptions,
    #[serde(default)]
    pub name: Option<String>,
}

impl DatasetSpec {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: LoadOptions::default(),
            name: None,
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name the result is reported under: the explicit name, else the path
    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }
}

impl From<&str> for DatasetSpec {
    fn from(path: &str) -> Self {
        DatasetSpec::new(path)
    }
}

impl From<String> for DatasetSpec {
    fn from(path: String) -> Self {
        DatasetSpec::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_type_parse() {
        assert_eq!("acs".parse::<ProcessingType>().unwrap(), ProcessingType::Acs);
        assert_eq!("GeoJSON".parse::<ProcessingType>().unwrap(), ProcessingType::Geojson);
        assert!(matches!(
            "shapefile".parse::<ProcessingType>(),
            Err(DataError::UnknownProcessor(name)) if name == "shapefile"
        ));
    }

    #[test]
    fn test_cache_key_ignores_force_refresh() {
        let plain = LoadOptions::new().with_delimiter(';');
        let forced = plain.clone().with_force_refresh(true);
        assert_eq!(
            plain.cache_key("a.csv").unwrap(),
            forced.cache_key("a.csv").unwrap()
        );
        assert_eq!(plain.cache_key("a.csv").unwrap(), r#"a.csv_{"delimiter":";"}"#);
    }

    #[test]
    fn test_cache_key_distinguishes_options() {
        let a = LoadOptions::new().with_processing(ProcessingType::Acs);
        let b = LoadOptions::new();
        assert_ne!(a.cache_key("x.csv").unwrap(), b.cache_key("x.csv").unwrap());
        assert_eq!(b.cache_key("x.csv").unwrap(), "x.csv_{}");
    }

    #[test]
    fn test_dataset_spec_key() {
        assert_eq!(DatasetSpec::from("a.csv").key(), "a.csv");
        assert_eq!(DatasetSpec::new("a.csv").named("income").key(), "income");
    }

    #[test]
    fn test_options_deserialize() {
        let options: LoadOptions =
            serde_json::from_str(r#"{"hasHeader": false, "processingType": "acs"}"#).unwrap();
        assert!(!options.has_header());
        assert_eq!(options.processing_type, Some(ProcessingType::Acs));
        assert!(!options.force_refresh);
    }
}
