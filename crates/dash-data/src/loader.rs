//! Dataset loader: fetch, parse, post-process and cache

use std::sync::Arc;

use dash_core::{ResourceFetcher, TabularResult};
use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::{debug, error, info};

use crate::cache::{CacheStats, DataCache, RequestCoalescer};
use crate::config::{DatasetSpec, LoadOptions, LoaderConfig, ProcessingType};
use crate::processors::ProcessorRegistry;
use crate::schema::ValueInferrer;
use crate::sources::{feature_table, parse_feature_collection, parse_json_table, DataFormat, DelimitedParser, FileFetcher};
use crate::DataError;

/// Loads tabular datasets and keeps them cached
///
/// A loader owns its cache; loaders built separately never share entries
/// unless they are given the same cache through [`DataLoader::with_cache`].
pub struct DataLoader {
    config: LoaderConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    cache: Arc<DataCache>,
    processors: ProcessorRegistry,
    coalescer: RequestCoalescer,
}

impl DataLoader {
    /// Loader reading files under `config.base_dir`
    pub fn new(config: LoaderConfig) -> Self {
        let fetcher = Arc::new(FileFetcher::new(config.base_dir.clone()));
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(config: LoaderConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cache: Arc::new(DataCache::new()),
            processors: ProcessorRegistry::with_builtins(),
            coalescer: RequestCoalescer::new(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<DataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_processors(mut self, processors: ProcessorRegistry) -> Self {
        self.processors = processors;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<DataCache> {
        &self.cache
    }

    pub fn processors(&self) -> &ProcessorRegistry {
        &self.processors
    }

    /// Load a dataset, serving repeated requests from the cache
    ///
    /// `options.force_refresh` bypasses the cache lookup; the fresh result
    /// still replaces the cached entry.
    pub async fn load(&self, path: &str, options: &LoadOptions) -> Result<TabularResult, DataError> {
        let result = self.load_inner(path, options).await;
        if let Err(e) = &result {
            error!(path, error = %e, "failed to load dataset");
        }
        result
    }

    async fn load_inner(&self, path: &str, options: &LoadOptions) -> Result<TabularResult, DataError> {
        if path.trim().is_empty() {
            return Err(DataError::InvalidPath(path.to_string()));
        }

        let key = options.cache_key(path)?;
        if !options.force_refresh {
            if let Some(cached) = self.cache.get(&key) {
                debug!(path, "serving dataset from cache");
                return Ok(cached);
            }
        }

        let guard = if self.config.coalesce_requests {
            Some(self.coalescer.acquire(&key).await)
        } else {
            None
        };

        // A request ahead of us may have filled the entry while we waited
        let cached = if options.force_refresh || guard.is_none() {
            None
        } else {
            self.cache.get(&key)
        };

        let result = match cached {
            Some(table) => {
                debug!(path, "serving dataset loaded by a concurrent request");
                Ok(table)
            }
            None => self.fetch_and_process(path, options).await.map(|table| {
                self.cache.put(key, table.clone());
                table
            }),
        };

        if guard.is_some() {
            drop(guard);
            self.coalescer.prune().await;
        }
        result
    }

    async fn fetch_and_process(&self, path: &str, options: &LoadOptions) -> Result<TabularResult, DataError> {
        info!(path, source = self.fetcher.source_name(), "loading dataset");
        let format = DataFormat::detect(path)?;
        let fetched = self.fetcher.fetch(path).await?;
        let bytes = strip_bom(&fetched);

        let mut table = match format {
            DataFormat::Csv => {
                let table = self.parse_delimited(bytes, options)?;
                let kind = options.processing_type.unwrap_or(ProcessingType::Csv);
                self.processors.apply(kind, table, options)?
            }
            DataFormat::Json => {
                let table = parse_json_table(bytes)?;
                match options.processing_type {
                    Some(kind) => self.processors.apply(kind, table, options)?,
                    None => table,
                }
            }
            DataFormat::GeoJson => {
                let collection = parse_feature_collection(bytes)?;
                let table = feature_table(collection)?;
                let table = self.processors.apply(ProcessingType::Geojson, table, options)?;
                match options.processing_type {
                    Some(kind) if kind != ProcessingType::Geojson => {
                        self.processors.apply(kind, table, options)?
                    }
                    _ => table,
                }
            }
        };

        table.metadata.source = Some(path.to_string());
        table.metadata.quality_score = Some(table.non_null_ratio());
        info!(
            path,
            rows = table.row_count(),
            columns = table.column_count(),
            "dataset loaded"
        );
        Ok(table)
    }

    fn parse_delimited(&self, bytes: &[u8], options: &LoadOptions) -> Result<TabularResult, DataError> {
        let text = String::from_utf8_lossy(bytes);
        let nulls = self.config.null_config.merged(&options.null_values);
        DelimitedParser::new(ValueInferrer::new(nulls))
            .with_delimiter(options.delimiter)
            .with_header(options.has_header())
            .parse(&text)
    }

    /// Load several datasets concurrently
    ///
    /// Results are keyed by each dataset's name, falling back to its path, in
    /// request order. The first failure fails the whole call.
    pub async fn load_multiple(
        &self,
        specs: &[DatasetSpec],
    ) -> Result<IndexMap<String, TabularResult>, DataError> {
        let loads = specs.iter().map(|spec| async move {
            let table = self.load(&spec.path, &spec.options).await?;
            Ok::<_, DataError>((spec.key().to_string(), table))
        });
        Ok(try_join_all(loads).await?.into_iter().collect())
    }

    /// Drop every cached table
    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("dataset cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drop a leading UTF-8 byte-order mark
fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemoryFetcher;
    use dash_core::Value;
    use std::time::Duration;

    const CSV: &str = "name,value\nA,1\nB,2\n";

    fn loader(fetcher: Arc<MemoryFetcher>) -> DataLoader {
        DataLoader::with_fetcher(LoaderConfig::default(), fetcher)
    }

    #[tokio::test]
    async fn test_repeated_load_served_from_cache() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let loader = loader(fetcher.clone());

        let first = loader.load("data.csv", &LoadOptions::default()).await.unwrap();
        let second = loader.load("data.csv", &LoadOptions::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.fetch_count(), 1);
        assert_eq!(loader.cache_stats().size, 1);
        assert_eq!(loader.cache_stats().keys, vec!["data.csv_{}".to_string()]);
    }

    #[tokio::test]
    async fn test_csv_defaults() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let table = loader(fetcher).load("data.csv", &LoadOptions::default()).await.unwrap();

        assert_eq!(table.headers(), ["name", "value", "row_index"].map(String::from));
        assert_eq!(table.rows()[1]["value"], Value::Number(2.0));
        assert_eq!(table.rows()[1]["row_index"], Value::Number(1.0));
        assert_eq!(table.metadata.source.as_deref(), Some("data.csv"));
        assert_eq!(table.metadata.quality_score, Some(1.0));
    }

    #[tokio::test]
    async fn test_force_refresh_refetches_and_replaces() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let loader = loader(fetcher.clone());
        loader.load("data.csv", &LoadOptions::default()).await.unwrap();

        fetcher.insert("data.csv", "name,value\nC,3\n");
        let refreshed = loader
            .load("data.csv", &LoadOptions::default().with_force_refresh(true))
            .await
            .unwrap();
        assert_eq!(fetcher.fetch_count(), 2);
        assert_eq!(refreshed.row_count(), 1);

        let cached = loader.load("data.csv", &LoadOptions::default()).await.unwrap();
        assert_eq!(cached, refreshed);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_options_change_the_cache_entry() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let loader = loader(fetcher.clone());
        loader.load("data.csv", &LoadOptions::default()).await.unwrap();
        loader
            .load("data.csv", &LoadOptions::default().with_delimiter(','))
            .await
            .unwrap();
        assert_eq!(fetcher.fetch_count(), 2);
        assert_eq!(loader.cache_stats().size, 2);
    }

    #[tokio::test]
    async fn test_rejections_are_not_cached() {
        let fetcher = Arc::new(MemoryFetcher::new());
        let loader = loader(fetcher.clone());

        assert!(matches!(
            loader.load("budget.xlsx", &LoadOptions::default()).await,
            Err(DataError::ExcelUnsupported(_))
        ));
        assert!(matches!(
            loader.load("notes.txt", &LoadOptions::default()).await,
            Err(DataError::UnsupportedFormat(ext)) if ext == "txt"
        ));
        assert!(matches!(
            loader.load("", &LoadOptions::default()).await,
            Err(DataError::InvalidPath(_))
        ));
        assert!(matches!(
            loader.load("missing.csv", &LoadOptions::default()).await,
            Err(DataError::FetchFailure { status: 404, .. })
        ));
        // format checks happen before any fetch
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(loader.cache_stats().keys.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let loader = loader(fetcher.clone());
        loader.load("data.csv", &LoadOptions::default()).await.unwrap();
        loader.clear_cache();
        assert_eq!(loader.cache_stats().size, 0);
        loader.load("data.csv", &LoadOptions::default()).await.unwrap();
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_loads_coalesce() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_latency(Duration::from_millis(20))
                .with_resource("data.csv", CSV),
        );
        let loader = loader(fetcher.clone());
        let options = LoadOptions::default();

        let (a, b, c) = tokio::join!(
            loader.load("data.csv", &options),
            loader.load("data.csv", &options),
            loader.load("data.csv", &options),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(c.is_ok());
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_without_coalescing_duplicate_work() {
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_latency(Duration::from_millis(20))
                .with_resource("data.csv", CSV),
        );
        let loader = DataLoader::with_fetcher(LoaderConfig::default().with_coalescing(false), fetcher.clone());
        let options = LoadOptions::default();

        let (a, b) = tokio::join!(loader.load("data.csv", &options), loader.load("data.csv", &options));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(fetcher.fetch_count(), 2);
        assert_eq!(loader.cache_stats().size, 1);
    }

    #[tokio::test]
    async fn test_unregistered_processor() {
        let fetcher = Arc::new(MemoryFetcher::new().with_resource("data.csv", CSV));
        let loader = loader(fetcher).with_processors(ProcessorRegistry::empty());
        assert!(matches!(
            loader.load("data.csv", &LoadOptions::default()).await,
            Err(DataError::UnknownProcessor(_))
        ));
    }

    #[tokio::test]
    async fn test_byte_order_mark_stripped_before_parsing() {
        let mut acs = UTF8_BOM.to_vec();
        acs.extend_from_slice(b"GEO_ID,NAME,B01003_001E,B01003_001M\n1400000US36055000100,Tract 1,1200,40\n");
        let mut json = UTF8_BOM.to_vec();
        json.extend_from_slice(br#"[{"x": 1}]"#);
        let fetcher = Arc::new(
            MemoryFetcher::new()
                .with_resource("acs.csv", acs)
                .with_resource("rows.json", json),
        );
        let loader = loader(fetcher);

        let options = LoadOptions::default().with_processing(ProcessingType::Acs);
        let table = loader.load("acs.csv", &options).await.unwrap();
        assert_eq!(table.headers()[0], "GEO_ID");
        assert_eq!(table.rows()[0]["GEOID"], Value::from("36055000100"));
        assert_eq!(table.rows()[0]["tractNumber"], Value::from("000100"));

        let table = loader.load("rows.json", &LoadOptions::default()).await.unwrap();
        assert_eq!(table.headers(), ["x".to_string()]);
        assert_eq!(table.rows()[0]["x"], Value::Number(1.0));
    }

    #[test]
    fn test_strip_bom_only_at_start() {
        assert_eq!(strip_bom(b"\xEF\xBB\xBFa,b"), b"a,b");
        assert_eq!(strip_bom(b"a\xEF\xBB\xBF"), b"a\xEF\xBB\xBF");
        assert_eq!(strip_bom(b""), b"");
    }
}
