//! Resource fetchers: filesystem and in-memory

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ahash::AHashMap;
use async_trait::async_trait;
use dash_core::{FetchError, ResourceFetcher};
use parking_lot::RwLock;
use tracing::debug;

/// Reads datasets from files under a base directory
pub struct FileFetcher {
    root: PathBuf,
    name: String,
}

impl FileFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root.display().to_string();
        Self { root, name }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative dataset path onto the root, refusing escapes
    fn resolve(&self, path: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes {
            return Err(FetchError::new(path, 400, "path must stay under the base directory"));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ResourceFetcher for FileFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let full_path = self.resolve(path)?;
        debug!(path = %full_path.display(), "reading dataset file");
        tokio::fs::read(&full_path).await.map_err(|e| {
            let status = match e.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::PermissionDenied => 403,
                _ => 500,
            };
            FetchError::new(path, status, e.to_string())
        })
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// In-process resources, counting every fetch
///
/// Useful for embedding pre-bundled datasets and for observing how often a
/// loader actually goes to its source.
#[derive(Default)]
pub struct MemoryFetcher {
    resources: RwLock<AHashMap<String, Vec<u8>>>,
    fetch_count: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch, so concurrent loads overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_resource(self, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&self, path: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.resources.write().insert(path.into(), body.into());
    }

    pub fn remove(&self, path: &str) {
        self.resources.write().remove(path);
    }

    /// Number of fetches issued so far, including failed ones
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.resources
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::new(path, 404, "resource not found"))
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
