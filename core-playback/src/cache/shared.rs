//! Process-wide cache handle
//!
//! The store is opened on first use with the limits of the request that
//! needed it; later requests share that store whatever limits they ask for.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::Clock;
use core_runtime::events::{CacheEvent, EventBus, ServiceEvent};
use tokio::sync::OnceCell;
use tracing::info;

use super::config::{CacheConfig, DEFAULT_MAX_CACHE_SIZE, DEFAULT_MAX_FILE_SIZE};
use super::store::CacheStore;
use crate::error::{PlaybackError, Result};

/// Lazily opened [`CacheStore`] shared by sessions and pre-cache jobs.
pub struct SharedCache {
    directory: PathBuf,
    clock: Arc<dyn Clock>,
    events: Option<EventBus>,
    store: OnceCell<Arc<CacheStore>>,
}

impl SharedCache {
    pub fn new(directory: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            directory: directory.into(),
            clock,
            events: None,
            store: OnceCell::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The store, if something already opened it.
    pub fn get(&self) -> Option<Arc<CacheStore>> {
        self.store.get().cloned()
    }

    /// Returns the store, opening it with these limits if needed. Zero
    /// limits fall back to the defaults.
    pub async fn get_or_open(&self, max_cache_size: u64, max_file_size: u64) -> Result<Arc<CacheStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let config = CacheConfig::new(&self.directory)
                    .with_max_size(non_zero_or(max_cache_size, DEFAULT_MAX_CACHE_SIZE))
                    .with_max_file_size(non_zero_or(max_file_size, DEFAULT_MAX_FILE_SIZE));
                CacheStore::open_with_events(config, Arc::clone(&self.clock), self.events.clone())
                    .await
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// Empties the cache. Works whether or not the store was opened.
    pub async fn clear(&self) -> Result<()> {
        if let Some(store) = self.store.get() {
            return store.clear().await;
        }

        match tokio::fs::remove_dir_all(&self.directory).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(PlaybackError::ClearCache(err.to_string())),
        }
        info!("Cache directory removed");
        if let Some(events) = &self.events {
            let _ = events.emit(ServiceEvent::Cache(CacheEvent::Cleared));
        }
        Ok(())
    }
}

fn non_zero_or(value: u64, fallback: u64) -> u64 {
    if value == 0 {
        fallback
    } else {
        value
    }
}

impl std::fmt::Debug for SharedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCache")
            .field("directory", &self.directory)
            .field("opened", &self.store.initialized())
            .finish()
    }
}
