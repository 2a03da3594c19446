//! # Pre-caching
//!
//! Fetches a byte prefix of a remote resource into the [`CacheStore`] ahead
//! of playback, so the next session for the same key starts from disk.
//!
//! [`PreCacheWorker`] performs one transfer; [`PreCachePool`] runs transfers
//! on a fixed number of permits, deduplicates them by cache key and reports
//! progress on the service [`EventBus`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::HttpClient;
use core_runtime::events::{EventBus, PreCacheEvent, ServiceEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::CacheStore;
use crate::datasource::{CacheDataSource, CacheFlags, DataSource, DataSpec, HttpDataSource};
use crate::error::{PlaybackError, Result};
use crate::source::{parse_uri, Protocol};

/// Default read size of a pre-cache transfer.
pub const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// Parameters of a `preCache` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCacheRequest {
    pub uri: String,
    /// Bytes to fetch from the start of the resource.
    pub pre_cache_size: u64,
    pub max_cache_size: u64,
    pub max_cache_file_size: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub cache_key: Option<String>,
}

impl PreCacheRequest {
    pub fn new(uri: impl Into<String>, pre_cache_size: u64) -> Self {
        Self {
            uri: uri.into(),
            pre_cache_size,
            max_cache_size: 0,
            max_cache_file_size: 0,
            headers: HashMap::new(),
            cache_key: None,
        }
    }

    pub fn with_limits(mut self, max_cache_size: u64, max_cache_file_size: u64) -> Self {
        self.max_cache_size = max_cache_size;
        self.max_cache_file_size = max_cache_file_size;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Key the bytes are stored under: the explicit key, else the URI.
    pub fn key(&self) -> String {
        match self.cache_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => self.uri.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.uri.trim().is_empty() {
            return Err(PlaybackError::InvalidParams("uri is empty".into()));
        }
        if self.pre_cache_size == 0 {
            return Err(PlaybackError::InvalidParams(
                "pre_cache_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Whether `uri` can be pre-cached at all.
pub fn is_pre_cache_supported(uri: &str) -> bool {
    parse_uri(uri).is_ok_and(|url| Protocol::from_scheme(url.scheme()) == Protocol::Http)
}

/// How a pre-cache transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreCacheOutcome {
    Completed { bytes_cached: u64 },
    /// The requested prefix was already on disk.
    AlreadyCached { bytes_cached: u64 },
    /// Protocol without byte access, nothing to do.
    Unsupported,
    /// A transport fault cut the transfer short; what was fetched stays.
    SoftFailure { bytes_cached: u64, message: String },
}

/// Reports the first crossing of every 10% threshold.
#[derive(Debug)]
struct ProgressTracker {
    target: u64,
    last_decile: u8,
}

impl ProgressTracker {
    fn new(target: u64) -> Self {
        Self {
            target,
            last_decile: 0,
        }
    }

    fn update(&mut self, bytes_cached: u64) -> Option<u8> {
        if self.target == 0 {
            return None;
        }
        let percent = (bytes_cached.saturating_mul(100) / self.target).min(100);
        let decile = (percent / 10) as u8;
        if decile > self.last_decile {
            self.last_decile = decile;
            Some(decile * 10)
        } else {
            None
        }
    }
}

/// One pre-cache transfer.
pub struct PreCacheWorker {
    store: Arc<CacheStore>,
    client: Arc<dyn HttpClient>,
    chunk_bytes: usize,
}

impl PreCacheWorker {
    pub fn new(store: Arc<CacheStore>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            store,
            client,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Fetches `[0, pre_cache_size)` through a cache-writing source.
    ///
    /// `on_progress(percent, bytes_cached)` fires at each 10% threshold.
    /// Cancelling `cancel` ends the transfer with
    /// [`PlaybackError::Cancelled`]; spans written so far remain readable.
    #[instrument(skip(self, cancel, on_progress), fields(key = %request.key()))]
    pub async fn run<F>(
        &self,
        request: &PreCacheRequest,
        cancel: CancellationToken,
        mut on_progress: F,
    ) -> Result<PreCacheOutcome>
    where
        F: FnMut(u8, u64) + Send,
    {
        request.validate()?;
        let uri = parse_uri(&request.uri)?;
        if Protocol::from_scheme(uri.scheme()) != Protocol::Http {
            debug!(scheme = uri.scheme(), "Pre-cache not supported for protocol");
            return Ok(PreCacheOutcome::Unsupported);
        }

        let key = request.key();
        let target = request.pre_cache_size;
        let already = self.store.cached_bytes(&key, 0);
        if already >= target {
            debug!(bytes = already, "Prefix already cached");
            return Ok(PreCacheOutcome::AlreadyCached {
                bytes_cached: already,
            });
        }

        let upstream = HttpDataSource::new(Arc::clone(&self.client), request.headers.clone());
        let mut source = CacheDataSource::new(
            Arc::clone(&self.store),
            Box::new(upstream),
            CacheFlags::background(),
        );
        let spec = DataSpec::new(uri)
            .with_key(key)
            .with_range(0, Some(target));

        let mut tracker = ProgressTracker::new(target);
        let mut bytes_cached = 0u64;

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PlaybackError::Cancelled),
            opened = source.open(spec) => opened,
        };
        if let Err(err) = opened {
            source.close().await;
            return soft_or_hard(err, bytes_cached);
        }

        let result = loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break Err(PlaybackError::Cancelled),
                read = source.read(self.chunk_bytes) => read,
            };
            match read {
                Ok(Some(bytes)) => {
                    bytes_cached += bytes.len() as u64;
                    if let Some(percent) = tracker.update(bytes_cached) {
                        on_progress(percent, bytes_cached);
                    }
                }
                Ok(None) => break Ok(PreCacheOutcome::Completed { bytes_cached }),
                Err(err) => break soft_or_hard(err, bytes_cached),
            }
        };
        source.close().await;

        if let Ok(PreCacheOutcome::Completed { bytes_cached }) = &result {
            info!(bytes_cached, "Pre-cache completed");
        }
        result
    }
}

fn soft_or_hard(err: PlaybackError, bytes_cached: u64) -> Result<PreCacheOutcome> {
    if err.is_transport() {
        warn!(error = %err, bytes_cached, "Pre-cache stopped by transport fault");
        Ok(PreCacheOutcome::SoftFailure {
            bytes_cached,
            message: err.to_string(),
        })
    } else {
        Err(err)
    }
}

struct PreCacheTask {
    id: u64,
    uri: String,
    cancel: CancellationToken,
}

/// Bounded pool of pre-cache transfers.
pub struct PreCachePool {
    permits: Arc<Semaphore>,
    tasks: Arc<Mutex<HashMap<String, PreCacheTask>>>,
    events: EventBus,
    shutdown: CancellationToken,
    next_id: AtomicU64,
    chunk_bytes: usize,
}

impl PreCachePool {
    pub fn new(workers: usize, events: EventBus) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            events,
            shutdown: CancellationToken::new(),
            next_id: AtomicU64::new(1),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    /// Queues a transfer. Returns `false` when a transfer for the same cache
    /// key is already queued or running, or when the protocol cannot be
    /// pre-cached.
    pub fn submit(
        &self,
        request: PreCacheRequest,
        store: Arc<CacheStore>,
        client: Arc<dyn HttpClient>,
    ) -> Result<bool> {
        request.validate()?;
        let uri = request.uri.clone();
        let key = request.key();

        if !is_pre_cache_supported(&uri) {
            self.emit(PreCacheEvent::Skipped {
                uri,
                reason: "unsupported protocol".into(),
            });
            return Ok(false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        {
            let mut tasks = self.tasks.lock();
            if tasks.contains_key(&key) {
                drop(tasks);
                debug!(key = %key, "Pre-cache already queued");
                self.emit(PreCacheEvent::Skipped {
                    uri,
                    reason: "already queued".into(),
                });
                return Ok(false);
            }
            tasks.insert(
                key.clone(),
                PreCacheTask {
                    id,
                    uri: uri.clone(),
                    cancel: cancel.clone(),
                },
            );
        }

        let permits = Arc::clone(&self.permits);
        let tasks = Arc::clone(&self.tasks);
        let events = self.events.clone();
        let worker = PreCacheWorker::new(store, client).with_chunk_bytes(self.chunk_bytes);

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };

            let event = match permit {
                None => PreCacheEvent::Cancelled { uri: uri.clone() },
                Some(_permit) => {
                    let _ = events.emit(ServiceEvent::PreCache(PreCacheEvent::Started {
                        uri: uri.clone(),
                        key: key.clone(),
                    }));
                    let progress_events = events.clone();
                    let progress_uri = uri.clone();
                    let outcome = worker
                        .run(&request, cancel.clone(), move |percent, bytes_cached| {
                            let _ = progress_events.emit(ServiceEvent::PreCache(
                                PreCacheEvent::Progress {
                                    uri: progress_uri.clone(),
                                    percent,
                                    bytes_cached,
                                },
                            ));
                        })
                        .await;
                    outcome_event(&uri, outcome)
                }
            };

            {
                let mut tasks = tasks.lock();
                if tasks.get(&key).is_some_and(|task| task.id == id) {
                    tasks.remove(&key);
                }
            }
            let _ = events.emit(ServiceEvent::PreCache(event));
        });

        Ok(true)
    }

    /// Cancels every transfer of `uri`. Returns how many were cancelled.
    pub fn stop(&self, uri: &str) -> usize {
        let uri = uri.trim();
        let tasks = self.tasks.lock();
        let mut stopped = 0;
        for task in tasks.values().filter(|task| task.uri.trim() == uri) {
            task.cancel.cancel();
            stopped += 1;
        }
        if stopped > 0 {
            info!(uri, stopped, "Pre-cache stopped");
        }
        stopped
    }

    /// Cancels every transfer.
    pub fn stop_all(&self) {
        for task in self.tasks.lock().values() {
            task.cancel.cancel();
        }
    }

    /// Transfers queued or running.
    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.tasks.lock().contains_key(key)
    }

    fn emit(&self, event: PreCacheEvent) {
        let _ = self.events.emit(ServiceEvent::PreCache(event));
    }
}

impl Drop for PreCachePool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for PreCachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreCachePool")
            .field("available_permits", &self.permits.available_permits())
            .field("active", &self.active_count())
            .finish()
    }
}

fn outcome_event(uri: &str, outcome: Result<PreCacheOutcome>) -> PreCacheEvent {
    let uri = uri.to_string();
    match outcome {
        Ok(PreCacheOutcome::Completed { bytes_cached })
        | Ok(PreCacheOutcome::SoftFailure { bytes_cached, .. }) => PreCacheEvent::Completed {
            uri,
            bytes_cached,
        },
        Ok(PreCacheOutcome::AlreadyCached { .. }) => PreCacheEvent::Skipped {
            uri,
            reason: "already cached".into(),
        },
        Ok(PreCacheOutcome::Unsupported) => PreCacheEvent::Skipped {
            uri,
            reason: "unsupported protocol".into(),
        },
        Err(PlaybackError::Cancelled) => PreCacheEvent::Cancelled { uri },
        Err(err) => PreCacheEvent::Failed {
            uri,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_thresholds() {
        let mut tracker = ProgressTracker::new(1000);
        assert_eq!(tracker.update(50), None);
        assert_eq!(tracker.update(100), Some(10));
        assert_eq!(tracker.update(150), None);
        assert_eq!(tracker.update(350), Some(30));
        assert_eq!(tracker.update(1000), Some(100));
        assert_eq!(tracker.update(1000), None);
    }

    #[test]
    fn test_request_key_and_validation() {
        let request = PreCacheRequest::new(" https://cdn.example.com/a.mp4 ", 1024);
        assert_eq!(request.key(), "https://cdn.example.com/a.mp4");
        assert_eq!(request.clone().with_cache_key("movie-1").key(), "movie-1");
        assert_eq!(request.clone().with_cache_key("").key(), "https://cdn.example.com/a.mp4");

        assert!(PreCacheRequest::new("", 10).validate().is_err());
        assert!(PreCacheRequest::new("https://a/b", 0).validate().is_err());
    }

    #[test]
    fn test_supported_protocols() {
        assert!(is_pre_cache_supported("https://cdn.example.com/a.m3u8"));
        assert!(!is_pre_cache_supported("rtmp://live.example.com/app"));
        assert!(!is_pre_cache_supported("rtsp://cam/stream"));
        assert!(!is_pre_cache_supported("not a uri"));
    }

    #[test]
    fn test_outcome_events() {
        let soft = outcome_event(
            "u",
            Ok(PreCacheOutcome::SoftFailure {
                bytes_cached: 10,
                message: "timeout".into(),
            }),
        );
        assert_eq!(
            soft,
            PreCacheEvent::Completed {
                uri: "u".into(),
                bytes_cached: 10
            }
        );
        assert_eq!(
            outcome_event("u", Err(PlaybackError::Cancelled)),
            PreCacheEvent::Cancelled { uri: "u".into() }
        );
        assert!(matches!(
            outcome_event("u", Err(PlaybackError::CacheError("disk".into()))),
            PreCacheEvent::Failed { .. }
        ));
    }
}
