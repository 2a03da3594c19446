//! Span store
//!
//! Cached bytes live in span files: each span is a contiguous byte range of
//! one key, starting at a recorded position. The index of spans is kept in
//! memory in LRU order and persisted to `index.json` through a temp file and
//! a rename, so a crash never leaves a half-written index behind.
//!
//! Readers never take the writer lock; bytes returned by [`CacheStore::read`]
//! are copied out of the span file, so a concurrent eviction cannot
//! invalidate them.

use std::collections::HashSet;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bridge_traits::Clock;
use bytes::Bytes;
use core_runtime::events::{CacheEvent, EventBus, ServiceEvent};
use core_runtime::logging::strip_path;
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::config::CacheConfig;
use super::stats::CacheStats;
use crate::error::{PlaybackError, Result};

const INDEX_FILE: &str = "index.json";
const INDEX_VERSION: u32 = 1;
const SPAN_EXTENSION: &str = "span";

/// One contiguous cached range of a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpan {
    pub position: u64,
    pub length: u64,
    /// File name relative to the cache directory.
    pub file: String,
}

impl CacheSpan {
    pub fn end(&self) -> u64 {
        self.position + self.length
    }

    fn contains(&self, position: u64) -> bool {
        position >= self.position && position < self.end()
    }
}

/// All spans of one key, sorted by position and never overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub spans: Vec<CacheSpan>,
    pub last_access_ms: i64,
}

impl CacheEntry {
    fn new(key: &str, now_ms: i64) -> Self {
        Self {
            key: key.to_string(),
            spans: Vec::new(),
            last_access_ms: now_ms,
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.spans.iter().map(|span| span.length).sum()
    }

    fn span_at(&self, position: u64) -> Option<&CacheSpan> {
        self.spans.iter().find(|span| span.contains(position))
    }

    /// Bytes readable without a gap starting at `position`.
    fn contiguous_from(&self, position: u64) -> u64 {
        let mut cursor = position;
        for span in &self.spans {
            if span.end() <= cursor {
                continue;
            }
            if span.position > cursor {
                break;
            }
            cursor = span.end();
        }
        cursor - position
    }

    fn next_start_after(&self, position: u64) -> Option<u64> {
        self.spans
            .iter()
            .map(|span| span.position)
            .find(|start| *start > position)
    }

    fn insert_span(&mut self, span: CacheSpan) {
        let index = self
            .spans
            .iter()
            .position(|existing| existing.position > span.position)
            .unwrap_or(self.spans.len());
        self.spans.insert(index, span);
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheIndex {
    version: u32,
    /// Least recently used first.
    entries: Vec<CacheEntry>,
}

struct StoreState {
    entries: LruCache<String, CacheEntry>,
    total_bytes: u64,
    writers: HashSet<String>,
    /// Bumped by `clear()`; writers started before a clear are stale.
    generation: u64,
}

impl StoreState {
    fn empty() -> Self {
        Self {
            entries: LruCache::unbounded(),
            total_bytes: 0,
            writers: HashSet::new(),
            generation: 0,
        }
    }

    fn snapshot(&self) -> CacheIndex {
        CacheIndex {
            version: INDEX_VERSION,
            entries: self
                .entries
                .iter()
                .rev()
                .map(|(_, entry)| entry.clone())
                .filter(|entry| !entry.spans.is_empty())
                .collect(),
        }
    }

    /// Evicts least recently used entries until `needed` more bytes fit.
    /// Keys with an active writer are skipped.
    fn make_room(&mut self, needed: u64, ceiling: u64) -> Option<Vec<CacheEntry>> {
        let mut evicted = Vec::new();
        while self.total_bytes + needed > ceiling {
            let victim = self
                .entries
                .iter()
                .rev()
                .map(|(key, _)| key)
                .find(|key| !self.writers.contains(*key))
                .cloned()?;
            if let Some(entry) = self.entries.pop(&victim) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.total_bytes());
                evicted.push(entry);
            }
        }
        Some(evicted)
    }
}

/// Bounded, evicting on-disk byte store shared by every session.
pub struct CacheStore {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
    released: Notify,
    span_seq: AtomicU64,
    events: Option<EventBus>,
}

impl CacheStore {
    /// Opens the store, loading the persisted index.
    ///
    /// A missing or corrupt index yields an empty cache. Spans whose files
    /// are gone are dropped, and span files the index does not mention are
    /// deleted.
    pub async fn open(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>> {
        Self::open_with_events(config, clock, None).await
    }

    #[instrument(skip_all)]
    pub async fn open_with_events(
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        events: Option<EventBus>,
    ) -> Result<Arc<Self>> {
        config.validate().map_err(PlaybackError::CacheError)?;
        tokio::fs::create_dir_all(&config.directory).await?;

        let index = load_index(&config.directory).await;
        let mut state = StoreState::empty();
        let mut known_files = HashSet::new();

        for mut entry in index.entries {
            let mut spans = Vec::with_capacity(entry.spans.len());
            for mut span in entry.spans.drain(..) {
                let path = config.directory.join(&span.file);
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.len() > 0 => {
                        span.length = span.length.min(meta.len());
                        known_files.insert(span.file.clone());
                        spans.push(span);
                    }
                    _ => debug!(file = %span.file, "Dropping span without backing file"),
                }
            }
            if spans.is_empty() {
                continue;
            }
            entry.spans = spans;
            state.total_bytes += entry.total_bytes();
            state.entries.put(entry.key.clone(), entry);
        }

        remove_orphans(&config.directory, &known_files).await;

        let store = Arc::new(Self {
            span_seq: AtomicU64::new(0),
            clock,
            released: Notify::new(),
            events,
            state: Mutex::new(state),
            config,
        });

        let evicted = {
            let mut state = store.state.lock();
            let ceiling = store.config.max_cache_size_bytes;
            state.make_room(0, ceiling).unwrap_or_default()
        };
        store.discard(evicted).await;
        store.persist_index();

        let stats = store.stats();
        info!(
            dir = %strip_path(&store.config.directory.to_string_lossy()),
            entries = stats.entries,
            total_bytes = stats.total_bytes,
            max_bytes = stats.max_bytes,
            "Cache store opened"
        );
        Ok(store)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Reads up to `max_len` cached bytes of `key` at `position`.
    ///
    /// Returns `None` when `position` is not cached. The entry becomes the
    /// most recently used one.
    pub async fn read(&self, key: &str, position: u64, max_len: usize) -> Result<Option<Bytes>> {
        if max_len == 0 {
            return Ok(Some(Bytes::new()));
        }

        let now = self.clock.unix_timestamp_millis();
        let (path, offset, len) = {
            let mut state = self.state.lock();
            let Some(entry) = state.entries.get_mut(key) else {
                return Ok(None);
            };
            let Some(span) = entry.span_at(position) else {
                return Ok(None);
            };
            let offset = position - span.position;
            let len = (span.length - offset).min(max_len as u64);
            let path = self.config.directory.join(&span.file);
            entry.last_access_ms = now;
            (path, offset, len as usize)
        };

        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PlaybackError::CacheError(err.to_string())),
        };
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| PlaybackError::CacheError(e.to_string()))?;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = file
                .read(&mut buf[filled..])
                .await
                .map_err(|e| PlaybackError::CacheError(e.to_string()))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(Bytes::from(buf)))
    }

    /// Length of the gap-free cached run of `key` starting at `position`.
    pub fn cached_bytes(&self, key: &str, position: u64) -> u64 {
        self.state
            .lock()
            .entries
            .peek(key)
            .map_or(0, |entry| entry.contiguous_from(position))
    }

    /// Start of the first cached span of `key` beyond `position`.
    pub fn next_span_after(&self, key: &str, position: u64) -> Option<u64> {
        self.state
            .lock()
            .entries
            .peek(key)
            .and_then(|entry| entry.next_start_after(position))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains(key)
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.state.lock().writers.contains(key)
    }

    /// Takes the writer lock of `key` if nobody holds it.
    pub fn try_start_write(self: &Arc<Self>, key: &str) -> Option<CacheWriter> {
        let mut state = self.state.lock();
        if !state.writers.insert(key.to_string()) {
            return None;
        }
        Some(CacheWriter {
            store: Arc::clone(self),
            key: key.to_string(),
            generation: state.generation,
            tail: None,
        })
    }

    /// Waits for the writer lock of `key`.
    pub async fn start_write(self: &Arc<Self>, key: &str) -> CacheWriter {
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            if let Some(writer) = self.try_start_write(key) {
                return writer;
            }
            released.await;
        }
    }

    /// Drops every span of `key`. Returns false when the key is locked.
    pub async fn remove(&self, key: &str) -> bool {
        let entry = {
            let mut state = self.state.lock();
            if state.writers.contains(key) {
                return false;
            }
            let entry = state.entries.pop(key);
            if let Some(entry) = &entry {
                state.total_bytes = state.total_bytes.saturating_sub(entry.total_bytes());
            }
            entry
        };
        if let Some(entry) = entry {
            remove_span_files(&self.config.directory, &entry).await;
            self.persist_index();
        }
        true
    }

    /// Deletes the cache directory and starts over empty.
    ///
    /// Writers holding a lock across the clear fail their next write.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.entries.clear();
            state.total_bytes = 0;
            state.generation += 1;
        }

        match tokio::fs::remove_dir_all(&self.config.directory).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(PlaybackError::ClearCache(err.to_string())),
        }
        tokio::fs::create_dir_all(&self.config.directory)
            .await
            .map_err(|e| PlaybackError::ClearCache(e.to_string()))?;

        info!("Cache cleared");
        if let Some(events) = &self.events {
            let _ = events.emit(ServiceEvent::Cache(CacheEvent::Cleared));
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            spans: state.entries.iter().map(|(_, e)| e.spans.len()).sum(),
            total_bytes: state.total_bytes,
            max_bytes: self.config.max_cache_size_bytes,
            locked_keys: state.writers.len(),
        }
    }

    fn span_file_name(&self, key: &str, position: u64) -> String {
        let seq = self.span_seq.fetch_add(1, Ordering::Relaxed);
        let stamp = self.clock.unix_timestamp_millis();
        format!(
            "{}.{}.{}-{}.{}",
            hash_key(key),
            position,
            stamp,
            seq,
            SPAN_EXTENSION
        )
    }

    async fn discard(&self, evicted: Vec<CacheEntry>) {
        for entry in evicted {
            let bytes = entry.total_bytes();
            debug!(key = %entry.key, bytes, "Evicted cache entry");
            remove_span_files(&self.config.directory, &entry).await;
            if let Some(events) = &self.events {
                let _ = events.emit(ServiceEvent::Cache(CacheEvent::Evicted {
                    key: entry.key,
                    bytes,
                }));
            }
        }
    }

    fn persist_index(&self) {
        let snapshot = self.state.lock().snapshot();
        if let Err(err) = write_index(&self.config.directory, &snapshot) {
            warn!(error = %err, "Failed to persist cache index");
        }
    }

    fn release(&self, key: &str) {
        {
            let mut state = self.state.lock();
            state.writers.remove(key);
            if state
                .entries
                .peek(key)
                .is_some_and(|entry| entry.spans.is_empty())
            {
                state.entries.pop(key);
            }
        }
        self.persist_index();
        self.released.notify_waiters();
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Span currently being appended to.
#[derive(Debug, Clone)]
struct Tail {
    file: String,
    end: u64,
    length: u64,
}

/// Exclusive writer for one key.
///
/// Dropping the writer releases the key and persists the index.
pub struct CacheWriter {
    store: Arc<CacheStore>,
    key: String,
    generation: u64,
    tail: Option<Tail>,
}

impl CacheWriter {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Stores `data` at `position`.
    ///
    /// Bytes already cached are skipped. Writing rolls over to a new span
    /// file when the position is not contiguous with the current span or
    /// the span reached the configured file size.
    pub async fn write(&mut self, position: u64, data: &[u8]) -> Result<()> {
        let mut position = position;
        let mut data = data;

        while !data.is_empty() {
            let (skip, limit) = {
                let state = self.store.state.lock();
                match state.entries.peek(&self.key) {
                    Some(entry) => {
                        let skip = entry.contiguous_from(position);
                        let limit = entry
                            .next_start_after(position + skip)
                            .map(|next| next - position - skip);
                        (skip, limit)
                    }
                    None => (0, None),
                }
            };

            if skip >= data.len() as u64 {
                return Ok(());
            }
            if skip > 0 {
                self.tail = None;
                position += skip;
                data = &data[skip as usize..];
            }

            let max_file = self.store.config.max_file_size_bytes;
            let room_in_tail = match &self.tail {
                Some(tail) if tail.end == position && tail.length < max_file => {
                    max_file - tail.length
                }
                _ => max_file,
            };
            let mut take = (data.len() as u64).min(room_in_tail);
            if let Some(limit) = limit {
                take = take.min(limit);
            }

            self.append(position, &data[..take as usize]).await?;
            position += take;
            data = &data[take as usize..];
        }
        Ok(())
    }

    async fn append(&mut self, position: u64, chunk: &[u8]) -> Result<()> {
        let needed = chunk.len() as u64;
        let ceiling = self.store.config.max_cache_size_bytes;
        if needed > ceiling {
            return Err(PlaybackError::CacheFull { needed, ceiling });
        }

        // The tail is restored only once the chunk is indexed, so an
        // interrupted append never gets extended.
        let tail = self.tail.take();
        let continued = tail.filter(|tail| {
            tail.end == position && tail.length < self.store.config.max_file_size_bytes
        });
        let file_name = match &continued {
            Some(tail) => tail.file.clone(),
            None => self.store.span_file_name(&self.key, position),
        };

        let (reservation, evicted) = {
            let mut state = self.store.state.lock();
            if state.generation != self.generation {
                return Err(PlaybackError::CacheError("cache cleared during write".into()));
            }
            let evicted = state
                .make_room(needed, ceiling)
                .ok_or(PlaybackError::CacheFull { needed, ceiling })?;
            state.total_bytes += needed;
            let reservation = Reservation {
                store: Arc::clone(&self.store),
                generation: self.generation,
                bytes: needed,
                path: self.store.config.directory.join(&file_name),
                previous_len: continued.as_ref().map(|tail| tail.length),
                committed: false,
            };
            (reservation, evicted)
        };
        self.store.discard(evicted).await;
        self.write_file(&file_name, chunk).await?;

        let now = self.store.clock.unix_timestamp_millis();
        let mut state = self.store.state.lock();
        if state.generation != self.generation {
            drop(state);
            return Err(PlaybackError::CacheError("cache cleared during write".into()));
        }

        if !state.entries.contains(&self.key) {
            state
                .entries
                .put(self.key.clone(), CacheEntry::new(&self.key, now));
        }
        if let Some(entry) = state.entries.get_mut(&self.key) {
            entry.last_access_ms = now;
            if continued.is_some() {
                if let Some(span) = entry.spans.iter_mut().find(|s| s.file == file_name) {
                    span.length += needed;
                }
            } else {
                entry.insert_span(CacheSpan {
                    position,
                    length: needed,
                    file: file_name.clone(),
                });
            }
        }
        reservation.commit();
        drop(state);

        let length = continued.map_or(needed, |tail| tail.length + needed);
        self.tail = Some(Tail {
            file: file_name,
            end: position + needed,
            length,
        });
        Ok(())
    }

    async fn write_file(&self, file_name: &str, chunk: &[u8]) -> Result<()> {
        let path = self.store.config.directory.join(file_name);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| PlaybackError::CacheError(e.to_string()))?;
        file.write_all(chunk)
            .await
            .map_err(|e| PlaybackError::CacheError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| PlaybackError::CacheError(e.to_string()))?;
        Ok(())
    }
}

/// Bytes counted against the ceiling for a chunk that is not indexed yet.
///
/// Dropped without [`commit`](Self::commit), for instance when the write
/// future is cancelled, it returns the bytes and undoes the file change.
struct Reservation {
    store: Arc<CacheStore>,
    generation: u64,
    bytes: u64,
    path: PathBuf,
    /// Length of the span file before the write; `None` for a new file.
    previous_len: Option<u64>,
    committed: bool,
}

impl Reservation {
    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        {
            let mut state = self.store.state.lock();
            if state.generation == self.generation {
                state.total_bytes = state.total_bytes.saturating_sub(self.bytes);
            }
        }
        let undo = match self.previous_len {
            Some(len) => std::fs::OpenOptions::new()
                .write(true)
                .open(&self.path)
                .and_then(|file| file.set_len(len)),
            None => std::fs::remove_file(&self.path),
        };
        match undo {
            Ok(()) => debug!(bytes = self.bytes, "Rolled back unfinished cache write"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(error = %err, "Failed to roll back cache write"),
        }
    }
}

impl Drop for CacheWriter {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

impl std::fmt::Debug for CacheWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriter").field("key", &self.key).finish()
    }
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn load_index(directory: &Path) -> CacheIndex {
    let empty = || CacheIndex {
        version: INDEX_VERSION,
        entries: Vec::new(),
    };
    let raw = match tokio::fs::read(directory.join(INDEX_FILE)).await {
        Ok(raw) => raw,
        Err(_) => return empty(),
    };
    match serde_json::from_slice::<CacheIndex>(&raw) {
        Ok(index) if index.version == INDEX_VERSION => index,
        Ok(index) => {
            warn!(version = index.version, "Ignoring cache index with unknown version");
            empty()
        }
        Err(err) => {
            warn!(error = %err, "Cache index is corrupt, starting empty");
            empty()
        }
    }
}

fn write_index(directory: &Path, index: &CacheIndex) -> std::io::Result<()> {
    let path = directory.join(INDEX_FILE);
    let temp_path = path.with_extension("tmp");
    let bytes = serde_json::to_vec(index)?;
    std::fs::write(&temp_path, bytes)?;
    std::fs::rename(&temp_path, &path)
}

async fn remove_orphans(directory: &Path, known: &HashSet<String>) {
    let Ok(mut dir) = tokio::fs::read_dir(directory).await else {
        return;
    };
    while let Ok(Some(item)) = dir.next_entry().await {
        let path: PathBuf = item.path();
        let name = item.file_name().to_string_lossy().into_owned();
        let orphan_span = path.extension().is_some_and(|ext| ext == SPAN_EXTENSION)
            && !known.contains(&name);
        let stale_temp = path.extension().is_some_and(|ext| ext == "tmp");
        if orphan_span || stale_temp {
            debug!(file = %name, "Removing orphan cache file");
            let _ = tokio::fs::remove_file(&path).await;
        }
    }
}

async fn remove_span_files(directory: &Path, entry: &CacheEntry) {
    for span in &entry.spans {
        if let Err(err) = tokio::fs::remove_file(directory.join(&span.file)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(file = %span.file, error = %err, "Failed to remove span file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(spans: &[(u64, u64)]) -> CacheEntry {
        CacheEntry {
            key: "k".into(),
            spans: spans
                .iter()
                .map(|(position, length)| CacheSpan {
                    position: *position,
                    length: *length,
                    file: format!("{}.span", position),
                })
                .collect(),
            last_access_ms: 0,
        }
    }

    #[test]
    fn test_contiguous_from() {
        let e = entry(&[(0, 10), (10, 5), (20, 5)]);
        assert_eq!(e.contiguous_from(0), 15);
        assert_eq!(e.contiguous_from(12), 3);
        assert_eq!(e.contiguous_from(15), 0);
        assert_eq!(e.contiguous_from(22), 3);
        assert_eq!(e.total_bytes(), 20);
    }

    #[test]
    fn test_next_start_after() {
        let e = entry(&[(0, 10), (20, 5)]);
        assert_eq!(e.next_start_after(10), Some(20));
        assert_eq!(e.next_start_after(20), None);
    }

    #[test]
    fn test_insert_span_keeps_order() {
        let mut e = entry(&[(0, 10), (30, 5)]);
        e.insert_span(CacheSpan {
            position: 12,
            length: 3,
            file: "x".into(),
        });
        let positions: Vec<u64> = e.spans.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 12, 30]);
    }

    #[test]
    fn test_hash_key_is_stable_hex() {
        let hash = hash_key("https://cdn.example.com/a.mp4");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_key("https://cdn.example.com/a.mp4"));
        assert_ne!(hash, hash_key("https://cdn.example.com/b.mp4"));
    }

    #[test]
    fn test_make_room_skips_locked_keys() {
        let mut state = StoreState::empty();
        let mut a = entry(&[(0, 40)]);
        a.key = "a".into();
        let mut b = entry(&[(0, 40)]);
        b.key = "b".into();
        state.entries.put("a".into(), a);
        state.entries.put("b".into(), b);
        state.total_bytes = 80;
        state.writers.insert("a".into());

        let evicted = state.make_room(30, 100).unwrap();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].key, "b");
        assert_eq!(state.total_bytes, 40);

        assert!(state.make_room(70, 100).is_none());
    }
}
