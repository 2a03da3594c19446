//! # Data Sources
//!
//! Byte-level readers the pipeline pulls media through.
//!
//! - [`HttpDataSource`] - ranged reads over an [`HttpClient`]
//! - [`CacheDataSource`] - read-through layer over the [`CacheStore`]
//! - [`FileDataSource`] - local files
//!
//! A [`DataSourceFactory`] describes the chain and creates fresh readers on
//! demand; the host engine opens one reader per request it makes.

use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::{BridgeError, ByteRange, ByteStream, HttpClient, HttpRequest};
use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheStore, CacheWriter};
use crate::error::{PlaybackError, Result};

/// Region of a resource to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSpec {
    pub uri: Url,
    pub position: u64,
    /// Bytes to read; `None` reads to the end of the resource.
    pub length: Option<u64>,
    /// Cache key of the resource.
    pub key: String,
    pub headers: HashMap<String, String>,
}

impl DataSpec {
    pub fn new(uri: Url) -> Self {
        let key = uri.to_string();
        Self {
            uri,
            position: 0,
            length: None,
            key,
            headers: HashMap::new(),
        }
    }

    pub fn with_range(mut self, position: u64, length: Option<u64>) -> Self {
        self.position = position;
        self.length = length;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    fn byte_range(&self) -> Option<ByteRange> {
        match self.length {
            Some(length) => Some(ByteRange::bounded(self.position, self.position + length)),
            None if self.position > 0 => Some(ByteRange::from(self.position)),
            None => None,
        }
    }
}

/// Sequential reader over one [`DataSpec`].
#[async_trait]
pub trait DataSource: Send {
    /// Opens the region. Returns the number of bytes that will be read, when
    /// known.
    async fn open(&mut self, spec: DataSpec) -> Result<Option<u64>>;

    /// Reads at most `max_len` bytes. `None` marks the end of the region.
    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>>;

    async fn close(&mut self);
}

// ============================================================================
// HTTP
// ============================================================================

/// Ranged HTTP reads.
pub struct HttpDataSource {
    client: Arc<dyn HttpClient>,
    default_headers: HashMap<String, String>,
    body: Option<ByteStream>,
    pending: Bytes,
    /// Bytes to drop when the server ignored the range request.
    skip: u64,
    remaining: Option<u64>,
}

impl HttpDataSource {
    pub fn new(client: Arc<dyn HttpClient>, default_headers: HashMap<String, String>) -> Self {
        Self {
            client,
            default_headers,
            body: None,
            pending: Bytes::new(),
            skip: 0,
            remaining: None,
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn open(&mut self, spec: DataSpec) -> Result<Option<u64>> {
        self.close().await;

        let mut request = HttpRequest::get(spec.uri.as_str())
            .headers(self.default_headers.clone())
            .headers(spec.headers.clone());
        if let Some(range) = spec.byte_range() {
            request = request.range(range);
        }

        let response = self.client.open_stream(request).await?;
        if !response.is_success() {
            return Err(BridgeError::HttpStatus {
                status: response.status,
                url: spec.uri.to_string(),
            }
            .into());
        }

        // A 200 answer to a range request carries the whole resource.
        let mut available = response.content_length;
        if response.status == 200 && spec.position > 0 {
            debug!(position = spec.position, "Server ignored range, skipping prefix");
            self.skip = spec.position;
            available = available.map(|len| len.saturating_sub(spec.position));
        }

        self.remaining = match (spec.length, available) {
            (Some(wanted), Some(available)) => Some(wanted.min(available)),
            (Some(wanted), None) => Some(wanted),
            (None, available) => available,
        };
        self.body = Some(response.body);
        Ok(self.remaining)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        if self.remaining == Some(0) || max_len == 0 {
            return Ok(None);
        }

        while self.pending.is_empty() {
            let Some(body) = self.body.as_mut() else {
                return Ok(None);
            };
            match body.next().await {
                Some(Ok(mut chunk)) => {
                    if self.skip > 0 {
                        let drop = (chunk.len() as u64).min(self.skip) as usize;
                        let _ = chunk.split_to(drop);
                        self.skip -= drop as u64;
                    }
                    self.pending = chunk;
                }
                Some(Err(err)) => return Err(err.into()),
                None => {
                    self.body = None;
                    return Ok(None);
                }
            }
        }

        let mut take = self.pending.len().min(max_len);
        if let Some(remaining) = self.remaining {
            take = take.min(remaining as usize);
        }
        let chunk = self.pending.split_to(take);
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= take as u64;
        }
        Ok(Some(chunk))
    }

    async fn close(&mut self) {
        self.body = None;
        self.pending = Bytes::new();
        self.skip = 0;
        self.remaining = None;
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Behavior switches of the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheFlags {
    /// On a cache fault, drop the cache and keep reading from upstream.
    pub ignore_cache_on_error: bool,
    /// Wait for the writer lock of a key instead of reading without
    /// caching when another writer holds it.
    pub block_on_cache: bool,
}

impl CacheFlags {
    /// Flags of pipelines that feed a playing session.
    pub fn playback() -> Self {
        Self {
            ignore_cache_on_error: true,
            block_on_cache: false,
        }
    }

    /// Flags of background pre-cache transfers.
    pub fn background() -> Self {
        Self {
            ignore_cache_on_error: true,
            block_on_cache: true,
        }
    }
}

/// Serves cached spans and fills holes from upstream, writing what it
/// fetched back into the store.
pub struct CacheDataSource {
    store: Arc<CacheStore>,
    upstream: Box<dyn DataSource>,
    flags: CacheFlags,
    spec: Option<DataSpec>,
    writer: Option<CacheWriter>,
    position: u64,
    end: Option<u64>,
    upstream_open: bool,
    upstream_end: Option<u64>,
    bypass_cache: bool,
}

impl CacheDataSource {
    pub fn new(store: Arc<CacheStore>, upstream: Box<dyn DataSource>, flags: CacheFlags) -> Self {
        Self {
            store,
            upstream,
            flags,
            spec: None,
            writer: None,
            position: 0,
            end: None,
            upstream_open: false,
            upstream_end: None,
            bypass_cache: false,
        }
    }

    /// Whether this reader holds the writer lock of its key.
    pub fn is_writing(&self) -> bool {
        self.writer.is_some()
    }

    fn on_cache_error(&mut self, err: PlaybackError) -> Result<()> {
        if !self.flags.ignore_cache_on_error {
            return Err(err);
        }
        warn!(error = %err, "Cache fault, continuing from network");
        self.bypass_cache = true;
        self.writer = None;
        Ok(())
    }

    async fn open_upstream(&mut self) -> Result<()> {
        let Some(spec) = self.spec.clone() else {
            return Err(PlaybackError::Internal("read before open".to_string()));
        };

        let hole_end = if self.bypass_cache {
            self.end
        } else {
            match (self.store.next_span_after(&spec.key, self.position), self.end) {
                (Some(next), Some(end)) => Some(next.min(end)),
                (Some(next), None) => Some(next),
                (None, end) => end,
            }
        };

        let length = hole_end.map(|end| end - self.position);
        self.upstream
            .open(spec.with_range(self.position, length))
            .await?;
        self.upstream_open = true;
        self.upstream_end = hole_end;
        Ok(())
    }

    async fn close_upstream(&mut self) {
        if self.upstream_open {
            self.upstream.close().await;
            self.upstream_open = false;
            self.upstream_end = None;
        }
    }
}

#[async_trait]
impl DataSource for CacheDataSource {
    async fn open(&mut self, spec: DataSpec) -> Result<Option<u64>> {
        self.close().await;

        self.position = spec.position;
        self.end = spec.length.map(|length| spec.position + length);
        self.bypass_cache = false;
        self.writer = if self.flags.block_on_cache {
            Some(self.store.start_write(&spec.key).await)
        } else {
            self.store.try_start_write(&spec.key)
        };
        if self.writer.is_none() {
            debug!(key = %spec.key, "Cache key locked, reading without writing");
        }

        let length = spec.length;
        self.spec = Some(spec);
        Ok(length)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let Some(key) = self.spec.as_ref().map(|spec| spec.key.clone()) else {
            return Err(PlaybackError::Internal("read before open".to_string()));
        };

        loop {
            let mut want = max_len;
            if let Some(end) = self.end {
                if self.position >= end {
                    return Ok(None);
                }
                want = want.min((end - self.position) as usize);
            }
            if want == 0 {
                return Ok(None);
            }

            if !self.bypass_cache && !self.upstream_open {
                match self.store.read(&key, self.position, want).await {
                    Ok(Some(bytes)) if !bytes.is_empty() => {
                        self.position += bytes.len() as u64;
                        return Ok(Some(bytes));
                    }
                    Ok(_) => {}
                    Err(err) => self.on_cache_error(err)?,
                }
            }

            if !self.upstream_open {
                self.open_upstream().await?;
            }

            match self.upstream.read(want).await? {
                Some(bytes) => {
                    if let Some(writer) = self.writer.as_mut() {
                        if let Err(err) = writer.write(self.position, &bytes).await {
                            self.on_cache_error(err)?;
                        }
                    }
                    self.position += bytes.len() as u64;
                    return Ok(Some(bytes));
                }
                None => {
                    let filled_hole = self
                        .upstream_end
                        .is_some_and(|hole_end| self.position >= hole_end);
                    self.close_upstream().await;
                    let at_end = self.end.is_some_and(|end| self.position >= end);
                    if !filled_hole || at_end || self.bypass_cache {
                        return Ok(None);
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        self.close_upstream().await;
        self.writer = None;
        self.spec = None;
    }
}

// ============================================================================
// File
// ============================================================================

/// Local file reads.
#[derive(Default)]
pub struct FileDataSource {
    file: Option<tokio::fs::File>,
    remaining: Option<u64>,
}

impl FileDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn open(&mut self, spec: DataSpec) -> Result<Option<u64>> {
        let path = spec
            .uri
            .to_file_path()
            .map_err(|_| PlaybackError::InvalidUri(spec.uri.to_string()))?;
        let mut file = tokio::fs::File::open(&path).await?;
        let size = file.metadata().await?.len();
        file.seek(SeekFrom::Start(spec.position)).await?;

        let available = size.saturating_sub(spec.position);
        self.remaining = Some(spec.length.map_or(available, |len| len.min(available)));
        self.file = Some(file);
        Ok(self.remaining)
    }

    async fn read(&mut self, max_len: usize) -> Result<Option<Bytes>> {
        let (Some(file), Some(remaining)) = (self.file.as_mut(), self.remaining) else {
            return Ok(None);
        };
        let want = (max_len as u64).min(remaining) as usize;
        if want == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; want];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        self.remaining = Some(remaining - n as u64);
        Ok(Some(Bytes::from(buf)))
    }

    async fn close(&mut self) {
        self.file = None;
        self.remaining = None;
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Recipe for the data source chain of a pipeline.
pub enum DataSourceFactory {
    Http {
        client: Arc<dyn HttpClient>,
        headers: HashMap<String, String>,
    },
    Cached {
        store: Arc<CacheStore>,
        upstream: Box<DataSourceFactory>,
        flags: CacheFlags,
    },
    File,
    /// Handled inside the host engine's RTMP extension; no byte access.
    Rtmp,
    /// Handled inside the host engine's RTSP transport.
    Rtsp,
}

impl DataSourceFactory {
    pub fn create(&self) -> Result<Box<dyn DataSource>> {
        match self {
            DataSourceFactory::Http { client, headers } => Ok(Box::new(HttpDataSource::new(
                Arc::clone(client),
                headers.clone(),
            ))),
            DataSourceFactory::Cached {
                store,
                upstream,
                flags,
            } => Ok(Box::new(CacheDataSource::new(
                Arc::clone(store),
                upstream.create()?,
                *flags,
            ))),
            DataSourceFactory::File => Ok(Box::new(FileDataSource::new())),
            DataSourceFactory::Rtmp | DataSourceFactory::Rtsp => Err(PlaybackError::Engine(
                "stream transport is provided by the media engine".to_string(),
            )),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, DataSourceFactory::Cached { .. })
    }

    /// Cache flags when a cache layer is present.
    pub fn cache_flags(&self) -> Option<CacheFlags> {
        match self {
            DataSourceFactory::Cached { flags, .. } => Some(*flags),
            _ => None,
        }
    }
}

impl fmt::Debug for DataSourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceFactory::Http { headers, .. } => f
                .debug_struct("Http")
                .field("headers", &core_runtime::logging::redact_headers(headers))
                .finish_non_exhaustive(),
            DataSourceFactory::Cached {
                upstream, flags, ..
            } => f
                .debug_struct("Cached")
                .field("upstream", upstream)
                .field("flags", flags)
                .finish_non_exhaustive(),
            DataSourceFactory::File => f.write_str("File"),
            DataSourceFactory::Rtmp => f.write_str("Rtmp"),
            DataSourceFactory::Rtsp => f.write_str("Rtsp"),
        }
    }
}

/// Reads `spec` to the end through `source`, returning the bytes read.
pub async fn drain(source: &mut dyn DataSource, spec: DataSpec, chunk: usize) -> Result<u64> {
    source.open(spec).await?;
    let mut total = 0u64;
    let result = loop {
        match source.read(chunk).await {
            Ok(Some(bytes)) => total += bytes.len() as u64,
            Ok(None) => break Ok(total),
            Err(err) => break Err(err),
        }
    };
    source.close().await;
    result
}
