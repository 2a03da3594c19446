//! # Source Pipelines
//!
//! A [`Pipeline`] is the recipe the host engine plays from: which demuxer
//! family to use, how bytes are fetched, and per-format tuning. Building a
//! pipeline performs no I/O.
//!
//! ```text
//!  HLS / DASH / SS       Progressive            RTSP          RTMP
//!  segment fetchers      generic demuxer        own transport engine extension
//!        │                    │
//!        └──────┬─────────────┘
//!               ▼
//!     [CacheDataSource]?  (HTTP only, when caching was requested)
//!               ▼
//!        HttpDataSource ── SelectedClient (standard | high-performance)
//! ```

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::EngineKind;
use tracing::debug;

use crate::cache::CacheStore;
use crate::datasource::{CacheFlags, DataSourceFactory};
use crate::error::{PlaybackError, Result};
use crate::network::SelectedClient;
use crate::source::{ContentFormat, DrmConfig, Protocol, SourceDescriptor};

/// Retry policy handed to the HLS loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadErrorPolicy {
    pub manifest_retries: u32,
    pub segment_retries: u32,
    pub retry_delay: Duration,
}

impl Default for LoadErrorPolicy {
    fn default() -> Self {
        Self {
            manifest_retries: 3,
            segment_retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Live-edge latency targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveConfiguration {
    pub target_offset_ms: u64,
    pub min_offset_ms: u64,
    pub max_offset_ms: u64,
    pub min_playback_speed: f32,
    pub max_playback_speed: f32,
}

impl Default for LiveConfiguration {
    fn default() -> Self {
        Self {
            target_offset_ms: 8_000,
            min_offset_ms: 4_000,
            max_offset_ms: 20_000,
            min_playback_speed: 0.97,
            max_playback_speed: 1.03,
        }
    }
}

/// RTSP transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtspOptions {
    pub timeout: Duration,
    pub force_tcp: bool,
}

impl Default for RtspOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(8_000),
            force_tcp: false,
        }
    }
}

/// Demuxer family and its tuning.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineKind {
    Hls {
        load_error_policy: LoadErrorPolicy,
        allow_chunkless_preparation: bool,
        live: Option<LiveConfiguration>,
    },
    Dash,
    SmoothStreaming,
    Rtsp(RtspOptions),
    Progressive {
        constant_bitrate_seeking: bool,
    },
}

impl PipelineKind {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineKind::Hls { .. } => "hls",
            PipelineKind::Dash => "dash",
            PipelineKind::SmoothStreaming => "smooth_streaming",
            PipelineKind::Rtsp(_) => "rtsp",
            PipelineKind::Progressive { .. } => "progressive",
        }
    }
}

/// DRM session settings attached to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrmSession {
    Widevine {
        license_url: String,
        headers: std::collections::HashMap<String, String>,
        multi_session: bool,
        play_clear_without_keys: bool,
    },
    ClearKey {
        key: String,
    },
}

impl From<&DrmConfig> for DrmSession {
    fn from(config: &DrmConfig) -> Self {
        match config {
            DrmConfig::Widevine {
                license_url,
                headers,
            } => DrmSession::Widevine {
                license_url: license_url.clone(),
                headers: headers.clone(),
                multi_session: false,
                play_clear_without_keys: true,
            },
            DrmConfig::ClearKey { key } => DrmSession::ClearKey { key: key.clone() },
        }
    }
}

/// Composed source for one descriptor.
#[derive(Debug)]
pub struct Pipeline {
    pub kind: PipelineKind,
    pub descriptor: Arc<SourceDescriptor>,
    pub data_source: DataSourceFactory,
    /// Engine behind the HTTP client; `None` for non-HTTP sources.
    pub engine: Option<EngineKind>,
    pub clip_end_ms: Option<u64>,
    pub drm: Option<DrmSession>,
}

impl Pipeline {
    pub fn is_cached(&self) -> bool {
        self.data_source.is_cached()
    }

    pub fn uses_high_performance_engine(&self) -> bool {
        self.engine == Some(EngineKind::HighPerformance)
    }
}

/// Composes pipelines.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Builds the pipeline for `descriptor`.
    ///
    /// `client` is required for HTTP sources. The cache layer is added only
    /// for HTTP sources that requested caching and only when a store is
    /// given; `block_on_cache` controls whether readers wait for a busy
    /// writer lock.
    pub fn build(
        descriptor: Arc<SourceDescriptor>,
        client: Option<SelectedClient>,
        cache: Option<Arc<CacheStore>>,
        block_on_cache: bool,
    ) -> Result<Pipeline> {
        let kind = Self::kind_for(&descriptor)?;

        let (data_source, engine) = match descriptor.protocol {
            Protocol::Rtmp => (DataSourceFactory::Rtmp, None),
            Protocol::Rtsp => (DataSourceFactory::Rtsp, None),
            Protocol::Other => (DataSourceFactory::File, None),
            Protocol::Http => {
                let selected = client.ok_or_else(|| {
                    PlaybackError::InvalidParams("an HTTP source needs a network client".into())
                })?;
                let http = DataSourceFactory::Http {
                    client: selected.client,
                    headers: descriptor.headers.clone(),
                };
                let data_source = match (descriptor.cache, cache) {
                    (Some(_), Some(store)) => DataSourceFactory::Cached {
                        store,
                        upstream: Box::new(http),
                        flags: CacheFlags {
                            ignore_cache_on_error: true,
                            block_on_cache,
                        },
                    },
                    _ => http,
                };
                (data_source, Some(selected.kind))
            }
        };

        let pipeline = Pipeline {
            kind,
            data_source,
            engine,
            clip_end_ms: descriptor.clip_end_ms,
            drm: descriptor.drm.as_ref().map(DrmSession::from),
            descriptor,
        };

        debug!(
            kind = pipeline.kind.name(),
            protocol = ?pipeline.descriptor.protocol,
            cached = pipeline.is_cached(),
            engine = ?pipeline.engine,
            "Built pipeline"
        );
        Ok(pipeline)
    }

    fn kind_for(descriptor: &SourceDescriptor) -> Result<PipelineKind> {
        match (descriptor.protocol, descriptor.format) {
            (Protocol::Rtsp, ContentFormat::Progressive) => {
                Ok(PipelineKind::Rtsp(RtspOptions::default()))
            }
            (Protocol::Rtmp, ContentFormat::Progressive) => Ok(PipelineKind::Progressive {
                constant_bitrate_seeking: true,
            }),
            (Protocol::Rtmp | Protocol::Rtsp, format) => Err(PlaybackError::UnsupportedMediaType(
                format!("{} over {:?}", format, descriptor.protocol),
            )),
            (_, ContentFormat::Hls) => Ok(PipelineKind::Hls {
                load_error_policy: LoadErrorPolicy::default(),
                allow_chunkless_preparation: false,
                live: (descriptor.known_live() == Some(true))
                    .then(LiveConfiguration::default),
            }),
            (_, ContentFormat::Dash) => Ok(PipelineKind::Dash),
            (_, ContentFormat::SmoothStreaming) => Ok(PipelineKind::SmoothStreaming),
            (_, ContentFormat::Progressive) => Ok(PipelineKind::Progressive {
                constant_bitrate_seeking: true,
            }),
        }
    }
}
