//! # Playback & Streaming Module
//!
//! Session-level control of a host media engine for streaming sources.
//!
//! ## Overview
//!
//! This module handles:
//! - Source resolution and pipeline composition (HLS, DASH, Smooth
//!   Streaming, RTSP, RTMP, progressive)
//! - Network engine selection with a one-way fallback to the standard engine
//! - Retry and recovery of playback faults
//! - A shared, size-bounded byte cache and background pre-caching
//! - Hardware-first decoder ranking
//!
//! The entry point is [`SessionHandle::spawn`]; each session runs as its own
//! task and reports to the host through an event queue.

pub mod cache;
pub mod datasource;
pub mod decoder;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod precache;
pub mod retry;
pub mod session;
pub mod source;
pub mod traits;

pub use cache::{CacheConfig, CacheStats, CacheStore, SharedCache};
pub use decoder::{DecoderCatalog, DecoderInfo, DecoderPreference, DecoderQuery, DecoderRanker};
pub use error::{PlaybackError, Result};
pub use network::{EngineRegistry, NetworkEngineSelector, SelectedClient};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineKind};
pub use precache::{
    is_pre_cache_supported, PreCacheOutcome, PreCachePool, PreCacheRequest, PreCacheWorker,
};
pub use retry::{
    FaultClass, FaultCode, KeywordNetworkPredicate, NetworkFaultPredicate, PlaybackFault,
    RecoveryAction, RetryMachine, RetryPolicy, SessionPhase,
};
pub use session::{SessionContext, SessionHandle, SessionId, SessionOptions};
pub use source::{CacheSettings, ContentFormat, DrmConfig, Protocol, SourceDescriptor, SourceRequest};
pub use traits::{
    EngineListener, EngineNotification, EngineState, MediaEngine, MediaEngineFactory,
    TrackConstraints, VideoFormat,
};
