//! Player service: the command surface hosts call into.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_traits::{Clock, EngineBuilder, HttpClientOptions, HttpEngine};
use core_playback::decoder::DecoderCatalog;
use core_playback::{
    is_pre_cache_supported, CacheStats, EngineRegistry, MediaEngineFactory, PlaybackError,
    PreCachePool, PreCacheRequest, SessionContext, SessionHandle, SessionId, SessionOptions,
    SessionPhase, SharedCache, SourceRequest,
};
use core_runtime::config::PlayerConfig;
use core_runtime::events::{
    EventBus, EventPool, EventSink, EventStream, PreCacheEvent, ServiceEvent,
};
use core_runtime::logging::strip_path;
use core_runtime::BufferConfig;
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::error::Result;

/// Host collaborators the service needs.
#[derive(Clone)]
pub struct ServiceDependencies {
    pub engine_factory: Arc<dyn MediaEngineFactory>,
    pub standard_engine: Arc<dyn HttpEngine>,
    /// Builder of the high-performance engine, if the host ships one.
    pub high_performance: Option<Arc<dyn EngineBuilder>>,
    pub decoder_catalog: Arc<dyn DecoderCatalog>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceDependencies {
    pub fn new(
        engine_factory: Arc<dyn MediaEngineFactory>,
        standard_engine: Arc<dyn HttpEngine>,
        decoder_catalog: Arc<dyn DecoderCatalog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine_factory,
            standard_engine,
            high_performance: None,
            decoder_catalog,
            clock,
        }
    }

    pub fn with_high_performance(mut self, builder: Arc<dyn EngineBuilder>) -> Self {
        self.high_performance = Some(builder);
        self
    }
}

/// Owns every session plus the state they share: the cache, the
/// high-performance engine registry, the pre-cache pool and the event bus.
pub struct PlayerService {
    config: PlayerConfig,
    deps: ServiceDependencies,
    registry: Arc<EngineRegistry>,
    cache: Arc<SharedCache>,
    events: EventBus,
    event_pool: Arc<EventPool>,
    precache: PreCachePool,
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl PlayerService {
    /// Validates `config` and wires the shared state.
    pub fn new(config: PlayerConfig, deps: ServiceDependencies) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.events.bus_capacity);
        let registry = Arc::new(EngineRegistry::new(deps.high_performance.clone()));
        let cache = Arc::new(
            SharedCache::new(&config.cache_dir, Arc::clone(&deps.clock)).with_events(events.clone()),
        );
        let event_pool = Arc::new(EventPool::new(
            config.events.pool_initial,
            config.events.pool_max,
        ));
        let precache = PreCachePool::new(config.precache.workers, events.clone())
            .with_chunk_bytes(config.precache.read_chunk_bytes);

        info!(
            cache_dir = %strip_path(&config.cache_dir.to_string_lossy()),
            high_performance = deps.high_performance.is_some() && config.network.enable_high_performance,
            "Player service ready"
        );

        Ok(Self {
            config,
            deps,
            registry,
            cache,
            events,
            event_pool,
            precache,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Disposes every live session.
    pub async fn init(&self) {
        let sessions: Vec<SessionHandle> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        if !sessions.is_empty() {
            info!(count = sessions.len(), "Disposing live sessions");
        }
        for session in sessions {
            session.dispose().await;
        }
    }

    /// Starts a session. `buffer` overrides the configured buffer sizes.
    pub fn create_session(&self, buffer: Option<BufferConfig>) -> Result<SessionId> {
        let context = SessionContext {
            engine_factory: Arc::clone(&self.deps.engine_factory),
            standard_engine: Arc::clone(&self.deps.standard_engine),
            registry: Arc::clone(&self.registry),
            decoder_catalog: Arc::clone(&self.deps.decoder_catalog),
            cache: Arc::clone(&self.cache),
            event_pool: Arc::clone(&self.event_pool),
            events: self.events.clone(),
            clock: Arc::clone(&self.deps.clock),
            network_predicate: SessionContext::default_network_predicate(),
        };
        let options = SessionOptions::from_config(&self.config, buffer);

        let session = SessionHandle::spawn(context, options)?;
        let id = session.id();
        self.sessions.lock().insert(id, session);
        debug!(session = %id, "Session created");
        Ok(id)
    }

    /// Handle of a live session.
    pub fn session(&self, id: SessionId) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PlaybackError::SessionNotFound(id.to_string()).into())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub async fn set_source(&self, id: SessionId, request: SourceRequest) -> Result<()> {
        self.session(id)?.set_source(request).await?;
        Ok(())
    }

    pub fn play(&self, id: SessionId) -> Result<()> {
        self.session(id)?.play();
        Ok(())
    }

    pub fn pause(&self, id: SessionId) -> Result<()> {
        self.session(id)?.pause();
        Ok(())
    }

    pub fn seek(&self, id: SessionId, position_ms: u64) -> Result<()> {
        self.session(id)?.seek(position_ms);
        Ok(())
    }

    pub fn set_volume(&self, id: SessionId, volume: f64) -> Result<()> {
        self.session(id)?.set_volume(volume);
        Ok(())
    }

    pub fn set_speed(&self, id: SessionId, speed: f64) -> Result<()> {
        self.session(id)?.set_speed(speed);
        Ok(())
    }

    pub fn set_looping(&self, id: SessionId, looping: bool) -> Result<()> {
        self.session(id)?.set_looping(looping);
        Ok(())
    }

    pub fn set_track_constraints(
        &self,
        id: SessionId,
        width: u32,
        height: u32,
        bitrate: u32,
    ) -> Result<()> {
        self.session(id)?.set_track_constraints(width, height, bitrate);
        Ok(())
    }

    pub fn set_audio_track(&self, id: SessionId, language: &str) -> Result<()> {
        self.session(id)?.set_audio_track(language);
        Ok(())
    }

    pub async fn position(&self, id: SessionId) -> Result<u64> {
        Ok(self.session(id)?.position().await)
    }

    pub async fn absolute_position(&self, id: SessionId) -> Result<i64> {
        Ok(self.session(id)?.absolute_position().await)
    }

    pub async fn phase(&self, id: SessionId) -> Result<SessionPhase> {
        Ok(self.session(id)?.phase().await)
    }

    /// Connects the host observer of one session.
    pub fn attach_events(&self, id: SessionId, sink: Arc<dyn EventSink>) -> Result<()> {
        self.session(id)?.attach_events(sink);
        Ok(())
    }

    pub fn detach_events(&self, id: SessionId) -> Result<()> {
        self.session(id)?.detach_events();
        Ok(())
    }

    /// Service-wide events: pre-cache progress, cache maintenance, session
    /// lifecycle.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Disposes a session. Unknown or already disposed handles are ignored.
    pub async fn dispose(&self, id: SessionId) -> Result<()> {
        let session = self.sessions.lock().remove(&id);
        if let Some(session) = session {
            session.dispose().await;
        }
        Ok(())
    }

    /// Queues a background fetch of the first `pre_cache_size` bytes of a
    /// resource. Returns `false` when nothing was queued: the protocol has no
    /// byte access or the key is already being fetched.
    #[instrument(skip(self, request), fields(uri = %request.uri))]
    pub async fn pre_cache(&self, request: PreCacheRequest) -> Result<bool> {
        request.validate()?;
        if !is_pre_cache_supported(&request.uri) {
            let _ = self.events.emit(ServiceEvent::PreCache(PreCacheEvent::Skipped {
                uri: request.uri.clone(),
                reason: "unsupported protocol".into(),
            }));
            return Ok(false);
        }

        let store = self
            .cache
            .get_or_open(request.max_cache_size, request.max_cache_file_size)
            .await?;
        let options = HttpClientOptions::from_headers(
            &request.headers,
            &self.config.network.default_user_agent,
        )
        .with_timeouts(
            self.config.network.connect_timeout(),
            self.config.network.read_timeout(),
        );
        let client = self
            .deps
            .standard_engine
            .client(&options)
            .map_err(PlaybackError::from)?;

        Ok(self.precache.submit(request, store, client)?)
    }

    /// Cancels every pre-cache transfer of `uri`.
    pub fn stop_pre_cache(&self, uri: &str) -> usize {
        self.precache.stop(uri)
    }

    pub fn is_pre_cache_supported(&self, uri: &str) -> bool {
        is_pre_cache_supported(uri)
    }

    /// Removes every cached byte.
    pub async fn clear_cache(&self) -> Result<()> {
        self.cache.clear().await?;
        Ok(())
    }

    /// Statistics of the cache, once something opened it.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.get().map(|store| store.stats())
    }

    /// Disposes every session and cancels pre-cache work.
    pub async fn shutdown(&self) {
        self.precache.stop_all();
        self.init().await;
    }
}
