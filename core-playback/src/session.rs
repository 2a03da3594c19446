//! # Playback Session
//!
//! Each session is an actor: one tokio task owns the host engine, the
//! current source and the recovery state, and processes three inboxes in
//! order:
//!
//! - API commands from [`SessionHandle`]
//! - engine notifications from the [`EngineListener`]
//! - retry timer firings
//!
//! Nothing outside the task touches session state. Retry timers belong to
//! the current source: setting a new source or disposing the session
//! cancels them.
//!
//! ```text
//!  SessionHandle ──commands──┐
//!  EngineListener ──notes────┼──> SessionActor ──> MediaEngine
//!  retry timers ──fired──────┘         │
//!                                      └──> EventQueue ──> host EventSink
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::{Clock, EngineKind, HttpClientOptions, HttpEngine};
use chrono::{DateTime, Utc};
use core_runtime::config::{NetworkConfig, PlayerConfig};
use core_runtime::events::{
    EventBus, EventPool, EventQueue, EventSink, PlayerEvent, ServiceEvent, SessionEvent,
};
use core_runtime::BufferConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::cache::SharedCache;
use crate::decoder::{DecoderCatalog, DecoderPreference, DecoderRanker};
use crate::error::{PlaybackError, Result};
use crate::network::{EngineRegistry, NetworkEngineSelector};
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::retry::{
    FaultContext, KeywordNetworkPredicate, NetworkFaultPredicate, PlaybackFault, RecoveryAction,
    RetryMachine, RetryPolicy, SessionPhase,
};
use crate::source::{ContentFormat, Protocol, SourceDescriptor, SourceRequest};
use crate::traits::{
    EngineListener, EngineNotification, EngineState, MediaEngine, MediaEngineFactory,
    TrackConstraints,
};

/// Session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collaborators shared by every session of a service.
#[derive(Clone)]
pub struct SessionContext {
    pub engine_factory: Arc<dyn MediaEngineFactory>,
    pub standard_engine: Arc<dyn HttpEngine>,
    pub registry: Arc<EngineRegistry>,
    pub decoder_catalog: Arc<dyn DecoderCatalog>,
    pub cache: Arc<SharedCache>,
    pub event_pool: Arc<EventPool>,
    pub events: EventBus,
    pub clock: Arc<dyn Clock>,
    pub network_predicate: Arc<dyn NetworkFaultPredicate>,
}

impl SessionContext {
    pub fn with_network_predicate(mut self, predicate: Arc<dyn NetworkFaultPredicate>) -> Self {
        self.network_predicate = predicate;
        self
    }

    /// Default fault classification.
    pub fn default_network_predicate() -> Arc<dyn NetworkFaultPredicate> {
        Arc::new(KeywordNetworkPredicate::default())
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("cache_dir", &self.cache.directory())
            .field("high_performance_running", &self.registry.is_running())
            .finish_non_exhaustive()
    }
}

/// Per-session tunables.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub buffer: BufferConfig,
    pub retry: RetryPolicy,
    pub network: NetworkConfig,
    pub buffering_update_interval: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &PlayerConfig, buffer: Option<BufferConfig>) -> Self {
        Self {
            buffer: buffer.unwrap_or(config.buffer).normalized(),
            retry: RetryPolicy::from(&config.retry),
            network: config.network.clone(),
            buffering_update_interval: Duration::from_millis(
                config.events.buffering_update_interval_ms,
            ),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            retry: RetryPolicy::default(),
            network: NetworkConfig::default(),
            buffering_update_interval: Duration::from_millis(600),
        }
    }
}

enum SessionCommand {
    SetSource {
        request: Box<SourceRequest>,
        reply: oneshot::Sender<Result<()>>,
    },
    Play,
    Pause,
    Seek(u64),
    SetVolume(f64),
    SetSpeed(f64),
    SetLooping(bool),
    SetTrackConstraints(TrackConstraints),
    SetAudioTrack(String),
    Position(oneshot::Sender<u64>),
    AbsolutePosition(oneshot::Sender<i64>),
    Phase(oneshot::Sender<SessionPhase>),
    Dispose(oneshot::Sender<()>),
}

struct RetryFired {
    generation: u64,
}

/// Cloneable handle to a session actor.
///
/// After [`dispose`](Self::dispose) every method is a no-op and
/// [`set_source`](Self::set_source) fails with [`PlaybackError::Disposed`].
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    queue: Arc<EventQueue>,
    disposed: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Creates the engine and starts the session task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(context: SessionContext, options: SessionOptions) -> Result<Self> {
        let id = SessionId::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (note_tx, note_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let mut engine = context
            .engine_factory
            .create(options.buffer, EngineListener::new(note_tx))?;
        let ranker = Arc::new(DecoderRanker::new(
            Arc::clone(&context.decoder_catalog),
            DecoderPreference::default(),
        ));
        engine.set_decoder_ranker(Arc::clone(&ranker));
        let queue = Arc::new(EventQueue::new(Arc::clone(&context.event_pool)));
        let disposed = Arc::new(AtomicBool::new(false));

        let actor = SessionActor {
            id,
            selector: NetworkEngineSelector::new(
                Arc::clone(&context.registry),
                Arc::clone(&context.standard_engine),
            ),
            retry: RetryMachine::new(options.retry, Arc::clone(&context.network_predicate)),
            engine,
            ranker,
            queue: Arc::clone(&queue),
            disposed: Arc::clone(&disposed),
            session_token: CancellationToken::new(),
            source_token: CancellationToken::new(),
            source_generation: 0,
            descriptor: None,
            pipeline: None,
            initialized: false,
            last_buffered_ms: None,
            last_buffering_update: None,
            timer_tx,
            context,
            options,
        };

        let span = tracing::info_span!("session", id = %id);
        tokio::spawn(actor.run(command_rx, note_rx, timer_rx).instrument(span));

        Ok(Self {
            id,
            commands: command_tx,
            queue,
            disposed,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Resolves `request` and loads it. Configuration problems (bad URI,
    /// unsupported format) are returned here and emit no event.
    pub async fn set_source(&self, request: SourceRequest) -> Result<()> {
        if self.is_disposed() {
            return Err(PlaybackError::Disposed);
        }
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::SetSource {
                request: Box::new(request),
                reply,
            })
            .map_err(|_| PlaybackError::Disposed)?;
        rx.await.map_err(|_| PlaybackError::Disposed)?
    }

    pub fn play(&self) {
        self.send(SessionCommand::Play);
    }

    pub fn pause(&self) {
        self.send(SessionCommand::Pause);
    }

    pub fn seek(&self, position_ms: u64) {
        self.send(SessionCommand::Seek(position_ms));
    }

    /// Volume is clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f64) {
        self.send(SessionCommand::SetVolume(volume));
    }

    pub fn set_speed(&self, speed: f64) {
        self.send(SessionCommand::SetSpeed(speed));
    }

    pub fn set_looping(&self, looping: bool) {
        self.send(SessionCommand::SetLooping(looping));
    }

    /// Zero means "no limit"; see [`TrackConstraints::from_limits`].
    pub fn set_track_constraints(&self, width: u32, height: u32, bitrate: u32) {
        self.send(SessionCommand::SetTrackConstraints(
            TrackConstraints::from_limits(width, height, bitrate),
        ));
    }

    pub fn set_audio_track(&self, language: impl Into<String>) {
        self.send(SessionCommand::SetAudioTrack(language.into()));
    }

    /// Playback position in milliseconds; 0 once disposed.
    pub async fn position(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::Position(tx)) {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Window start plus position when the timeline has a wall-clock start,
    /// otherwise the plain position.
    pub async fn absolute_position(&self) -> i64 {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::AbsolutePosition(tx)) {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub async fn phase(&self) -> SessionPhase {
        let (tx, rx) = oneshot::channel();
        if !self.send(SessionCommand::Phase(tx)) {
            return SessionPhase::Idle;
        }
        rx.await.unwrap_or(SessionPhase::Idle)
    }

    /// Connects the host observer. Buffered events are delivered first.
    pub fn attach_events(&self, sink: Arc<dyn EventSink>) {
        self.queue.attach(sink);
    }

    pub fn detach_events(&self) {
        self.queue.detach();
    }

    /// Stops playback, cancels pending retries, releases the engine and
    /// seals the event queue. Safe to call more than once.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let (tx, rx) = oneshot::channel();
        if self.commands.send(SessionCommand::Dispose(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    fn send(&self, command: SessionCommand) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.commands.send(command).is_ok()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct SessionActor {
    id: SessionId,
    context: SessionContext,
    options: SessionOptions,
    engine: Box<dyn MediaEngine>,
    ranker: Arc<DecoderRanker>,
    queue: Arc<EventQueue>,
    selector: NetworkEngineSelector,
    retry: RetryMachine,
    disposed: Arc<AtomicBool>,
    session_token: CancellationToken,
    source_token: CancellationToken,
    source_generation: u64,
    descriptor: Option<Arc<SourceDescriptor>>,
    pipeline: Option<Arc<Pipeline>>,
    initialized: bool,
    last_buffered_ms: Option<u64>,
    last_buffering_update: Option<DateTime<Utc>>,
    timer_tx: mpsc::UnboundedSender<RetryFired>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        mut notes: mpsc::UnboundedReceiver<EngineNotification>,
        mut timers: mpsc::UnboundedReceiver<RetryFired>,
    ) {
        let _ = self.context.events.emit(ServiceEvent::Session(SessionEvent::Created {
            session_id: self.id.to_string(),
        }));
        debug!("Session started");

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(SessionCommand::Dispose(done)) => {
                        self.dispose();
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.dispose();
                        break;
                    }
                },
                Some(note) = notes.recv() => self.handle_notification(note),
                Some(fired) = timers.recv() => self.handle_retry_fired(fired),
            }
        }
        debug!("Session stopped");
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetSource { request, reply } => {
                let result = if self.is_disposed() {
                    Err(PlaybackError::Disposed)
                } else {
                    self.set_source(*request).await
                };
                let _ = reply.send(result);
            }
            SessionCommand::Position(reply) => {
                let _ = reply.send(self.engine.position_ms());
            }
            SessionCommand::AbsolutePosition(reply) => {
                let position = self.engine.position_ms() as i64;
                let absolute = self
                    .engine
                    .window_start_ms()
                    .map_or(position, |start| start + position);
                let _ = reply.send(absolute);
            }
            SessionCommand::Phase(reply) => {
                let _ = reply.send(self.retry.phase());
            }
            _ if self.is_disposed() => {}
            SessionCommand::Play => self.engine.play(),
            SessionCommand::Pause => self.engine.pause(),
            SessionCommand::Seek(position_ms) => self.engine.seek_to(position_ms),
            SessionCommand::SetVolume(volume) => {
                let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
                self.engine.set_volume(volume as f32);
            }
            SessionCommand::SetSpeed(speed) => {
                if speed.is_finite() && speed > 0.0 {
                    self.engine.set_speed(speed as f32);
                } else {
                    warn!(speed, "Ignoring invalid playback speed");
                }
            }
            SessionCommand::SetLooping(looping) => self.engine.set_repeat(looping),
            SessionCommand::SetTrackConstraints(constraints) => {
                self.engine.set_track_constraints(constraints)
            }
            SessionCommand::SetAudioTrack(language) => {
                self.engine.set_preferred_audio_language(&language)
            }
            SessionCommand::Dispose(done) => {
                self.dispose();
                let _ = done.send(());
            }
        }
    }

    #[instrument(skip(self, request), fields(uri = %request.uri))]
    async fn set_source(&mut self, request: SourceRequest) -> Result<()> {
        // Pending retries belong to the previous source, even when the new
        // one is rejected.
        self.source_token.cancel();
        self.source_token = self.session_token.child_token();
        self.source_generation += 1;
        self.retry.reset();
        self.initialized = false;
        self.last_buffered_ms = None;
        self.last_buffering_update = None;

        let descriptor = Arc::new(SourceDescriptor::from_request(&request)?);
        let use_high_performance = self.wants_high_performance(&descriptor);
        let pipeline = self.compose(&descriptor, use_high_performance).await?;

        if self.ranker.preference() != descriptor.decoder_preference.effective() {
            self.ranker = Arc::new(DecoderRanker::new(
                Arc::clone(&self.context.decoder_catalog),
                descriptor.decoder_preference,
            ));
            self.engine.set_decoder_ranker(Arc::clone(&self.ranker));
        }
        self.engine.set_pipeline(Arc::clone(&pipeline));
        self.engine.prepare();

        info!(
            format = %descriptor.format,
            pipeline = pipeline.kind.name(),
            cached = pipeline.is_cached(),
            engine = ?pipeline.engine,
            "Source set"
        );
        self.descriptor = Some(descriptor);
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn wants_high_performance(&self, descriptor: &SourceDescriptor) -> bool {
        let network = &self.options.network;
        descriptor.protocol == Protocol::Http
            && network.enable_high_performance
            && (descriptor.format == ContentFormat::Hls || network.high_performance_for_all_http)
    }

    async fn compose(
        &mut self,
        descriptor: &Arc<SourceDescriptor>,
        use_high_performance: bool,
    ) -> Result<Arc<Pipeline>> {
        let client = match descriptor.protocol {
            Protocol::Http => {
                let options = HttpClientOptions::from_headers(
                    &descriptor.headers,
                    &self.options.network.default_user_agent,
                )
                .with_timeouts(
                    self.options.network.connect_timeout(),
                    self.options.network.read_timeout(),
                );
                Some(self.selector.select(use_high_performance, &options)?)
            }
            _ => None,
        };

        let cache = match (descriptor.protocol, descriptor.cache) {
            (Protocol::Http, Some(settings)) => match self
                .context
                .cache
                .get_or_open(settings.max_cache_size, settings.max_file_size)
                .await
            {
                Ok(store) => Some(store),
                Err(err) => {
                    warn!(error = %err, "Cache unavailable, streaming without it");
                    None
                }
            },
            _ => None,
        };

        PipelineBuilder::build(Arc::clone(descriptor), client, cache, false).map(Arc::new)
    }

    fn handle_notification(&mut self, note: EngineNotification) {
        if self.is_disposed() {
            return;
        }
        match note {
            EngineNotification::StateChanged(state) => self.on_state_changed(state),
            EngineNotification::Fault(fault) => self.on_fault(fault),
            EngineNotification::BufferedPositionChanged(buffered) => {
                self.send_buffering_update(buffered, false)
            }
        }
    }

    fn on_state_changed(&mut self, state: EngineState) {
        match state {
            EngineState::Buffering => {
                self.retry.on_buffering();
                let buffered = self.engine.buffered_position_ms();
                self.send_buffering_update(buffered, true);
                self.emit(PlayerEvent::BufferingStart);
            }
            EngineState::Ready => {
                self.retry.on_ready();
                if !self.initialized {
                    self.initialized = true;
                    self.send_initialized();
                }
                self.emit(PlayerEvent::BufferingEnd);
            }
            EngineState::Ended => {
                let key = self.source_key();
                self.emit(PlayerEvent::Completed { key });
            }
            EngineState::Idle => {}
        }
    }

    fn send_initialized(&mut self) {
        let (width, height) = self
            .engine
            .video_format()
            .map_or((0, 0), |format| format.display_size());
        let event = PlayerEvent::Initialized {
            key: self.source_key(),
            duration: self.engine.duration_ms(),
            width,
            height,
        };
        self.emit(event);
    }

    /// Emits `bufferingUpdate` unless an update went out within the
    /// throttle interval and the buffered position did not move. Buffering
    /// start always emits.
    fn send_buffering_update(&mut self, buffered_ms: u64, from_buffering_start: bool) {
        let now = self.context.clock.now();
        let interval = chrono::Duration::from_std(self.options.buffering_update_interval)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let recent = self
            .last_buffering_update
            .is_some_and(|last| now - last < interval);
        let moved = self.last_buffered_ms != Some(buffered_ms);

        if !from_buffering_start && recent && !moved {
            return;
        }
        self.emit(PlayerEvent::BufferingUpdate {
            values: vec![[0, buffered_ms]],
        });
        self.last_buffered_ms = Some(buffered_ms);
        self.last_buffering_update = Some(now);
    }

    fn on_fault(&mut self, fault: PlaybackFault) {
        let ctx = FaultContext {
            is_live: self.is_live(),
            is_playing: self.engine.is_playing(),
            high_performance_in_use: self.selector.high_performance_in_use(),
        };
        match self.retry.on_fault(&fault, ctx) {
            RecoveryAction::Ignore => {}
            RecoveryAction::SeekToLiveEdge => {
                self.engine.seek_to_default_position();
                self.engine.prepare();
            }
            RecoveryAction::ScheduleRetry { attempt, delay } => {
                self.schedule_retry(attempt, delay)
            }
            RecoveryAction::Downgrade => self.downgrade(),
            RecoveryAction::Fatal { message } => self.fail(message),
        }
    }

    fn schedule_retry(&self, attempt: u32, delay: Duration) {
        let token = self.source_token.clone();
        let timers = self.timer_tx.clone();
        let generation = self.source_generation;
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Retry scheduled");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = timers.send(RetryFired { generation });
                }
            }
        });
    }

    fn handle_retry_fired(&mut self, fired: RetryFired) {
        if self.is_disposed() || fired.generation != self.source_generation {
            return;
        }
        let resume = self.retry.on_retry_fired(self.is_live());
        match self.pipeline.clone() {
            Some(pipeline) => {
                info!(attempt = self.retry.attempts(), resume, "Retrying playback");
                self.reload(pipeline, resume);
            }
            None => {
                self.retry.fail();
                self.fail("retry failed: media source unavailable".to_string());
            }
        }
    }

    fn downgrade(&mut self) {
        self.selector.mark_failed();
        let Some(descriptor) = self.descriptor.clone() else {
            self.fail("engine fallback failed: no source".to_string());
            return;
        };

        // Building is pure, so the client and cache can be rebuilt inline
        // from the current pipeline's parts.
        let options = HttpClientOptions::from_headers(
            &descriptor.headers,
            &self.options.network.default_user_agent,
        )
        .with_timeouts(
            self.options.network.connect_timeout(),
            self.options.network.read_timeout(),
        );
        let client = match self.selector.select(false, &options) {
            Ok(client) => client,
            Err(err) => {
                self.fail(format!("engine fallback failed: {}", err));
                return;
            }
        };
        let cache = self
            .pipeline
            .as_ref()
            .filter(|pipeline| pipeline.is_cached())
            .and_then(|_| self.context.cache.get());

        match PipelineBuilder::build(descriptor, Some(client), cache, false) {
            Ok(pipeline) => {
                let pipeline = Arc::new(pipeline);
                let resume = self.retry.should_resume(self.is_live());
                let _ = self
                    .context
                    .events
                    .emit(ServiceEvent::Session(SessionEvent::EngineDowngraded {
                        session_id: self.id.to_string(),
                    }));
                info!(engine = %EngineKind::Standard, "Switched network engine");
                self.pipeline = Some(Arc::clone(&pipeline));
                self.reload(pipeline, resume);
            }
            Err(err) => self.fail(format!("engine fallback failed: {}", err)),
        }
    }

    fn reload(&mut self, pipeline: Arc<Pipeline>, resume: bool) {
        self.engine.stop();
        self.engine.set_pipeline(pipeline);
        self.engine.prepare();
        if resume {
            self.engine.play();
        }
    }

    fn fail(&mut self, message: String) {
        error!(message = %message, "Playback failed");
        let _ = self
            .context
            .events
            .emit(ServiceEvent::Session(SessionEvent::Failed {
                session_id: self.id.to_string(),
                code: core_runtime::events::PLAYBACK_ERROR_CODE.to_string(),
                message: message.clone(),
            }));
        self.emit(PlayerEvent::playback_error(message));
    }

    fn is_live(&self) -> bool {
        self.descriptor
            .as_ref()
            .and_then(|descriptor| descriptor.known_live())
            .unwrap_or_else(|| self.engine.is_live())
    }

    fn source_key(&self) -> String {
        self.descriptor
            .as_ref()
            .map(|descriptor| descriptor.key.clone())
            .unwrap_or_default()
    }

    fn emit(&self, event: PlayerEvent) {
        if !self.queue.send(&event) {
            debug!(event = event.name(), "Event dropped after end of stream");
        }
    }

    fn dispose(&mut self) {
        self.disposed.store(true, Ordering::Release);
        self.engine.stop();
        self.session_token.cancel();
        self.retry.reset();
        self.selector.release();
        self.queue.end_of_stream();
        self.engine.release();
        self.pipeline = None;
        self.descriptor = None;
        let _ = self
            .context
            .events
            .emit(ServiceEvent::Session(SessionEvent::Disposed {
                session_id: self.id.to_string(),
            }));
        info!("Session disposed");
    }
}
