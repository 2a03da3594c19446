//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    BridgeError, Clock, EngineBuilder, EngineKind, HttpClient, HttpClientOptions, HttpEngine,
    HttpRequest, HttpResponse, ManualClock, StreamingResponse,
};
use bytes::Bytes;
use core_playback::decoder::{DecoderCatalog, DecoderInfo, DecoderQuery, DecoderRanker};
use core_playback::traits::{
    EngineListener, MediaEngine, MediaEngineFactory, TrackConstraints, VideoFormat,
};
use core_playback::{
    EngineRegistry, Pipeline, SessionContext, SessionHandle, SessionOptions, SharedCache,
};
use core_runtime::events::{EventBus, EventPool, EventRecord, EventSink};
use core_runtime::BufferConfig;
use futures::TryStreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// HTTP
// ============================================================================

/// Serves byte resources from memory.
///
/// Ranged requests get a `206` with the requested slice, unless
/// [`ignore_ranges`](Self::ignore_ranges) is set, in which case the whole
/// body comes back with `200`. Unknown URLs answer `404`.
pub struct MemoryHttpClient {
    resources: Mutex<HashMap<String, Bytes>>,
    requests: Mutex<Vec<HttpRequest>>,
    ignore_ranges: AtomicBool,
    fail_connect: AtomicBool,
    /// Cut every body with a network error after this many chunks.
    fail_after_chunks: Mutex<Option<usize>>,
    chunk_size: usize,
}

impl MemoryHttpClient {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            ignore_ranges: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            fail_after_chunks: Mutex::new(None),
            chunk_size: 16,
        }
    }

    pub fn with_resource(self, url: &str, body: impl Into<Bytes>) -> Self {
        self.resources.lock().insert(url.to_string(), body.into());
        self
    }

    pub fn ignore_ranges(&self, ignore: bool) {
        self.ignore_ranges.store(ignore, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_after_chunks(&self, chunks: Option<usize>) {
        *self.fail_after_chunks.lock() = chunks;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpClient for MemoryHttpClient {
    async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse> {
        let response = self.open_stream(request).await?;
        let chunks: Vec<Bytes> = response.body.try_collect().await?;
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: Bytes::from(chunks.concat()),
        })
    }

    async fn open_stream(
        &self,
        request: HttpRequest,
    ) -> bridge_traits::error::Result<StreamingResponse> {
        self.requests.lock().push(request.clone());
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("connection refused".into()));
        }

        let Some(resource) = self.resources.lock().get(&request.url).cloned() else {
            return Ok(StreamingResponse {
                status: 404,
                headers: HashMap::new(),
                content_length: Some(0),
                body: Box::pin(futures::stream::empty::<bridge_traits::error::Result<Bytes>>()),
            });
        };

        let len = resource.len() as u64;
        let (status, body) = match request.range {
            Some(range) if !self.ignore_ranges.load(Ordering::SeqCst) => {
                let start = range.start.min(len);
                let end = range.end.map_or(len, |end| end.min(len));
                (206, resource.slice(start as usize..end as usize))
            }
            _ => (200, resource),
        };

        let mut chunks: Vec<bridge_traits::error::Result<Bytes>> = body
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        if let Some(limit) = *self.fail_after_chunks.lock() {
            chunks.truncate(limit);
            chunks.push(Err(BridgeError::Network("connection reset".into())));
        }

        Ok(StreamingResponse {
            status,
            headers: HashMap::new(),
            content_length: Some(body.len() as u64),
            body: Box::pin(futures::stream::iter(chunks)),
        })
    }
}

/// Engine minting clients that all share one [`MemoryHttpClient`].
pub struct FakeHttpEngine {
    kind: EngineKind,
    client: Arc<MemoryHttpClient>,
    options: Mutex<Vec<HttpClientOptions>>,
    shut_down: AtomicBool,
}

impl FakeHttpEngine {
    pub fn new(kind: EngineKind, client: Arc<MemoryHttpClient>) -> Self {
        Self {
            kind,
            client,
            options: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn clients_minted(&self) -> usize {
        self.options.lock().len()
    }

    pub fn last_options(&self) -> Option<HttpClientOptions> {
        self.options.lock().last().cloned()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl HttpEngine for FakeHttpEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn client(&self, options: &HttpClientOptions) -> bridge_traits::error::Result<Arc<dyn HttpClient>> {
        if self.is_shut_down() {
            return Err(BridgeError::NotAvailable("engine shut down".into()));
        }
        self.options.lock().push(options.clone());
        Ok(Arc::clone(&self.client) as Arc<dyn HttpClient>)
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// Builds a high-performance [`FakeHttpEngine`], or fails when told to.
pub struct FakeEngineBuilder {
    client: Arc<MemoryHttpClient>,
    fail: bool,
    builds: AtomicUsize,
    built: Mutex<Option<Arc<FakeHttpEngine>>>,
}

impl FakeEngineBuilder {
    pub fn new(client: Arc<MemoryHttpClient>) -> Self {
        Self {
            client,
            fail: false,
            builds: AtomicUsize::new(0),
            built: Mutex::new(None),
        }
    }

    pub fn failing(client: Arc<MemoryHttpClient>) -> Self {
        Self {
            fail: true,
            ..Self::new(client)
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// The most recently built engine.
    pub fn engine(&self) -> Option<Arc<FakeHttpEngine>> {
        self.built.lock().clone()
    }
}

impl EngineBuilder for FakeEngineBuilder {
    fn build(&self) -> bridge_traits::error::Result<Arc<dyn HttpEngine>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BridgeError::NotAvailable("native library missing".into()));
        }
        let engine = Arc::new(FakeHttpEngine::new(
            EngineKind::HighPerformance,
            Arc::clone(&self.client),
        ));
        *self.built.lock() = Some(Arc::clone(&engine));
        Ok(engine)
    }
}

// ============================================================================
// Media engine
// ============================================================================

/// What a [`FakeMediaEngine`] was told, plus the values it reports back.
#[derive(Default)]
pub struct EngineRecord {
    pub buffer: Option<BufferConfig>,
    pub pipelines: Vec<Arc<Pipeline>>,
    pub prepares: usize,
    pub plays: usize,
    pub pauses: usize,
    pub stops: usize,
    pub seeks: Vec<u64>,
    pub default_position_seeks: usize,
    pub volume: Option<f32>,
    pub speed: Option<f32>,
    pub repeat: Option<bool>,
    pub constraints: Option<TrackConstraints>,
    pub language: Option<String>,
    pub ranker: Option<Arc<DecoderRanker>>,
    pub released: bool,

    pub playing: bool,
    pub live: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub buffered_ms: u64,
    pub window_start_ms: Option<i64>,
    pub video_format: Option<VideoFormat>,
}

impl EngineRecord {
    pub fn last_pipeline(&self) -> Option<Arc<Pipeline>> {
        self.pipelines.last().cloned()
    }
}

pub struct FakeMediaEngine {
    record: Arc<Mutex<EngineRecord>>,
}

impl MediaEngine for FakeMediaEngine {
    fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) {
        self.record.lock().pipelines.push(pipeline);
    }

    fn prepare(&mut self) {
        self.record.lock().prepares += 1;
    }

    fn play(&mut self) {
        let mut record = self.record.lock();
        record.plays += 1;
        record.playing = true;
    }

    fn pause(&mut self) {
        let mut record = self.record.lock();
        record.pauses += 1;
        record.playing = false;
    }

    fn stop(&mut self) {
        let mut record = self.record.lock();
        record.stops += 1;
        record.playing = false;
    }

    fn seek_to(&mut self, position_ms: u64) {
        let mut record = self.record.lock();
        record.seeks.push(position_ms);
        record.position_ms = position_ms;
    }

    fn seek_to_default_position(&mut self) {
        self.record.lock().default_position_seeks += 1;
    }

    fn set_volume(&mut self, volume: f32) {
        self.record.lock().volume = Some(volume);
    }

    fn set_speed(&mut self, speed: f32) {
        self.record.lock().speed = Some(speed);
    }

    fn set_repeat(&mut self, repeat: bool) {
        self.record.lock().repeat = Some(repeat);
    }

    fn set_track_constraints(&mut self, constraints: TrackConstraints) {
        self.record.lock().constraints = Some(constraints);
    }

    fn set_preferred_audio_language(&mut self, language: &str) {
        self.record.lock().language = Some(language.to_string());
    }

    fn set_decoder_ranker(&mut self, ranker: Arc<DecoderRanker>) {
        self.record.lock().ranker = Some(ranker);
    }

    fn is_playing(&self) -> bool {
        self.record.lock().playing
    }

    fn is_live(&self) -> bool {
        self.record.lock().live
    }

    fn position_ms(&self) -> u64 {
        self.record.lock().position_ms
    }

    fn duration_ms(&self) -> u64 {
        self.record.lock().duration_ms
    }

    fn buffered_position_ms(&self) -> u64 {
        self.record.lock().buffered_ms
    }

    fn window_start_ms(&self) -> Option<i64> {
        self.record.lock().window_start_ms
    }

    fn video_format(&self) -> Option<VideoFormat> {
        self.record.lock().video_format
    }

    fn release(&mut self) {
        self.record.lock().released = true;
    }
}

/// One created engine: its record and the listener handed to it.
#[derive(Clone)]
pub struct CreatedEngine {
    pub record: Arc<Mutex<EngineRecord>>,
    pub listener: EngineListener,
}

#[derive(Default)]
pub struct FakeEngineFactory {
    created: Mutex<Vec<CreatedEngine>>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.lock().len()
    }

    pub fn engine(&self, index: usize) -> CreatedEngine {
        self.created.lock()[index].clone()
    }

    pub fn last(&self) -> CreatedEngine {
        self.created
            .lock()
            .last()
            .cloned()
            .expect("no engine created")
    }
}

impl MediaEngineFactory for FakeEngineFactory {
    fn create(
        &self,
        buffer: BufferConfig,
        listener: EngineListener,
    ) -> core_playback::Result<Box<dyn MediaEngine>> {
        let record = Arc::new(Mutex::new(EngineRecord {
            buffer: Some(buffer),
            ..EngineRecord::default()
        }));
        self.created.lock().push(CreatedEngine {
            record: Arc::clone(&record),
            listener,
        });
        Ok(Box::new(FakeMediaEngine { record }))
    }
}

// ============================================================================
// Decoders and events
// ============================================================================

/// Returns the same lists for every query and counts lookups.
pub struct StaticCatalog {
    default: Vec<DecoderInfo>,
    software: Vec<DecoderInfo>,
    lookups: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(default: Vec<DecoderInfo>, software: Vec<DecoderInfo>) -> Self {
        Self {
            default,
            software,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl DecoderCatalog for StaticCatalog {
    fn default_decoders(&self, _query: &DecoderQuery) -> core_playback::Result<Vec<DecoderInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.default.clone())
    }

    fn software_preferred_decoders(
        &self,
        _query: &DecoderQuery,
    ) -> core_playback::Result<Vec<DecoderInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.software.clone())
    }
}

/// Records every event delivered to the host.
#[derive(Default)]
pub struct CollectingSink {
    records: Mutex<Vec<EventRecord>>,
    ended: AtomicBool,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.name().to_string())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|record| record.name() == name)
            .count()
    }

    pub fn last(&self, name: &str) -> Option<EventRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .find(|record| record.name() == name)
            .cloned()
    }

    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

impl EventSink for CollectingSink {
    fn on_event(&self, record: &EventRecord) {
        self.records.lock().push(record.clone());
    }

    fn on_end_of_stream(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// Session harness
// ============================================================================

/// Everything a session needs, wired to fakes.
pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub http: Arc<MemoryHttpClient>,
    pub factory: Arc<FakeEngineFactory>,
    pub standard: Arc<FakeHttpEngine>,
    pub builder: Arc<FakeEngineBuilder>,
    pub registry: Arc<EngineRegistry>,
    pub events: EventBus,
    pub context: SessionContext,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_client(MemoryHttpClient::new())
    }

    pub fn with_client(client: MemoryHttpClient) -> Self {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::default());
        let http = Arc::new(client);
        let factory = Arc::new(FakeEngineFactory::new());
        let standard = Arc::new(FakeHttpEngine::new(EngineKind::Standard, Arc::clone(&http)));
        let builder = Arc::new(FakeEngineBuilder::new(Arc::clone(&http)));
        let registry = Arc::new(EngineRegistry::new(Some(
            Arc::clone(&builder) as Arc<dyn EngineBuilder>
        )));
        let events = EventBus::new(64);

        let context = SessionContext {
            engine_factory: Arc::clone(&factory) as Arc<dyn MediaEngineFactory>,
            standard_engine: Arc::clone(&standard) as Arc<dyn HttpEngine>,
            registry: Arc::clone(&registry),
            decoder_catalog: Arc::new(StaticCatalog::empty()),
            cache: Arc::new(
                SharedCache::new(dir.path().join("cache"), Arc::clone(&clock) as Arc<dyn Clock>)
                    .with_events(events.clone()),
            ),
            event_pool: Arc::new(EventPool::new(4, 16)),
            events: events.clone(),
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
            network_predicate: SessionContext::default_network_predicate(),
        };

        Self {
            dir,
            clock,
            http,
            factory,
            standard,
            builder,
            registry,
            events,
            context,
        }
    }

    pub fn spawn(&self) -> SessionHandle {
        self.spawn_with(SessionOptions::default())
    }

    pub fn spawn_with(&self, options: SessionOptions) -> SessionHandle {
        SessionHandle::spawn(self.context.clone(), options).unwrap()
    }
}

/// Lets every runnable task finish. With a paused clock the runtime only
/// advances time once all tasks are idle, so the sleep returns after the
/// session has drained its inboxes.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
