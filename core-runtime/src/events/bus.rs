use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Service Event Types
// ============================================================================

/// Events that are not scoped to a single session's event queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum ServiceEvent {
    Session(SessionEvent),
    PreCache(PreCacheEvent),
    Cache(CacheEvent),
}

impl ServiceEvent {
    pub fn description(&self) -> &str {
        match self {
            ServiceEvent::Session(e) => e.description(),
            ServiceEvent::PreCache(e) => e.description(),
            ServiceEvent::Cache(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            ServiceEvent::Session(SessionEvent::Failed { .. }) => EventSeverity::Error,
            ServiceEvent::PreCache(PreCacheEvent::Failed { .. }) => EventSeverity::Warning,
            ServiceEvent::Session(SessionEvent::EngineDowngraded { .. }) => EventSeverity::Warning,
            ServiceEvent::PreCache(PreCacheEvent::Completed { .. }) => EventSeverity::Info,
            ServiceEvent::Cache(CacheEvent::Cleared) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Session lifecycle as seen from the service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    Created { session_id: String },
    /// The session switched to the standard network engine.
    EngineDowngraded { session_id: String },
    /// The session surfaced a fatal error and stopped recovering.
    Failed {
        session_id: String,
        code: String,
        message: String,
    },
    Disposed { session_id: String },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Created { .. } => "Session created",
            SessionEvent::EngineDowngraded { .. } => "Network engine downgraded",
            SessionEvent::Failed { .. } => "Session failed",
            SessionEvent::Disposed { .. } => "Session disposed",
        }
    }
}

/// Background pre-cache job progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PreCacheEvent {
    Started { uri: String, key: String },
    /// Emitted on every 10% threshold of the requested prefix.
    Progress {
        uri: String,
        percent: u8,
        bytes_cached: u64,
    },
    Completed { uri: String, bytes_cached: u64 },
    /// Nothing to do: unsupported protocol, duplicate job, or already cached.
    Skipped { uri: String, reason: String },
    Failed { uri: String, message: String },
    Cancelled { uri: String },
}

impl PreCacheEvent {
    fn description(&self) -> &str {
        match self {
            PreCacheEvent::Started { .. } => "Pre-cache started",
            PreCacheEvent::Progress { .. } => "Pre-cache progress",
            PreCacheEvent::Completed { .. } => "Pre-cache completed",
            PreCacheEvent::Skipped { .. } => "Pre-cache skipped",
            PreCacheEvent::Failed { .. } => "Pre-cache failed",
            PreCacheEvent::Cancelled { .. } => "Pre-cache cancelled",
        }
    }
}

/// Cache maintenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    Evicted { key: String, bytes: u64 },
    Cleared,
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Evicted { .. } => "Cache entry evicted",
            CacheEvent::Cleared => "Cache cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel for [`ServiceEvent`]s.
///
/// Cloning the bus shares the channel. Each `subscribe()` creates an
/// independent receiver; past events are not replayed.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ServiceEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers, or an error when nobody listens.
    pub fn emit(&self, event: ServiceEvent) -> Result<usize, SendError<ServiceEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<ServiceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&ServiceEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, ServiceEvent};
///
/// let bus = EventBus::new(16);
/// let precache_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, ServiceEvent::PreCache(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<ServiceEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<ServiceEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ServiceEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &ServiceEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once every sender is gone.
    pub async fn recv(&mut self) -> Result<ServiceEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<Result<ServiceEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(uri: &str) -> ServiceEvent {
        ServiceEvent::PreCache(PreCacheEvent::Completed {
            uri: uri.to_string(),
            bytes_cached: 1024,
        })
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(ServiceEvent::Cache(CacheEvent::Cleared)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.emit(completed("https://a/1.mp4")).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), completed("https://a/1.mp4"));
        assert_eq!(second.recv().await.unwrap(), completed("https://a/1.mp4"));
    }

    #[tokio::test]
    async fn test_stream_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, ServiceEvent::PreCache(_)));

        bus.emit(ServiceEvent::Cache(CacheEvent::Cleared)).unwrap();
        bus.emit(completed("https://a/2.mp4")).unwrap();

        assert_eq!(stream.recv().await.unwrap(), completed("https://a/2.mp4"));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut stream = EventStream::new(bus.subscribe());
        for i in 0..5 {
            bus.emit(completed(&format!("https://a/{}.mp4", i))).unwrap();
        }
        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Lagged(_)))));
    }

    #[test]
    fn test_severity_and_description() {
        let failed = ServiceEvent::Session(SessionEvent::Failed {
            session_id: "s".into(),
            code: "VideoError".into(),
            message: "boom".into(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(failed.description(), "Session failed");
        assert_eq!(completed("u").severity(), EventSeverity::Info);
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(ServiceEvent::PreCache(PreCacheEvent::Cancelled {
            uri: "https://a/b.mp4".into(),
        }))
        .unwrap();

        assert_eq!(json["type"], "PreCache");
        assert_eq!(json["payload"]["event"], "Cancelled");
        assert_eq!(json["payload"]["uri"], "https://a/b.mp4");
    }
}
