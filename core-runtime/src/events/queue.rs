use super::player::{EventPool, EventRecord, PlayerEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Host-side observer of a session's events.
///
/// Callbacks run while the queue lock is held and must not call back into
/// the same queue.
pub trait EventSink: Send + Sync {
    fn on_event(&self, record: &EventRecord);

    /// The session will not produce further events.
    fn on_end_of_stream(&self) {}
}

enum Pending {
    Event(EventRecord),
    EndOfStream,
}

struct QueueState {
    sink: Option<Arc<dyn EventSink>>,
    pending: VecDeque<Pending>,
    sealed: bool,
}

/// FIFO between a session and a possibly late observer.
///
/// Until [`attach`](Self::attach) is called, sent events are buffered. The
/// terminal marker from [`end_of_stream`](Self::end_of_stream) seals the
/// queue; later sends are dropped.
pub struct EventQueue {
    pool: Arc<EventPool>,
    state: Mutex<QueueState>,
}

impl EventQueue {
    pub fn new(pool: Arc<EventPool>) -> Self {
        Self {
            pool,
            state: Mutex::new(QueueState {
                sink: None,
                pending: VecDeque::new(),
                sealed: false,
            }),
        }
    }

    /// Returns `false` when the event was dropped because the queue is sealed.
    pub fn send(&self, event: &PlayerEvent) -> bool {
        let mut state = self.state.lock();
        if state.sealed {
            tracing::trace!(event = event.name(), "queue sealed, dropping event");
            return false;
        }

        let mut record = self.pool.acquire();
        record.fill(event);

        match state.sink.as_ref() {
            Some(sink) => {
                sink.on_event(&record);
                self.pool.release(record);
            }
            None => state.pending.push_back(Pending::Event(record)),
        }
        true
    }

    /// Enqueue the terminal marker. Idempotent.
    pub fn end_of_stream(&self) {
        let mut state = self.state.lock();
        if state.sealed {
            return;
        }
        state.sealed = true;

        match state.sink.as_ref() {
            Some(sink) => sink.on_end_of_stream(),
            None => state.pending.push_back(Pending::EndOfStream),
        }
    }

    /// Attach an observer and drain everything buffered so far, in order.
    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        let mut state = self.state.lock();
        let pending = std::mem::take(&mut state.pending);
        for item in pending {
            match item {
                Pending::Event(record) => {
                    sink.on_event(&record);
                    self.pool.release(record);
                }
                Pending::EndOfStream => sink.on_end_of_stream(),
            }
        }
        state.sink = Some(sink);
    }

    /// Drop the observer; subsequent sends buffer again.
    pub fn detach(&self) {
        self.state.lock().sink = None;
    }

    /// Buffered items, terminal marker included.
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.state.lock().sealed
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().sink.is_some()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventQueue")
            .field("pending", &state.pending.len())
            .field("sealed", &state.sealed)
            .field("attached", &state.sink.is_some())
            .finish()
    }
}
