use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error code attached to playback faults surfaced to the host.
pub const PLAYBACK_ERROR_CODE: &str = "VideoError";

/// Events emitted by a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// First `Ready` after a source was attached.
    Initialized {
        key: String,
        duration: u64,
        width: u32,
        height: u32,
    },
    BufferingStart,
    /// Buffered ranges as `[start_ms, end_ms]` pairs.
    BufferingUpdate { values: Vec<[u64; 2]> },
    BufferingEnd,
    Completed { key: String },
    Error { code: String, message: String },
}

impl PlayerEvent {
    /// Name carried by the record delivered to the host.
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Initialized { .. } => "initialized",
            PlayerEvent::BufferingStart => "bufferingStart",
            PlayerEvent::BufferingUpdate { .. } => "bufferingUpdate",
            PlayerEvent::BufferingEnd => "bufferingEnd",
            PlayerEvent::Completed { .. } => "completed",
            PlayerEvent::Error { .. } => "error",
        }
    }

    pub fn playback_error(message: impl Into<String>) -> Self {
        PlayerEvent::Error {
            code: PLAYBACK_ERROR_CODE.to_string(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlayerEvent::Error { .. })
    }
}

/// Map-like record handed to the host observer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventRecord {
    name: String,
    fields: Map<String, Value>,
}

impl EventRecord {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.fields.is_empty()
    }

    pub(crate) fn fill(&mut self, event: &PlayerEvent) {
        self.clear();
        self.name.push_str(event.name());
        if let Ok(Value::Object(mut fields)) = serde_json::to_value(event) {
            fields.remove("event");
            self.fields = fields;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.name.clear();
        self.fields.clear();
    }
}

/// Bounded free-list of [`EventRecord`]s.
///
/// Pre-warmed with `initial` records. Released records are cleared and kept
/// while fewer than `max` are idle; surplus records are dropped.
#[derive(Debug)]
pub struct EventPool {
    free: Mutex<Vec<EventRecord>>,
    max: usize,
}

impl EventPool {
    pub fn new(initial: usize, max: usize) -> Self {
        let max = max.max(initial);
        let free = (0..initial).map(|_| EventRecord::default()).collect();
        Self {
            free: Mutex::new(free),
            max,
        }
    }

    pub fn acquire(&self) -> EventRecord {
        self.free.lock().pop().unwrap_or_default()
    }

    pub fn release(&self, mut record: EventRecord) {
        record.clear();
        let mut free = self.free.lock();
        if free.len() < self.max {
            free.push(record);
        }
    }

    /// Idle records ready for reuse.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.max
    }
}

impl Default for EventPool {
    fn default() -> Self {
        Self::new(10, 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fill_initialized() {
        let mut record = EventRecord::default();
        record.fill(&PlayerEvent::Initialized {
            key: "main".into(),
            duration: 12_000,
            width: 1920,
            height: 1080,
        });

        assert_eq!(record.name(), "initialized");
        assert_eq!(record.get("key"), Some(&Value::from("main")));
        assert_eq!(record.get("duration"), Some(&Value::from(12_000)));
        assert_eq!(record.get("width"), Some(&Value::from(1920)));
        assert!(record.get("event").is_none());
    }

    #[test]
    fn test_record_fill_buffering_update() {
        let mut record = EventRecord::default();
        record.fill(&PlayerEvent::BufferingUpdate {
            values: vec![[0, 4_500]],
        });

        assert_eq!(record.name(), "bufferingUpdate");
        assert_eq!(record.get("values"), Some(&serde_json::json!([[0, 4500]])));
    }

    #[test]
    fn test_record_fill_unit_variant() {
        let mut record = EventRecord::default();
        record.fill(&PlayerEvent::BufferingEnd);
        assert_eq!(record.name(), "bufferingEnd");
        assert!(record.fields().is_empty());
    }

    #[test]
    fn test_pool_prewarm_and_cap() {
        let pool = EventPool::new(10, 30);
        assert_eq!(pool.available(), 10);

        let records: Vec<_> = (0..40).map(|_| pool.acquire()).collect();
        assert_eq!(pool.available(), 0);

        for record in records {
            pool.release(record);
        }
        assert_eq!(pool.available(), 30);
    }

    #[test]
    fn test_released_record_is_cleared() {
        let pool = EventPool::new(0, 1);
        let mut record = pool.acquire();
        record.fill(&PlayerEvent::Completed { key: "k".into() });
        pool.release(record);

        let reused = pool.acquire();
        assert!(reused.is_empty());
    }

    #[test]
    fn test_playback_error_code() {
        let event = PlayerEvent::playback_error("format error: 3001");
        assert!(event.is_error());
        match event {
            PlayerEvent::Error { code, message } => {
                assert_eq!(code, "VideoError");
                assert_eq!(message, "format error: 3001");
            }
            _ => unreachable!(),
        }
    }
}
