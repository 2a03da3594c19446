//! # Events
//!
//! Two delivery paths leave the core:
//!
//! - **Per-session player events** ([`PlayerEvent`]) travel through an
//!   [`EventQueue`]. The host observer may attach late, so the queue buffers
//!   until it does and then forwards synchronously. Records are borrowed from
//!   a bounded [`EventPool`].
//! - **Service events** ([`ServiceEvent`]) describe work that is not tied to
//!   a single session (pre-cache jobs, cache maintenance, session lifecycle)
//!   and are broadcast on an [`EventBus`].
//!
//! ```text
//! ┌──────────────┐  send   ┌────────────┐  attach/drain  ┌──────────────┐
//! │ Session actor├────────>│ EventQueue ├───────────────>│ EventSink    │
//! └──────────────┘         └────────────┘                │ (host)       │
//!                                                       └──────────────┘
//! ┌──────────────┐  emit   ┌────────────┐   subscribe    ┌──────────────┐
//! │ Pre-cache    ├────────>│ EventBus   ├───────────────>│ EventStream  │
//! └──────────────┘         └────────────┘                └──────────────┘
//! ```

mod bus;
mod player;
mod queue;

pub use bus::{
    CacheEvent, EventBus, EventSeverity, EventStream, PreCacheEvent, ServiceEvent, SessionEvent,
    DEFAULT_EVENT_BUFFER_SIZE,
};
pub use player::{EventPool, EventRecord, PlayerEvent, PLAYBACK_ERROR_CODE};
pub use queue::{EventQueue, EventSink};

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;
