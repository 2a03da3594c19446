//! # Host Bridge Traits
//!
//! Contracts between the streaming core and the host platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpEngine`](http::HttpEngine) - Mints session-configured HTTP clients
//! - [`EngineBuilder`](http::EngineBuilder) - Fallible, possibly blocking construction
//!   of the high-performance engine
//! - [`HttpClient`](http::HttpClient) - Buffered and streaming range requests
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map their transport failures onto `Network`, `Timeout` or
//! `HttpStatus` so the core can tell transport faults from caller mistakes
//! (see [`BridgeError::is_transport`]).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: engine callbacks and pre-cache
//! workers run on their own tasks.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

pub use http::{
    ByteRange, ByteStream, EngineBuilder, EngineKind, HttpClient, HttpClientOptions, HttpEngine,
    HttpMethod, HttpRequest, HttpResponse, StreamingResponse,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
