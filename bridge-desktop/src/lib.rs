//! # Desktop Bridge Implementations
//!
//! Default network engines for desktop platforms (macOS, Windows, Linux),
//! built on `reqwest`.
//!
//! ## Overview
//!
//! - [`StandardEngine`] - one client per session, always available
//! - [`PooledEngine`] - the high-performance engine, a single tuned client
//!   whose connection pool is shared by every session holding a lease
//! - [`ReqwestHttpClient`] - the `HttpClient` both engines hand out
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{PooledEngineBuilder, StandardEngine};
//! use core_playback::EngineRegistry;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(EngineRegistry::new(Some(Arc::new(PooledEngineBuilder::new()))));
//! let standard = Arc::new(StandardEngine::new());
//! ```

mod engine;
mod http;

pub use engine::{PooledEngine, PooledEngineBuilder, StandardEngine};
pub use http::ReqwestHttpClient;
