//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the streaming crates:
//! - Logging and tracing setup
//! - Player configuration
//! - Session event queue, event record pool and the service event bus

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{BufferConfig, PlayerConfig};
pub use error::{Error, Result};
