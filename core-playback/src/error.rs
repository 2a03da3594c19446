//! # Playback Error Types
//!
//! Errors raised inside the streaming core. Each variant maps to a stable
//! code (see [`PlaybackError::code`]) that is safe to hand to the host.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// No pipeline kind can play the described source.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A source or pre-cache request is missing required fields.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// The URI could not be parsed.
    #[error("Invalid source URI: {0}")]
    InvalidUri(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The session was disposed and accepts no further commands.
    #[error("Session disposed")]
    Disposed,

    /// Unknown session handle.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The host media engine rejected an operation.
    #[error("Media engine error: {0}")]
    Engine(String),

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Network engine or transfer failure.
    #[error("Network error: {0}")]
    Network(#[from] BridgeError),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Writing would exceed the cache ceiling even after eviction.
    #[error("Cache storage full: need {needed} bytes, ceiling {ceiling} bytes")]
    CacheFull { needed: u64, ceiling: u64 },

    /// Another writer holds the key.
    #[error("Cache key locked: {0}")]
    CacheLocked(String),

    #[error("Failed to clear cache: {0}")]
    ClearCache(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Pre-cache cancelled")]
    Cancelled,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Stable code reported to the host alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            PlaybackError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            PlaybackError::InvalidParams(_) | PlaybackError::InvalidUri(_) => "INVALID_PARAMS",
            PlaybackError::Disposed => "DISPOSED",
            PlaybackError::SessionNotFound(_) => "NO_SESSION",
            PlaybackError::ClearCache(_) => "CLEAR_CACHE_ERROR",
            PlaybackError::CacheError(_)
            | PlaybackError::CacheFull { .. }
            | PlaybackError::CacheLocked(_) => "CACHE_ERROR",
            PlaybackError::Cancelled => "CANCELLED",
            _ => "VideoError",
        }
    }

    /// Returns `true` when the network transport itself failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, PlaybackError::Network(err) if err.is_transport())
    }

    /// Returns `true` for faults of the cache layer, which never surface.
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::CacheError(_)
                | PlaybackError::CacheFull { .. }
                | PlaybackError::CacheLocked(_)
        )
    }

    /// Returns `true` for faults that retrying cannot fix.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnsupportedMediaType(_)
                | PlaybackError::InvalidParams(_)
                | PlaybackError::InvalidUri(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
