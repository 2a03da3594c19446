//! # Host Media Engine Contract
//!
//! Rendering and decoding are done by a host media engine. The session
//! drives it through [`MediaEngine`] and learns about state changes through
//! an [`EngineListener`], whose notifications are queued onto the session's
//! command loop instead of touching session state from engine threads.
//!
//! All engine methods are synchronous and are only ever called from the
//! session's own task.

use std::sync::Arc;

use core_runtime::BufferConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::decoder::DecoderRanker;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::retry::PlaybackFault;

/// Playback state reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Decoded video properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoFormat {
    pub width: u32,
    pub height: u32,
    pub rotation_degrees: u32,
}

impl VideoFormat {
    /// Size as displayed: width and height swap for 90 and 270 degree
    /// rotations.
    pub fn display_size(&self) -> (u32, u32) {
        match self.rotation_degrees % 360 {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }
}

/// Video track selection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackConstraints {
    pub max_video_size: Option<(u32, u32)>,
    pub max_bitrate: Option<u32>,
}

impl TrackConstraints {
    /// Zero means "no limit". Width and height only apply together; all
    /// zero clears every limit.
    pub fn from_limits(width: u32, height: u32, bitrate: u32) -> Self {
        Self {
            max_video_size: (width != 0 && height != 0).then_some((width, height)),
            max_bitrate: (bitrate != 0).then_some(bitrate),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.max_video_size.is_none() && self.max_bitrate.is_none()
    }
}

/// Something the engine wants the session to know.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineNotification {
    StateChanged(EngineState),
    Fault(PlaybackFault),
    BufferedPositionChanged(u64),
}

/// Handle the engine uses to report back. Cheap to clone, usable from any
/// thread; reports after the session ended are dropped.
#[derive(Debug, Clone)]
pub struct EngineListener {
    tx: mpsc::UnboundedSender<EngineNotification>,
}

impl EngineListener {
    pub fn new(tx: mpsc::UnboundedSender<EngineNotification>) -> Self {
        Self { tx }
    }

    pub fn on_state_changed(&self, state: EngineState) {
        let _ = self.tx.send(EngineNotification::StateChanged(state));
    }

    pub fn on_fault(&self, fault: PlaybackFault) {
        let _ = self.tx.send(EngineNotification::Fault(fault));
    }

    pub fn on_buffered_position_changed(&self, position_ms: u64) {
        let _ = self
            .tx
            .send(EngineNotification::BufferedPositionChanged(position_ms));
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Host media engine.
pub trait MediaEngine: Send {
    /// Replaces the current media with `pipeline`. The engine is expected
    /// to be stopped or idle.
    fn set_pipeline(&mut self, pipeline: Arc<Pipeline>);
    fn prepare(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, position_ms: u64);
    /// Seeks to the default position of the current window (the live edge
    /// for live streams).
    fn seek_to_default_position(&mut self);

    fn set_volume(&mut self, volume: f32);
    fn set_speed(&mut self, speed: f32);
    fn set_repeat(&mut self, repeat: bool);
    fn set_track_constraints(&mut self, constraints: TrackConstraints);
    fn set_preferred_audio_language(&mut self, language: &str);
    fn set_decoder_ranker(&mut self, ranker: Arc<DecoderRanker>);

    fn is_playing(&self) -> bool;
    fn is_live(&self) -> bool;
    fn position_ms(&self) -> u64;
    fn duration_ms(&self) -> u64;
    fn buffered_position_ms(&self) -> u64;
    /// Wall-clock start of the current window, when the timeline has one.
    fn window_start_ms(&self) -> Option<i64>;
    fn video_format(&self) -> Option<VideoFormat>;

    fn release(&mut self);
}

/// Creates one engine per session.
pub trait MediaEngineFactory: Send + Sync {
    fn create(&self, buffer: BufferConfig, listener: EngineListener) -> Result<Box<dyn MediaEngine>>;
}
