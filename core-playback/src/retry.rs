//! # Fault Recovery
//!
//! [`RetryMachine`] decides what a session does about a playback fault
//! reported by the host engine:
//!
//! | Fault class          | Action                                              |
//! |----------------------|-----------------------------------------------------|
//! | decoder              | ignored, the engine falls back on its own           |
//! | behind live window   | seek to the live edge and prepare again             |
//! | format               | retry if network-classified, then fatal             |
//! | generic              | retry if network-classified, then downgrade, then fatal |
//!
//! Retries are bounded by [`RetryPolicy::max_attempts`] and reset whenever
//! the engine reaches `Ready` or a new source is set. Only one retry is ever
//! pending; faults that arrive while it waits are dropped.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use core_runtime::config::RetryConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Fault codes reported by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCode {
    DecoderInitFailed,
    DecoderQueryFailed,
    DecodingFailed,
    IoUnspecified,
    ConnectionFailed,
    ConnectionTimeout,
    ReadPositionOutOfRange,
    ParsingContainerMalformed,
    ParsingManifestMalformed,
    ParsingContainerUnsupported,
    ParsingManifestUnsupported,
    BehindLiveWindow,
    /// Any other engine code.
    Other(i32),
}

/// Recovery class of a fault code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    Decoder,
    Format,
    BehindLiveWindow,
    Generic,
}

impl FaultCode {
    pub fn class(&self) -> FaultClass {
        match self {
            FaultCode::DecoderInitFailed
            | FaultCode::DecoderQueryFailed
            | FaultCode::DecodingFailed => FaultClass::Decoder,
            FaultCode::IoUnspecified
            | FaultCode::ParsingContainerMalformed
            | FaultCode::ParsingManifestMalformed
            | FaultCode::ParsingContainerUnsupported
            | FaultCode::ParsingManifestUnsupported => FaultClass::Format,
            FaultCode::BehindLiveWindow => FaultClass::BehindLiveWindow,
            _ => FaultClass::Generic,
        }
    }

    pub fn name(&self) -> String {
        match self {
            FaultCode::DecoderInitFailed => "decoder_init_failed".into(),
            FaultCode::DecoderQueryFailed => "decoder_query_failed".into(),
            FaultCode::DecodingFailed => "decoding_failed".into(),
            FaultCode::IoUnspecified => "io_unspecified".into(),
            FaultCode::ConnectionFailed => "io_network_connection_failed".into(),
            FaultCode::ConnectionTimeout => "io_network_connection_timeout".into(),
            FaultCode::ReadPositionOutOfRange => "io_read_position_out_of_range".into(),
            FaultCode::ParsingContainerMalformed => "parsing_container_malformed".into(),
            FaultCode::ParsingManifestMalformed => "parsing_manifest_malformed".into(),
            FaultCode::ParsingContainerUnsupported => "parsing_container_unsupported".into(),
            FaultCode::ParsingManifestUnsupported => "parsing_manifest_unsupported".into(),
            FaultCode::BehindLiveWindow => "behind_live_window".into(),
            FaultCode::Other(code) => format!("error_{}", code),
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A fault raised by the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFault {
    pub code: FaultCode,
    pub message: Option<String>,
}

impl PlaybackFault {
    pub fn new(code: FaultCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    pub fn with_message(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }
}

/// Decides whether a fault is caused by the network.
pub trait NetworkFaultPredicate: Send + Sync {
    fn is_network_fault(&self, fault: &PlaybackFault) -> bool;
}

/// Codes that always count as network faults.
const NETWORK_CODES: &[FaultCode] = &[
    FaultCode::ConnectionFailed,
    FaultCode::ConnectionTimeout,
    FaultCode::ReadPositionOutOfRange,
    FaultCode::ParsingContainerMalformed,
    FaultCode::ParsingManifestMalformed,
];

const DEFAULT_KEYWORDS: &[&str] = &[
    "network",
    "timeout",
    "connection",
    "failed to connect",
    "unable to connect",
    "sockettimeout",
];

/// Default classification: fixed network codes, plus unspecified I/O faults
/// whose message mentions one of the keywords.
#[derive(Debug, Clone)]
pub struct KeywordNetworkPredicate {
    keywords: Vec<String>,
}

impl KeywordNetworkPredicate {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.into().to_lowercase())
                .collect(),
        }
    }
}

impl Default for KeywordNetworkPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().copied())
    }
}

impl NetworkFaultPredicate for KeywordNetworkPredicate {
    fn is_network_fault(&self, fault: &PlaybackFault) -> bool {
        if NETWORK_CODES.contains(&fault.code) {
            return true;
        }
        if fault.code != FaultCode::IoUnspecified {
            return false;
        }
        let Some(message) = fault.message.as_deref() else {
            return false;
        };
        let message = message.to_lowercase();
        self.keywords.iter().any(|keyword| message.contains(keyword))
    }
}

/// Session state as seen by the recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Idle,
    Buffering,
    Ready,
    Retrying,
    Fatal,
}

/// Retry bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_millis(500),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.delay(),
        }
    }
}

/// What the engine was doing when the fault arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaultContext {
    pub is_live: bool,
    pub is_playing: bool,
    pub high_performance_in_use: bool,
}

/// Decision for one fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    Ignore,
    /// Seek to the default live position and prepare again.
    SeekToLiveEdge,
    /// Re-attach the current pipeline after `delay`.
    ScheduleRetry { attempt: u32, delay: Duration },
    /// Rebuild the pipeline on the standard engine now.
    Downgrade,
    /// Surface one error event and stop recovering.
    Fatal { message: String },
}

/// Per-session fault bookkeeping.
pub struct RetryMachine {
    policy: RetryPolicy,
    predicate: Arc<dyn NetworkFaultPredicate>,
    attempts: u32,
    retrying: bool,
    was_playing: bool,
    downgraded: bool,
    phase: SessionPhase,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy, predicate: Arc<dyn NetworkFaultPredicate>) -> Self {
        Self {
            policy,
            predicate,
            attempts: 0,
            retrying: false,
            was_playing: false,
            downgraded: false,
            phase: SessionPhase::Idle,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_retrying(&self) -> bool {
        self.retrying
    }

    pub fn has_downgraded(&self) -> bool {
        self.downgraded
    }

    /// Whether playback was running before the last fault.
    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    pub fn on_fault(&mut self, fault: &PlaybackFault, ctx: FaultContext) -> RecoveryAction {
        if self.phase == SessionPhase::Fatal {
            debug!(code = %fault.code, "Fault after fatal error ignored");
            return RecoveryAction::Ignore;
        }
        if !ctx.is_live {
            self.was_playing = ctx.is_playing;
        }

        let class = fault.code.class();
        match class {
            FaultClass::Decoder => {
                debug!(code = %fault.code, "Decoder fault left to the engine");
                return RecoveryAction::Ignore;
            }
            FaultClass::BehindLiveWindow => {
                info!("Fell behind the live window, seeking to live edge");
                return RecoveryAction::SeekToLiveEdge;
            }
            FaultClass::Format | FaultClass::Generic => {}
        }

        if self.retrying {
            debug!(code = %fault.code, "Retry already pending, fault coalesced");
            return RecoveryAction::Ignore;
        }

        let network = self.predicate.is_network_fault(fault);
        if network && self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            self.retrying = true;
            self.phase = SessionPhase::Retrying;
            info!(
                code = %fault.code,
                attempt = self.attempts,
                max = self.policy.max_attempts,
                "Scheduling network retry"
            );
            return RecoveryAction::ScheduleRetry {
                attempt: self.attempts,
                delay: self.policy.delay,
            };
        }

        if network
            && class == FaultClass::Generic
            && ctx.high_performance_in_use
            && !self.downgraded
        {
            self.downgraded = true;
            self.phase = SessionPhase::Buffering;
            warn!(code = %fault.code, "Retries exhausted, falling back to standard engine");
            return RecoveryAction::Downgrade;
        }

        self.phase = SessionPhase::Fatal;
        self.retrying = false;
        let message = match class {
            FaultClass::Format => format!("format error: {}", fault.code),
            _ => format!("playback error: {}", fault.code),
        };
        warn!(code = %fault.code, detail = ?fault.message, "Unrecoverable playback fault");
        RecoveryAction::Fatal { message }
    }

    /// The scheduled retry is running. Returns whether playback resumes.
    pub fn on_retry_fired(&mut self, is_live: bool) -> bool {
        self.retrying = false;
        self.phase = SessionPhase::Buffering;
        self.should_resume(is_live)
    }

    /// Whether a reloaded pipeline starts playing. Live streams always do.
    pub fn should_resume(&self, is_live: bool) -> bool {
        is_live || self.was_playing
    }

    /// The retry could not run.
    pub fn fail(&mut self) {
        self.reset_counters();
        self.phase = SessionPhase::Fatal;
    }

    pub fn on_buffering(&mut self) {
        if !matches!(self.phase, SessionPhase::Fatal | SessionPhase::Retrying) {
            self.phase = SessionPhase::Buffering;
        }
    }

    pub fn on_ready(&mut self) {
        if self.phase == SessionPhase::Fatal {
            return;
        }
        self.reset_counters();
        self.phase = SessionPhase::Ready;
    }

    /// A new source was set.
    pub fn reset(&mut self) {
        self.reset_counters();
        self.phase = SessionPhase::Idle;
    }

    fn reset_counters(&mut self) {
        self.attempts = 0;
        self.retrying = false;
        self.was_playing = false;
    }
}

impl fmt::Debug for RetryMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryMachine")
            .field("policy", &self.policy)
            .field("attempts", &self.attempts)
            .field("retrying", &self.retrying)
            .field("downgraded", &self.downgraded)
            .field("phase", &self.phase)
            .finish()
    }
}
