//! # Decoder Ranking
//!
//! The host engine asks the [`DecoderRanker`] which decoder implementations
//! to try, in order, for a content type. Under the default hardware-first
//! policy, hardware decoders are moved ahead of software ones while keeping
//! the platform's relative order inside each class.

use crate::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Name prefixes of software decoder implementations.
const SOFTWARE_PREFIXES: &[&str] = &["omx.google.", "c2.android.", "c2.google.", "ffmpeg"];

/// Decoder ordering policy chosen per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DecoderPreference {
    /// Platform default, treated as hardware-first.
    #[default]
    Auto,
    HardwareFirst,
    SoftwareFirst,
}

impl DecoderPreference {
    /// Policy actually applied when ranking.
    pub fn effective(self) -> Self {
        match self {
            DecoderPreference::Auto => DecoderPreference::HardwareFirst,
            other => other,
        }
    }
}

impl From<u8> for DecoderPreference {
    fn from(code: u8) -> Self {
        match code {
            1 => DecoderPreference::HardwareFirst,
            2 => DecoderPreference::SoftwareFirst,
            _ => DecoderPreference::Auto,
        }
    }
}

impl From<DecoderPreference> for u8 {
    fn from(preference: DecoderPreference) -> Self {
        match preference {
            DecoderPreference::Auto => 0,
            DecoderPreference::HardwareFirst => 1,
            DecoderPreference::SoftwareFirst => 2,
        }
    }
}

/// One decoder implementation offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderInfo {
    pub name: String,
    pub mime_type: String,
}

impl DecoderInfo {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Name-based classification: known software prefixes, or a name that
    /// mentions `.sw.` or `software`.
    pub fn is_software(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        SOFTWARE_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
            || name.contains(".sw.")
            || name.contains("software")
    }
}

/// Memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecoderQuery {
    pub mime_type: String,
    pub secure: bool,
    pub tunneling: bool,
}

impl DecoderQuery {
    pub fn new(mime_type: impl Into<String>, secure: bool, tunneling: bool) -> Self {
        Self {
            mime_type: mime_type.into(),
            secure,
            tunneling,
        }
    }
}

/// Platform codec listing.
pub trait DecoderCatalog: Send + Sync {
    /// The platform's default ranked list.
    fn default_decoders(&self, query: &DecoderQuery) -> Result<Vec<DecoderInfo>>;

    /// The platform's own software-preferring list.
    fn software_preferred_decoders(&self, query: &DecoderQuery) -> Result<Vec<DecoderInfo>>;
}

/// Orders decoder candidates under a fixed [`DecoderPreference`].
pub struct DecoderRanker {
    catalog: Arc<dyn DecoderCatalog>,
    preference: DecoderPreference,
    memo: Mutex<HashMap<DecoderQuery, Arc<[DecoderInfo]>>>,
}

impl DecoderRanker {
    pub fn new(catalog: Arc<dyn DecoderCatalog>, preference: DecoderPreference) -> Self {
        Self {
            catalog,
            preference: preference.effective(),
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn preference(&self) -> DecoderPreference {
        self.preference
    }

    /// Ranked decoders for `mime_type`. The platform is queried at most once
    /// per `(mime_type, secure, tunneling)`.
    pub fn rank(&self, mime_type: &str, secure: bool, tunneling: bool) -> Result<Arc<[DecoderInfo]>> {
        let query = DecoderQuery::new(mime_type, secure, tunneling);
        if let Some(cached) = self.memo.lock().get(&query) {
            return Ok(Arc::clone(cached));
        }

        let ranked: Arc<[DecoderInfo]> = match self.preference {
            DecoderPreference::SoftwareFirst => {
                self.catalog.software_preferred_decoders(&query)?.into()
            }
            _ => hardware_first(self.catalog.default_decoders(&query)?).into(),
        };

        debug!(
            mime = mime_type,
            secure,
            tunneling,
            count = ranked.len(),
            policy = ?self.preference,
            "Ranked decoders"
        );

        let mut memo = self.memo.lock();
        let entry = memo.entry(query).or_insert(ranked);
        Ok(Arc::clone(entry))
    }
}

/// Stable partition: hardware entries first, then software entries.
pub fn hardware_first(decoders: Vec<DecoderInfo>) -> Vec<DecoderInfo> {
    if decoders.len() <= 1 {
        return decoders;
    }
    let (software, mut hardware): (Vec<_>, Vec<_>) =
        decoders.into_iter().partition(DecoderInfo::is_software);
    hardware.extend(software);
    hardware
}
