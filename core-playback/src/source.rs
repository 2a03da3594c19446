//! # Source Descriptors
//!
//! A [`SourceRequest`] is what the host hands to `setSource`. It is resolved
//! once into an immutable [`SourceDescriptor`]: protocol class, content
//! format, cache settings and DRM are fixed at that point and the descriptor
//! is only ever replaced, never mutated.

use crate::decoder::DecoderPreference;
use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

const RTMP_SCHEMES: &[&str] = &["rtmp", "rtmps", "rtmpe", "rtmpt", "rtmpte", "rtmpts"];
const HTTP_SCHEMES: &[&str] = &["http", "https"];

/// Transport family of a source URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Http,
    Rtmp,
    Rtsp,
    /// Local files, assets and anything the host engine resolves itself.
    Other,
}

impl Protocol {
    pub fn from_scheme(scheme: &str) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        if HTTP_SCHEMES.contains(&scheme.as_str()) {
            Protocol::Http
        } else if RTMP_SCHEMES.contains(&scheme.as_str()) {
            Protocol::Rtmp
        } else if scheme == "rtsp" {
            Protocol::Rtsp
        } else {
            Protocol::Other
        }
    }
}

/// Container / packaging of the media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Hls,
    Dash,
    SmoothStreaming,
    Progressive,
}

impl ContentFormat {
    pub fn is_adaptive(&self) -> bool {
        !matches!(self, ContentFormat::Progressive)
    }

    /// Parse an explicit format hint. `other` selects progressive playback.
    pub fn from_hint(hint: &str) -> Result<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "hls" => Ok(ContentFormat::Hls),
            "dash" => Ok(ContentFormat::Dash),
            "ss" => Ok(ContentFormat::SmoothStreaming),
            "other" | "" => Ok(ContentFormat::Progressive),
            unknown => Err(PlaybackError::UnsupportedMediaType(format!(
                "unknown format hint '{}'",
                unknown
            ))),
        }
    }

    /// Infer the format from the URI alone.
    pub fn infer(uri: &Url) -> Self {
        let full = uri.as_str().to_ascii_lowercase();

        if full.ends_with(".m3u8") || full.contains(".m3u8?") {
            return ContentFormat::Hls;
        }
        if full.ends_with(".mpd") || full.contains(".mpd?") {
            return ContentFormat::Dash;
        }
        if full.ends_with(".ism") || full.contains(".ism/") {
            return ContentFormat::SmoothStreaming;
        }

        let last_segment = uri
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_ascii_lowercase))
            .unwrap_or_default();
        if let Some(format) = Self::from_file_name(&last_segment) {
            return format;
        }

        if uri.path().to_ascii_lowercase().contains("m3u8") {
            return ContentFormat::Hls;
        }
        ContentFormat::Progressive
    }

    fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".m3u8") {
            Some(ContentFormat::Hls)
        } else if name.ends_with(".mpd") {
            Some(ContentFormat::Dash)
        } else if name.ends_with(".ism") || name.ends_with(".isml") {
            Some(ContentFormat::SmoothStreaming)
        } else {
            None
        }
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentFormat::Hls => "hls",
            ContentFormat::Dash => "dash",
            ContentFormat::SmoothStreaming => "ss",
            ContentFormat::Progressive => "progressive",
        };
        f.write_str(name)
    }
}

/// DRM scheme attached to a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum DrmConfig {
    Widevine {
        license_url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    ClearKey { key: String },
}

/// Cache sizing requested for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Ceiling for the whole cache store.
    pub max_cache_size: u64,
    /// Largest span file written for one entry.
    pub max_file_size: u64,
}

impl CacheSettings {
    /// `None` unless caching is requested and both limits are positive.
    pub fn requested(use_cache: bool, max_cache_size: u64, max_file_size: u64) -> Option<Self> {
        (use_cache && max_cache_size > 0 && max_file_size > 0).then_some(Self {
            max_cache_size,
            max_file_size,
        })
    }
}

/// Parameters of a `setSource` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRequest {
    /// Identity reported back in `initialized` and `completed` events.
    #[serde(default)]
    pub key: String,
    pub uri: String,
    #[serde(default)]
    pub format_hint: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub use_cache: bool,
    #[serde(default)]
    pub max_cache_size: u64,
    #[serde(default)]
    pub max_cache_file_size: u64,
    /// Clip playback to `[0, clip_duration_ms)` when positive.
    #[serde(default)]
    pub clip_duration_ms: u64,
    #[serde(default)]
    pub drm: Option<DrmConfig>,
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub decoder_preference: DecoderPreference,
}

impl SourceRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            uri: uri.into(),
            format_hint: None,
            headers: HashMap::new(),
            use_cache: false,
            max_cache_size: 0,
            max_cache_file_size: 0,
            clip_duration_ms: 0,
            drm: None,
            cache_key: None,
            decoder_preference: DecoderPreference::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache(mut self, max_cache_size: u64, max_cache_file_size: u64) -> Self {
        self.use_cache = true;
        self.max_cache_size = max_cache_size;
        self.max_cache_file_size = max_cache_file_size;
        self
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    pub fn with_clip_duration_ms(mut self, duration_ms: u64) -> Self {
        self.clip_duration_ms = duration_ms;
        self
    }

    pub fn with_drm(mut self, drm: DrmConfig) -> Self {
        self.drm = Some(drm);
        self
    }

    pub fn with_decoder_preference(mut self, preference: DecoderPreference) -> Self {
        self.decoder_preference = preference;
        self
    }
}

/// Resolved, immutable description of what a session plays.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDescriptor {
    pub key: String,
    pub uri: Url,
    pub protocol: Protocol,
    pub format: ContentFormat,
    pub headers: HashMap<String, String>,
    pub cache_key: Option<String>,
    pub cache: Option<CacheSettings>,
    pub drm: Option<DrmConfig>,
    pub clip_end_ms: Option<u64>,
    pub decoder_preference: DecoderPreference,
}

impl SourceDescriptor {
    pub fn from_request(request: &SourceRequest) -> Result<Self> {
        let uri = parse_uri(&request.uri)?;
        let protocol = Protocol::from_scheme(uri.scheme());

        let format = match protocol {
            Protocol::Rtmp | Protocol::Rtsp => match request.format_hint.as_deref() {
                Some(hint) if ContentFormat::from_hint(hint)?.is_adaptive() => {
                    return Err(PlaybackError::UnsupportedMediaType(format!(
                        "format '{}' cannot be streamed over {}",
                        hint,
                        uri.scheme()
                    )));
                }
                _ => ContentFormat::Progressive,
            },
            Protocol::Http | Protocol::Other => match request.format_hint.as_deref() {
                Some(hint) => ContentFormat::from_hint(hint)?,
                None => ContentFormat::infer(&uri),
            },
        };

        let cache_key = request
            .cache_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .cloned();

        Ok(Self {
            key: request.key.clone(),
            uri,
            protocol,
            format,
            headers: request.headers.clone(),
            cache_key,
            cache: CacheSettings::requested(
                request.use_cache,
                request.max_cache_size,
                request.max_cache_file_size,
            ),
            drm: request.drm.clone(),
            clip_end_ms: (request.clip_duration_ms > 0).then_some(request.clip_duration_ms),
            decoder_preference: request.decoder_preference,
        })
    }

    /// Key under which the source's bytes are cached.
    pub fn cache_key(&self) -> String {
        self.cache_key
            .clone()
            .unwrap_or_else(|| self.uri.to_string())
    }

    /// Liveness known from the descriptor alone. `None` means the engine
    /// decides once the media is prepared.
    pub fn known_live(&self) -> Option<bool> {
        match self.protocol {
            Protocol::Rtmp | Protocol::Rtsp => Some(true),
            _ if self.format == ContentFormat::Hls
                && self.uri.as_str().to_ascii_lowercase().contains("live") =>
            {
                Some(true)
            }
            _ => None,
        }
    }
}

/// Parse a host URI. Bare absolute paths are treated as local files.
pub fn parse_uri(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PlaybackError::InvalidParams("uri is empty".to_string()));
    }
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(err) if raw.starts_with('/') => Url::from_file_path(raw)
            .map_err(|_| PlaybackError::InvalidUri(format!("{}: {}", raw, err))),
        Err(err) => Err(PlaybackError::InvalidUri(format!("{}: {}", raw, err))),
    }
}
