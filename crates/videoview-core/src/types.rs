//! Core types for VideoView

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player state machine states
///
/// States are ordered: `Idle < Opening < Ready < Playing`. Several rules are
/// expressed as "state above Opening" so the ordering is part of the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// No media loaded
    #[default]
    Idle,
    /// Media item set, waiting for the engine to become ready
    Opening,
    /// Media loaded, paused
    Ready,
    /// Actively playing
    Playing,
}

impl PlaybackState {
    /// Numeric code used by host bindings
    pub fn code(self) -> u8 {
        match self {
            PlaybackState::Idle => 0,
            PlaybackState::Opening => 1,
            PlaybackState::Ready => 2,
            PlaybackState::Playing => 3,
        }
    }

    /// Media has finished opening (Ready or Playing)
    pub fn is_loaded(self) -> bool {
        self >= PlaybackState::Ready
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Opening => write!(f, "opening"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Selectable track kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Subtitle,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

impl std::str::FromStr for TrackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "audio" => Ok(TrackKind::Audio),
            "subtitle" | "subtitles" | "text" => Ok(TrackKind::Subtitle),
            other => Err(format!("unknown track kind: {other}")),
        }
    }
}

/// Engine-native track identifier
///
/// Backends map their own addressing (group/track index pairs, element ids,
/// list positions) onto a single number that stays stable for one open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl From<u32> for TrackId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One selectable audio or subtitle stream as enumerated by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: TrackId,
    pub kind: TrackKind,
    /// Human-readable label
    #[serde(default)]
    pub title: Option<String>,
    /// IETF language tag, empty when unknown
    #[serde(default)]
    pub language: String,
    /// Codec or mime type
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub channels: Option<u32>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    /// Flagged as the main/primary track by the engine
    #[serde(default)]
    pub primary: bool,
}

impl TrackInfo {
    pub fn audio(id: u32, language: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Audio, language)
    }

    pub fn subtitle(id: u32, language: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Subtitle, language)
    }

    fn new(id: u32, kind: TrackKind, language: impl Into<String>) -> Self {
        Self {
            id: TrackId(id),
            kind,
            title: None,
            language: language.into(),
            format: None,
            channels: None,
            sample_rate: None,
            bit_rate: None,
            primary: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// Snapshot sent to the host in `mediaInfo`
    pub fn descriptor(&self) -> TrackDescriptor {
        let audio = self.kind == TrackKind::Audio;
        TrackDescriptor {
            title: self.title.clone(),
            language: self.language.clone(),
            format: self.format.clone(),
            channels: self.channels.filter(|_| audio),
            sample_rate: self.sample_rate.filter(|_| audio),
            bit_rate: self.bit_rate.filter(|_| audio),
        }
    }
}

/// Track metadata as delivered in the `mediaInfo` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u32>,
}

/// Decoded video dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoSize {
    pub width: f32,
    pub height: f32,
    /// Clockwise rotation in degrees
    #[serde(default)]
    pub rotation: u32,
}

impl VideoSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            rotation: 0,
        }
    }

    /// Both dimensions are known
    pub fn has_video(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Seek precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    /// May snap to the nearest keyframe
    Fast,
    /// Decode to the exact position
    Exact,
}

impl SeekMode {
    pub fn from_fast(fast: bool) -> Self {
        if fast {
            SeekMode::Fast
        } else {
            SeekMode::Exact
        }
    }
}
