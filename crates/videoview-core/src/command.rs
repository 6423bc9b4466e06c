//! Player commands (host -> player)

use crate::types::{SessionId, TrackId, TrackKind};
use serde::{Deserialize, Serialize};

/// Remote-control commands accepted by a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    Open { source: String },
    Close,
    Play,
    Pause,
    SeekTo { position: u64, fast: bool },
    SetVolume { value: f32 },
    SetSpeed { value: f32 },
    SetLooping { value: bool },
    SetAutoPlay { value: bool },
    SetMaxResolution { width: f64, height: f64 },
    SetMaxBitrate { value: u64 },
    SetPreferredAudioLanguage { value: String },
    SetPreferredSubtitleLanguage { value: String },
    SetShowSubtitle { value: bool },
    SetKeepScreenOn { value: bool },
    OverrideTrack { kind: TrackKind, track_id: TrackId, enabled: bool },
}

impl Command {
    /// Wire name of the command
    pub fn method(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::Close => "close",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::SeekTo { .. } => "seekTo",
            Command::SetVolume { .. } => "setVolume",
            Command::SetSpeed { .. } => "setSpeed",
            Command::SetLooping { .. } => "setLooping",
            Command::SetAutoPlay { .. } => "setAutoPlay",
            Command::SetMaxResolution { .. } => "setMaxResolution",
            Command::SetMaxBitrate { .. } => "setMaxBitrate",
            Command::SetPreferredAudioLanguage { .. } => "setPreferredAudioLanguage",
            Command::SetPreferredSubtitleLanguage { .. } => "setPreferredSubtitleLanguage",
            Command::SetShowSubtitle { .. } => "setShowSubtitle",
            Command::SetKeepScreenOn { .. } => "setKeepScreenOn",
            Command::OverrideTrack { .. } => "overrideTrack",
        }
    }
}

/// A command addressed to one player of a registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub id: SessionId,
    #[serde(flatten)]
    pub command: Command,
}

impl MethodCall {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
