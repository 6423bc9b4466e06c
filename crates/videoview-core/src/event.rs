//! Normalized player events
//!
//! Events serialize to the host wire format, a map tagged by `event`:
//!
//! ```text
//! {"event":"mediaInfo","duration":10000,"audioTracks":{...},"subtitleTracks":{...},"source":"video.mp4"}
//! {"event":"position","value":5000}
//! {"event":"seekEnd"}
//! ```

use crate::types::{SessionId, TrackDescriptor, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

/// Player event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlayerEvent {
    /// Fatal error, the session is back to idle
    Error { value: String },

    /// Media opened
    MediaInfo {
        /// Milliseconds, 0 for live streams
        duration: u64,
        audio_tracks: BTreeMap<TrackId, TrackDescriptor>,
        subtitle_tracks: BTreeMap<TrackId, TrackDescriptor>,
        source: String,
    },

    /// Playback position in milliseconds
    Position { value: u64 },

    /// Buffered range around the current position
    Buffer { start: u64, end: u64 },

    /// Playback stalled or recovered
    Loading { value: bool },

    /// A seek finished
    SeekEnd,

    VideoSize { width: f32, height: f32, rotation: u32 },

    /// Playback reached the end
    Finished,

    Playing { value: bool },

    Speed { value: f32 },

    Volume { value: f32 },

    /// The engine changed subtitle visibility on its own
    ShowSubtitle { value: bool },

    /// The engine switched to another audio track on its own
    OverrideAudio { value: TrackId },

    /// The engine switched to another subtitle track on its own
    OverrideSubtitle { value: TrackId },
}

impl PlayerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::Error { .. } => "error",
            PlayerEvent::MediaInfo { .. } => "mediaInfo",
            PlayerEvent::Position { .. } => "position",
            PlayerEvent::Buffer { .. } => "buffer",
            PlayerEvent::Loading { .. } => "loading",
            PlayerEvent::SeekEnd => "seekEnd",
            PlayerEvent::VideoSize { .. } => "videoSize",
            PlayerEvent::Finished => "finished",
            PlayerEvent::Playing { .. } => "playing",
            PlayerEvent::Speed { .. } => "speed",
            PlayerEvent::Volume { .. } => "volume",
            PlayerEvent::ShowSubtitle { .. } => "showSubtitle",
            PlayerEvent::OverrideAudio { .. } => "overrideAudio",
            PlayerEvent::OverrideSubtitle { .. } => "overrideSubtitle",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Event tagged with the player that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub id: SessionId,
    #[serde(flatten)]
    pub event: PlayerEvent,
}

/// Destination of a session's events
pub trait EventSink {
    fn emit(&mut self, event: PlayerEvent);
}

impl EventSink for Vec<PlayerEvent> {
    fn emit(&mut self, event: PlayerEvent) {
        self.push(event);
    }
}

impl EventSink for mpsc::UnboundedSender<PlayerEvent> {
    fn emit(&mut self, event: PlayerEvent) {
        // A dropped receiver means nobody listens anymore
        let _ = self.send(event);
    }
}

/// Forwards events of one player into a shared host channel
#[derive(Debug, Clone)]
pub struct TaggedSink {
    id: SessionId,
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl TaggedSink {
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self { id, tx }
    }
}

impl EventSink for TaggedSink {
    fn emit(&mut self, event: PlayerEvent) {
        let _ = self.tx.send(HostEvent { id: self.id, event });
    }
}
