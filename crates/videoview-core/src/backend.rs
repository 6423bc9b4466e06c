//! Native engine abstraction
//!
//! A [`MediaBackend`] wraps one native player instance (ExoPlayer, AVPlayer,
//! an HTML media element, Shaka, an in-memory simulation). The session drives
//! it through the methods below and the backend reports back through
//! [`BackendEvent`]s delivered on the session's execution context.

use crate::source::MediaSource;
use crate::types::{SeekMode, TrackId, TrackInfo, TrackKind, VideoSize};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Trait for native player engines.
///
/// Positions and durations are milliseconds. Commands are fire-and-forget;
/// only preparation and track activation can fail synchronously; everything
/// else fails through [`BackendEvent::Error`].
pub trait MediaBackend {
    /// Hand a resolved source to the engine and begin loading it.
    fn prepare(&mut self, source: &MediaSource) -> Result<()>;

    /// Drop the current media item and release what it holds.
    fn stop(&mut self);

    /// Set the engine's play intent.
    fn play(&mut self);

    /// Clear the engine's play intent.
    fn pause(&mut self);

    /// Start an asynchronous seek, completed by [`BackendEvent::SeekCompleted`].
    fn seek(&mut self, position: u64, mode: SeekMode);

    fn set_volume(&mut self, volume: f32);

    fn set_speed(&mut self, speed: f32);

    /// Cap the video resolution adaptive streams may pick.
    fn set_max_resolution(&mut self, _width: u32, _height: u32) {}

    /// Cap the video bitrate adaptive streams may pick.
    fn set_max_bitrate(&mut self, _bitrate: u64) {}

    /// Enumerate the selectable tracks of `kind`.
    fn tracks(&self, kind: TrackKind) -> Vec<TrackInfo>;

    /// Activate one track of `kind`, or none.
    fn select_track(&mut self, kind: TrackKind, id: Option<TrackId>) -> Result<()>;

    /// The track of `kind` the engine is currently presenting.
    fn active_track(&self, kind: TrackKind) -> Option<TrackId>;

    fn position(&self) -> u64;

    /// `None` when unknown or infinite.
    fn duration(&self) -> Option<u64>;

    /// Live streams report no usable duration.
    fn is_live(&self) -> bool {
        matches!(self.duration(), None | Some(0))
    }

    /// End of the buffered range containing the current position.
    fn buffered_position(&self) -> u64;

    /// The engine is still fetching media.
    fn is_loading(&self) -> bool {
        false
    }

    /// The engine is waiting for data while it has a play intent.
    fn is_stalled(&self) -> bool {
        false
    }

    /// Playback reached the end of the media.
    fn has_ended(&self) -> bool {
        self.duration().is_some_and(|duration| self.position() >= duration)
    }

    fn video_size(&self) -> Option<VideoSize> {
        None
    }
}

/// Normalized native callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackendEvent {
    /// The engine can render the prepared media
    Ready,
    /// The last requested seek finished
    SeekCompleted,
    /// Playback reached the end
    Ended,
    /// Fatal engine error, carrying the engine's code name or message
    Error { message: String },
    /// The engine started or stopped waiting for data while playing
    Stalled { stalled: bool },
    /// The engine started or stopped fetching media
    LoadingChanged { loading: bool },
    /// The buffered ranges changed
    BufferChanged,
    /// The enumerated or active tracks of one kind changed
    TracksChanged { kind: TrackKind },
    /// Decoded video dimensions changed
    SizeChanged { size: VideoSize },
}
