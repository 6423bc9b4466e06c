//! Error types for VideoView Core

use thiserror::Error;

use crate::types::{SessionId, TrackId, TrackKind};

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Source errors
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    // Native engine errors
    #[error("Failed to prepare media: {0}")]
    Prepare(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Track selection failed: {0}")]
    TrackSelection(String),

    #[error("Unknown {kind} track: {id}")]
    UnknownTrack { kind: TrackKind, id: TrackId },

    // Host binding errors
    #[error("Unknown player: {0}")]
    UnknownPlayer(SessionId),

    #[error("Player closed: {0}")]
    PlayerClosed(SessionId),

    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] serde_json::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true if the error came from the native engine
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            Error::Prepare(_) | Error::Playback(_) | Error::TrackSelection(_)
        )
    }

    /// Returns the stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::Prepare(_) => "PREPARE",
            Error::Playback(_) => "PLAYBACK",
            Error::TrackSelection(_) => "TRACK_SELECTION",
            Error::UnknownTrack { .. } => "UNKNOWN_TRACK",
            Error::UnknownPlayer(_) => "UNKNOWN_PLAYER",
            Error::PlayerClosed(_) => "PLAYER_CLOSED",
            Error::InvalidCommand(_) => "INVALID_COMMAND",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO",
        }
    }

    /// Short string delivered through the `error` event.
    ///
    /// Engine failures carry the engine's own code name untouched so hosts can
    /// match on it. Everything else is reported by its error code.
    pub fn event_value(&self) -> String {
        match self {
            Error::Prepare(msg) | Error::Playback(msg) | Error::TrackSelection(msg) => msg.clone(),
            other => other.error_code().to_string(),
        }
    }
}
