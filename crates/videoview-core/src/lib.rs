//! VideoView Core - embeddable video player logic
//!
//! This crate provides the platform-independent half of a video view:
//! - Source classification (asset, file, network) and manifest detection
//! - Language-tag matching and default track selection
//! - The playback state machine (idle, opening, ready, playing)
//! - Normalized events for the host, tagged per player
//! - A tokio controller per player and a registry routing host calls
//!
//! Native engines (ExoPlayer, AVPlayer, HTML media elements) plug in through
//! [`MediaBackend`]; [`sim::SimulatedBackend`] stands in for them in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        VideoView Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   host ──MethodCall──▶ ┌──────────────┐ ◀──HostEvent── host     │
//! │                        │   Registry   │                         │
//! │                        └──────┬───────┘                         │
//! │                               │                                 │
//! │                        ┌──────┴───────┐   ┌──────────────┐      │
//! │                        │  Controller  │──▶│ KeepScreenOn │      │
//! │                        │ (tokio task) │   └──────────────┘      │
//! │                        └──────┬───────┘                         │
//! │                               │                                 │
//! │  ┌──────────────┐      ┌──────┴───────┐    ┌──────────────┐     │
//! │  │    Track     │─────▶│    Player    │───▶│    Event     │     │
//! │  │   Selector   │      │   Session    │    │     Sink     │     │
//! │  └──────────────┘      └──────┬───────┘    └──────────────┘     │
//! │                               │                                 │
//! │                        ┌──────┴───────┐                         │
//! │                        │ MediaBackend │ ExoPlayer / AVPlayer /  │
//! │                        │              │ HTML / simulated        │
//! │                        └──────────────┘                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod language;
pub mod registry;
pub mod screen;
pub mod selection;
pub mod session;
pub mod sim;
pub mod source;
pub mod types;

pub use backend::{BackendEvent, MediaBackend};
pub use command::{Command, MethodCall};
pub use config::PlayerConfig;
pub use controller::{spawn_player, BackendNotifier, PlayerController, PlayerHandle, PlayerSnapshot};
pub use error::{Error, Result};
pub use event::{EventSink, HostEvent, PlayerEvent, TaggedSink};
pub use registry::PlayerRegistry;
pub use screen::{KeepScreenOn, ScreenWake};
pub use selection::TrackSelector;
pub use session::PlayerSession;
pub use source::{detect_manifest_type, ManifestType, MediaSource, SourceKind};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "VideoView Core initialized");
}
