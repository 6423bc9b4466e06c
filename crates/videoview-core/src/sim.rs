//! In-memory engine
//!
//! [`SimulatedBackend`] behaves like a native player without decoding
//! anything: positions move only when [`SimulatedBackend::advance`] is called
//! and callbacks are delivered by whoever drives it. Clones share state, so a
//! test can keep one handle while the session owns another.

use crate::backend::MediaBackend;
use crate::source::MediaSource;
use crate::types::{SeekMode, TrackId, TrackInfo, TrackKind, VideoSize};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Description of the media the engine finds when it prepares a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatedMedia {
    /// Milliseconds, `None` for live streams
    pub duration: Option<u64>,
    pub tracks: Vec<TrackInfo>,
    pub video_size: Option<VideoSize>,
}

impl SimulatedMedia {
    pub fn new(duration: Option<u64>) -> Self {
        Self { duration, ..Self::default() }
    }

    pub fn with_track(mut self, track: TrackInfo) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_video_size(mut self, size: VideoSize) -> Self {
        self.video_size = Some(size);
        self
    }
}

#[derive(Debug, Default)]
struct SimState {
    media: SimulatedMedia,
    prepared: Option<MediaSource>,
    playing: bool,
    position: u64,
    buffered: u64,
    loading: bool,
    stalled: bool,
    volume: f32,
    speed: f32,
    active_audio: Option<TrackId>,
    active_subtitle: Option<TrackId>,
    seek_pending: bool,
    seeks: Vec<(u64, SeekMode)>,
    max_resolution: Option<(u32, u32)>,
    max_bitrate: Option<u64>,
    fail_prepare: Option<String>,
    fail_select: Option<String>,
}

/// Shared-state simulated engine
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new(media: SimulatedMedia) -> Self {
        let state = SimState { media, volume: 1.0, speed: 1.0, ..SimState::default() };
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the state from the others
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the media found by the next `prepare`
    pub fn load(&self, media: SimulatedMedia) {
        self.state().media = media;
    }

    /// Move the playhead by `elapsed` ms of wall time. Returns true when the
    /// end was reached, at which point the engine stops playing.
    pub fn advance(&self, elapsed: u64) -> bool {
        let mut state = self.state();
        if !state.playing || state.prepared.is_none() || state.stalled {
            return false;
        }
        let moved = (elapsed as f64 * f64::from(state.speed)) as u64;
        let position = state.position.saturating_add(moved);
        state.buffered = state.buffered.max(position);
        match state.media.duration {
            Some(duration) if duration > 0 && position >= duration => {
                state.position = duration;
                state.playing = false;
                true
            }
            _ => {
                state.position = position;
                false
            }
        }
    }

    /// Finish the seek in flight. Returns false when none was pending.
    pub fn complete_seek(&self) -> bool {
        std::mem::take(&mut self.state().seek_pending)
    }

    /// Switch tracks the way native controls do, behind the session's back
    pub fn activate(&self, kind: TrackKind, id: Option<TrackId>) {
        let mut state = self.state();
        match kind {
            TrackKind::Audio => state.active_audio = id,
            TrackKind::Subtitle => state.active_subtitle = id,
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.state().loading = loading;
    }

    pub fn set_stalled(&self, stalled: bool) {
        self.state().stalled = stalled;
    }

    pub fn set_buffered(&self, buffered: u64) {
        self.state().buffered = buffered;
    }

    /// Make the next `prepare` fail with `message`
    pub fn fail_next_prepare(&self, message: impl Into<String>) {
        self.state().fail_prepare = Some(message.into());
    }

    /// Make the next track activation fail with `message`
    pub fn fail_track_selection(&self, message: impl Into<String>) {
        self.state().fail_select = Some(message.into());
    }

    pub fn is_prepared(&self) -> bool {
        self.state().prepared.is_some()
    }

    pub fn prepared_url(&self) -> Option<String> {
        self.state().prepared.as_ref().map(|source| source.url.to_string())
    }

    pub fn is_playing(&self) -> bool {
        self.state().playing
    }

    pub fn volume(&self) -> f32 {
        self.state().volume
    }

    pub fn speed(&self) -> f32 {
        self.state().speed
    }

    /// Every seek issued since creation
    pub fn seeks(&self) -> Vec<(u64, SeekMode)> {
        self.state().seeks.clone()
    }

    pub fn max_resolution(&self) -> Option<(u32, u32)> {
        self.state().max_resolution
    }

    pub fn max_bitrate(&self) -> Option<u64> {
        self.state().max_bitrate
    }
}

impl MediaBackend for SimulatedBackend {
    fn prepare(&mut self, source: &MediaSource) -> Result<()> {
        let mut state = self.state();
        if let Some(message) = state.fail_prepare.take() {
            return Err(Error::Prepare(message));
        }
        state.prepared = Some(source.clone());
        state.playing = false;
        state.position = 0;
        state.buffered = 0;
        state.active_audio = None;
        state.active_subtitle = None;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state();
        state.prepared = None;
        state.playing = false;
        state.position = 0;
        state.buffered = 0;
        state.loading = false;
        state.stalled = false;
        state.seek_pending = false;
        state.active_audio = None;
        state.active_subtitle = None;
    }

    fn play(&mut self) {
        self.state().playing = true;
    }

    fn pause(&mut self) {
        self.state().playing = false;
    }

    fn seek(&mut self, position: u64, mode: SeekMode) {
        let mut state = self.state();
        state.position = match state.media.duration {
            Some(duration) if duration > 0 => position.min(duration),
            _ => position,
        };
        state.seek_pending = true;
        state.seeks.push((position, mode));
    }

    fn set_volume(&mut self, volume: f32) {
        self.state().volume = volume;
    }

    fn set_speed(&mut self, speed: f32) {
        self.state().speed = speed;
    }

    fn set_max_resolution(&mut self, width: u32, height: u32) {
        self.state().max_resolution = Some((width, height));
    }

    fn set_max_bitrate(&mut self, bitrate: u64) {
        self.state().max_bitrate = Some(bitrate);
    }

    fn tracks(&self, kind: TrackKind) -> Vec<TrackInfo> {
        let state = self.state();
        if state.prepared.is_none() {
            return Vec::new();
        }
        state.media.tracks.iter().filter(|track| track.kind == kind).cloned().collect()
    }

    fn select_track(&mut self, kind: TrackKind, id: Option<TrackId>) -> Result<()> {
        let mut state = self.state();
        if let Some(message) = state.fail_select.take() {
            return Err(Error::TrackSelection(message));
        }
        match kind {
            TrackKind::Audio => state.active_audio = id,
            TrackKind::Subtitle => state.active_subtitle = id,
        }
        Ok(())
    }

    fn active_track(&self, kind: TrackKind) -> Option<TrackId> {
        let state = self.state();
        match kind {
            TrackKind::Audio => state.active_audio,
            TrackKind::Subtitle => state.active_subtitle,
        }
    }

    fn position(&self) -> u64 {
        self.state().position
    }

    fn duration(&self) -> Option<u64> {
        let state = self.state();
        state.prepared.as_ref().and(state.media.duration)
    }

    fn buffered_position(&self) -> u64 {
        self.state().buffered
    }

    fn is_loading(&self) -> bool {
        self.state().loading
    }

    fn is_stalled(&self) -> bool {
        let state = self.state();
        state.playing && state.stalled
    }

    fn video_size(&self) -> Option<VideoSize> {
        let state = self.state();
        state.prepared.as_ref().and(state.media.video_size)
    }
}
