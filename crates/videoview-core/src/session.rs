//! Player Session - playback state machine
//!
//! Coordinates:
//! - open/close lifecycle and source classification
//! - play/pause/seek transitions, including seeks issued while opening
//! - default and overridden track selection
//! - position and buffer reporting
//! - normalization of native callbacks into [`PlayerEvent`]s
//!
//! The session is synchronous and owns its backend exclusively. Commands and
//! backend callbacks must be delivered one at a time on the same execution
//! context; [`crate::controller::PlayerController`] does that on a tokio task.
//! Commands never fail: anything that goes wrong is reported through an
//! `error` event and the session falls back to idle.

use crate::{
    backend::{BackendEvent, MediaBackend},
    command::Command,
    config::PlayerConfig,
    event::{EventSink, PlayerEvent},
    selection::TrackSelector,
    source::MediaSource,
    types::*,
    Error,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 2.0;

/// Player session managing a single native player
pub struct PlayerSession<B, S = Vec<PlayerEvent>> {
    /// Unique session ID
    id: SessionId,
    config: PlayerConfig,
    backend: B,
    sink: S,
    selector: TrackSelector,
    state: PlaybackState,
    source: Option<MediaSource>,
    /// Duration unknown or infinite
    live: bool,
    /// A native seek is in flight
    seeking: bool,
    /// The in-flight seek is a restart issued by the session itself
    internal_seek: bool,
    /// Seek requested while opening, applied once ready
    pending_seek: Option<u64>,
    /// Latest seek requested while another was in flight
    queued_seek: Option<(u64, SeekMode)>,
    override_audio: Option<TrackId>,
    override_subtitle: Option<TrackId>,
    preferred_audio_language: String,
    preferred_subtitle_language: String,
    show_subtitle: bool,
    looping: bool,
    auto_play: bool,
    keep_screen_on: bool,
    has_video: bool,
    speed: f32,
    volume: f32,
    max_resolution: Option<(u32, u32)>,
    max_bitrate: Option<u64>,
    /// Last reported position
    position: u64,
    /// The next reported position may be lower than the last one
    position_rewind: bool,
    /// Last reported buffered end
    buffer_position: u64,
    /// Buffer polling is active
    buffering: bool,
    /// Track kinds awaiting reconciliation
    stale_tracks: BTreeSet<TrackKind>,
}

impl<B: MediaBackend, S: EventSink> PlayerSession<B, S> {
    /// Create a new player session
    pub fn new(backend: B, sink: S, config: PlayerConfig) -> Self {
        Self {
            id: SessionId::new(),
            selector: TrackSelector::new(&config.system_languages),
            auto_play: config.auto_play,
            config,
            backend,
            sink,
            state: PlaybackState::Idle,
            source: None,
            live: false,
            seeking: false,
            internal_seek: false,
            pending_seek: None,
            queued_seek: None,
            override_audio: None,
            override_subtitle: None,
            preferred_audio_language: String::new(),
            preferred_subtitle_language: String::new(),
            show_subtitle: false,
            looping: false,
            keep_screen_on: false,
            has_video: false,
            speed: 1.0,
            volume: 1.0,
            max_resolution: None,
            max_bitrate: None,
            position: 0,
            position_rewind: false,
            buffer_position: 0,
            buffering: false,
            stale_tracks: BTreeSet::new(),
        }
    }

    /// Use a fixed session ID, for hosts that allocate their own
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Last reported playback position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Last reported buffered end
    pub fn buffer_position(&self) -> u64 {
        self.buffer_position
    }

    pub fn override_track(&self, kind: TrackKind) -> Option<TrackId> {
        match kind {
            TrackKind::Audio => self.override_audio,
            TrackKind::Subtitle => self.override_subtitle,
        }
    }

    pub fn show_subtitle(&self) -> bool {
        self.show_subtitle
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Apply one host command
    pub fn execute(&mut self, command: Command) {
        debug!(session_id = %self.id, method = command.method(), "Command");
        match command {
            Command::Open { source } => self.open(&source),
            Command::Close => self.close(),
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::SeekTo { position, fast } => self.seek_to(position, fast),
            Command::SetVolume { value } => self.set_volume(value),
            Command::SetSpeed { value } => self.set_speed(value),
            Command::SetLooping { value } => self.set_looping(value),
            Command::SetAutoPlay { value } => self.set_auto_play(value),
            Command::SetMaxResolution { width, height } => self.set_max_resolution(width, height),
            Command::SetMaxBitrate { value } => self.set_max_bitrate(value),
            Command::SetPreferredAudioLanguage { value } => self.set_preferred_audio_language(value),
            Command::SetPreferredSubtitleLanguage { value } => self.set_preferred_subtitle_language(value),
            Command::SetShowSubtitle { value } => self.set_show_subtitle(value),
            Command::SetKeepScreenOn { value } => self.set_keep_screen_on(value),
            Command::OverrideTrack { kind, track_id, enabled } => self.set_override_track(kind, track_id, enabled),
        }
    }

    /// Load a source, closing whatever was open
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn open(&mut self, source: &str) {
        self.close();

        let resolved = match MediaSource::resolve(source, self.config.asset_root.as_deref()) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, "Cannot resolve source");
                self.emit(PlayerEvent::Error { value: e.event_value() });
                return;
            }
        };

        self.backend.set_volume(self.volume);
        if let Some((width, height)) = self.max_resolution {
            self.backend.set_max_resolution(width, height);
        }
        if let Some(bitrate) = self.max_bitrate {
            self.backend.set_max_bitrate(bitrate);
        }
        if let Err(e) = self.backend.prepare(&resolved) {
            warn!(error = %e, "Engine failed to prepare source");
            self.backend.stop();
            self.emit(PlayerEvent::Error { value: e.event_value() });
            return;
        }

        info!(
            url = %resolved.url,
            kind = ?resolved.kind,
            manifest = ?resolved.manifest,
            "Opening"
        );
        self.source = Some(resolved);
        self.state = PlaybackState::Opening;
    }

    /// Unload the media. Idempotent and silent.
    pub fn close(&mut self) {
        if self.state == PlaybackState::Idle && self.source.is_none() {
            return;
        }

        self.backend.stop();
        self.state = PlaybackState::Idle;
        self.source = None;
        self.live = false;
        self.seeking = false;
        self.internal_seek = false;
        self.pending_seek = None;
        self.queued_seek = None;
        self.override_audio = None;
        self.override_subtitle = None;
        self.has_video = false;
        self.position = 0;
        self.position_rewind = false;
        self.buffer_position = 0;
        self.buffering = false;
        self.stale_tracks.clear();

        info!(session_id = %self.id, "Closed");
    }

    /// Start playback from Ready
    pub fn play(&mut self) {
        if self.state != PlaybackState::Ready {
            debug!(state = %self.state, "Cannot play from current state");
            return;
        }

        self.state = PlaybackState::Playing;
        if self.backend.has_ended() {
            self.rewind();
        }
        self.backend.play();
        if self.backend.is_stalled() {
            self.emit(PlayerEvent::Loading { value: true });
        }
        if self.config.echo_playback_changes {
            self.emit(PlayerEvent::Playing { value: true });
        }
        info!(session_id = %self.id, position = self.position, "Playing");
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            debug!(state = %self.state, "Cannot pause from current state");
            return;
        }

        self.state = PlaybackState::Ready;
        self.backend.pause();
        if self.config.echo_playback_changes {
            self.emit(PlayerEvent::Playing { value: false });
        }
        info!(session_id = %self.id, position = self.position, "Paused");
    }

    /// Seek to `position` milliseconds.
    ///
    /// While opening the target is kept and applied once the media is ready.
    /// Only one native seek is in flight at a time; later requests replace the
    /// queued target.
    pub fn seek_to(&mut self, position: u64, fast: bool) {
        let mode = SeekMode::from_fast(fast);
        match self.state {
            PlaybackState::Idle => debug!("Seek ignored while idle"),
            PlaybackState::Opening => {
                if self.seeking {
                    self.queued_seek = Some((position, SeekMode::Fast));
                } else {
                    self.pending_seek = Some(position);
                }
            }
            PlaybackState::Ready | PlaybackState::Playing => {
                if self.seeking {
                    debug!(position, "Seek in flight, replacing queued target");
                    self.queued_seek = Some((position, mode));
                } else if self.backend.position() != position {
                    self.start_seek(position, mode);
                } else {
                    self.emit(PlayerEvent::SeekEnd);
                }
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.backend.set_volume(self.volume);
        if self.config.echo_playback_changes {
            self.emit(PlayerEvent::Volume { value: self.volume });
        }
    }

    /// Clamped to 0.5..=2.0. Live streams always play at 1x.
    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_nan() {
            return;
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        if self.live {
            debug!(speed = self.speed, "Speed change ignored for live stream");
            return;
        }
        self.backend.set_speed(self.speed);
        if self.config.echo_playback_changes {
            self.emit(PlayerEvent::Speed { value: self.speed });
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn set_auto_play(&mut self, auto_play: bool) {
        self.auto_play = auto_play;
    }

    pub fn set_max_resolution(&mut self, width: f64, height: f64) {
        if width.is_nan() || height.is_nan() {
            return;
        }
        // `as` saturates, so infinity means uncapped
        let (width, height) = (width.max(0.0) as u32, height.max(0.0) as u32);
        self.max_resolution = Some((width, height));
        self.backend.set_max_resolution(width, height);
    }

    pub fn set_max_bitrate(&mut self, bitrate: u64) {
        self.max_bitrate = Some(bitrate);
        self.backend.set_max_bitrate(bitrate);
    }

    pub fn set_preferred_audio_language(&mut self, language: impl Into<String>) {
        self.preferred_audio_language = language.into();
        if self.state.is_loaded() && self.override_audio.is_none() {
            self.apply_audio_selection();
        }
    }

    pub fn set_preferred_subtitle_language(&mut self, language: impl Into<String>) {
        self.preferred_subtitle_language = language.into();
        if self.state.is_loaded() && self.show_subtitle && self.override_subtitle.is_none() {
            self.apply_subtitle_selection();
        }
    }

    pub fn set_show_subtitle(&mut self, show: bool) {
        self.show_subtitle = show;
        if self.state.is_loaded() {
            self.apply_subtitle_selection();
        }
    }

    pub fn set_keep_screen_on(&mut self, enabled: bool) {
        self.keep_screen_on = enabled;
    }

    /// Pin or release a track.
    ///
    /// Releasing only takes effect when `id` is the current override; the
    /// default selection is then applied again.
    pub fn set_override_track(&mut self, kind: TrackKind, id: TrackId, enabled: bool) {
        if !self.state.is_loaded() {
            debug!(state = %self.state, "Track override ignored before media is ready");
            return;
        }
        if !self.backend.tracks(kind).iter().any(|track| track.id == id) {
            warn!(error = %Error::UnknownTrack { kind, id }, "Track override ignored");
            return;
        }

        let current = self.override_track(kind);
        if enabled {
            self.set_override(kind, Some(id));
            self.apply_track(kind, Some(id));
        } else if current == Some(id) {
            self.set_override(kind, None);
            match kind {
                TrackKind::Audio => self.apply_audio_selection(),
                TrackKind::Subtitle => self.apply_subtitle_selection(),
            }
        }
    }

    /// Track the default selection would activate right now
    pub fn default_track(&self, kind: TrackKind) -> Option<TrackId> {
        let preferred = match kind {
            TrackKind::Audio => &self.preferred_audio_language,
            TrackKind::Subtitle => &self.preferred_subtitle_language,
        };
        self.selector.select_default(kind, &self.backend.tracks(kind), preferred)
    }

    /// The host should keep the screen awake for this session
    pub fn wants_screen_on(&self) -> bool {
        self.keep_screen_on && self.has_video && self.state == PlaybackState::Playing
    }

    /// The position watcher should be running
    pub fn wants_position_watch(&self) -> bool {
        self.state == PlaybackState::Playing && !self.live
    }

    /// The buffer poller should be running
    pub fn wants_buffer_poll(&self) -> bool {
        self.buffering && self.state > PlaybackState::Idle && self.is_networked() && !self.live
    }

    /// Position watcher tick
    pub fn tick_position(&mut self) {
        if self.wants_position_watch() {
            self.report_position();
        }
    }

    /// Buffer poller tick
    pub fn poll_buffer(&mut self) {
        if !self.wants_buffer_poll() || !self.backend.is_loading() {
            self.buffering = false;
            return;
        }
        if self.state.is_loaded() {
            self.watch_buffer();
        }
    }

    /// Run deferred work queued by the callbacks of the current tick
    pub fn flush_deferred(&mut self) {
        let stale = std::mem::take(&mut self.stale_tracks);
        for kind in stale {
            if !self.state.is_loaded() {
                break;
            }
            self.reconcile_tracks(kind);
        }
    }

    /// Feed one native callback into the state machine
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Ready => self.on_ready(),
            BackendEvent::SeekCompleted => self.on_seek_completed(),
            BackendEvent::Ended => self.on_ended(),
            BackendEvent::Error { message } => self.on_error(message),
            BackendEvent::Stalled { stalled } => {
                if self.state == PlaybackState::Playing {
                    self.emit(PlayerEvent::Loading { value: stalled });
                }
            }
            BackendEvent::LoadingChanged { loading } => self.on_loading_changed(loading),
            BackendEvent::BufferChanged => {
                if self.state > PlaybackState::Idle {
                    self.watch_buffer();
                }
            }
            BackendEvent::TracksChanged { kind } => {
                if self.state.is_loaded() {
                    self.stale_tracks.insert(kind);
                }
            }
            BackendEvent::SizeChanged { size } => self.on_size_changed(size),
        }
    }

    fn on_ready(&mut self) {
        if self.state != PlaybackState::Opening || self.seeking {
            return;
        }

        self.live = self.backend.is_live();
        self.backend.set_volume(self.volume);
        self.backend.set_speed(if self.live { 1.0 } else { self.speed });

        if let Some(position) = self.pending_seek.take() {
            if !self.live && position > 0 {
                let target = self.backend.duration().map_or(position, |d| position.min(d));
                debug!(target, "Applying seek requested while opening");
                self.start_seek(target, SeekMode::Fast);
                return;
            }
        }
        self.finish_loading();
    }

    fn on_seek_completed(&mut self) {
        if !self.seeking {
            return;
        }
        if let Some((position, mode)) = self.queued_seek.take() {
            self.internal_seek = false;
            self.position_rewind = true;
            self.backend.seek(position, mode);
            return;
        }

        self.seeking = false;
        if std::mem::take(&mut self.internal_seek) {
            return;
        }
        match self.state {
            PlaybackState::Opening => self.finish_loading(),
            PlaybackState::Ready | PlaybackState::Playing => {
                self.report_position();
                self.emit(PlayerEvent::SeekEnd);
            }
            PlaybackState::Idle => {}
        }
    }

    fn on_ended(&mut self) {
        if !self.state.is_loaded() {
            return;
        }
        if !self.live {
            if let Some(duration) = self.backend.duration() {
                self.position = duration;
                self.emit(PlayerEvent::Position { value: duration });
            }
        }
        if self.state != PlaybackState::Playing {
            return;
        }

        self.emit(PlayerEvent::Finished);
        if self.live {
            self.close();
        } else if self.looping {
            debug!("Looping back to start");
            self.rewind();
            self.position = 0;
            self.position_rewind = false;
            self.backend.play();
        } else {
            self.state = PlaybackState::Ready;
            if self.config.echo_playback_changes {
                self.emit(PlayerEvent::Playing { value: false });
            }
        }
    }

    fn on_error(&mut self, message: String) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.fail(Error::Playback(message));
    }

    fn on_loading_changed(&mut self, loading: bool) {
        if !self.is_networked() || self.live {
            return;
        }
        if loading {
            self.buffering = true;
        } else if self.buffering {
            self.buffering = false;
            self.watch_buffer();
        }
    }

    fn on_size_changed(&mut self, size: VideoSize) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.has_video = size.has_video();
        if self.state.is_loaded() {
            self.emit(PlayerEvent::VideoSize {
                width: size.width,
                height: size.height,
                rotation: size.rotation,
            });
        }
    }

    fn finish_loading(&mut self) {
        self.state = PlaybackState::Ready;
        self.apply_audio_selection();
        if self.state == PlaybackState::Ready {
            self.apply_subtitle_selection();
        }
        if self.state != PlaybackState::Ready {
            // track activation failed and closed the session
            return;
        }

        let duration = if self.live {
            0
        } else {
            self.backend.duration().unwrap_or(0)
        };
        let audio_tracks = self.describe_tracks(TrackKind::Audio);
        let subtitle_tracks = self.describe_tracks(TrackKind::Subtitle);
        let source = self.source.as_ref().map(|s| s.source.clone()).unwrap_or_default();
        info!(
            session_id = %self.id,
            duration,
            live = self.live,
            audio = audio_tracks.len(),
            subtitles = subtitle_tracks.len(),
            "Media ready"
        );
        self.emit(PlayerEvent::MediaInfo {
            duration,
            audio_tracks,
            subtitle_tracks,
            source,
        });

        if !self.live {
            self.report_position();
            let current = self.backend.position();
            let end = self.backend.buffered_position();
            if end > current {
                self.buffer_position = end;
                self.emit(PlayerEvent::Buffer { start: current, end });
            }
        }
        if let Some(size) = self.backend.video_size() {
            self.has_video = size.has_video();
            if self.has_video {
                self.emit(PlayerEvent::VideoSize {
                    width: size.width,
                    height: size.height,
                    rotation: size.rotation,
                });
            }
        }

        if self.auto_play {
            self.play();
        }
    }

    fn describe_tracks(&self, kind: TrackKind) -> BTreeMap<TrackId, TrackDescriptor> {
        self.backend
            .tracks(kind)
            .iter()
            .map(|track| (track.id, track.descriptor()))
            .collect()
    }

    fn start_seek(&mut self, position: u64, mode: SeekMode) {
        debug!(from = self.position, to = position, ?mode, "Seeking");
        self.seeking = true;
        self.position_rewind = true;
        self.backend.seek(position, mode);
    }

    /// Restart from zero. Holds the seek slot like a host seek but never
    /// reports `seekEnd`.
    fn rewind(&mut self) {
        self.seeking = true;
        self.internal_seek = true;
        self.queued_seek = None;
        self.position_rewind = true;
        self.backend.seek(0, SeekMode::Fast);
    }

    /// Emit the engine position when it moved forward, or moved at all after
    /// a seek or restart.
    fn report_position(&mut self) {
        if self.live {
            return;
        }
        let position = self.backend.position();
        if position == self.position || (position < self.position && !self.position_rewind) {
            return;
        }
        self.position = position;
        self.position_rewind = false;
        self.emit(PlayerEvent::Position { value: position });
    }

    /// Emit the buffered range when its end moved past the current position
    fn watch_buffer(&mut self) {
        if self.live {
            return;
        }
        let end = self.backend.buffered_position();
        let current = self.backend.position();
        if end != self.buffer_position && end > current {
            self.buffer_position = end;
            if self.state.is_loaded() {
                self.emit(PlayerEvent::Buffer { start: current, end });
            }
        }
    }

    fn apply_audio_selection(&mut self) {
        let target = self.override_audio.or_else(|| self.default_track(TrackKind::Audio));
        if target.is_some() {
            self.apply_track(TrackKind::Audio, target);
        }
    }

    fn apply_subtitle_selection(&mut self) {
        let target = if self.show_subtitle {
            self.override_subtitle.or_else(|| self.default_track(TrackKind::Subtitle))
        } else {
            None
        };
        self.apply_track(TrackKind::Subtitle, target);
    }

    fn apply_track(&mut self, kind: TrackKind, id: Option<TrackId>) {
        debug!(%kind, ?id, "Activating track");
        if let Err(e) = self.backend.select_track(kind, id) {
            self.fail(e);
        }
    }

    fn set_override(&mut self, kind: TrackKind, id: Option<TrackId>) {
        match kind {
            TrackKind::Audio => self.override_audio = id,
            TrackKind::Subtitle => self.override_subtitle = id,
        }
    }

    /// Adopt a track switch the engine made on its own (native controls)
    fn reconcile_tracks(&mut self, kind: TrackKind) {
        let active = self.backend.active_track(kind);
        match kind {
            TrackKind::Audio => {
                let Some(id) = active else { return };
                if Some(id) != self.override_audio
                    && (self.override_audio.is_some() || Some(id) != self.default_track(kind))
                {
                    self.override_audio = Some(id);
                    self.emit(PlayerEvent::OverrideAudio { value: id });
                }
            }
            TrackKind::Subtitle => {
                if self.show_subtitle {
                    match active {
                        None => {
                            self.show_subtitle = false;
                            self.emit(PlayerEvent::ShowSubtitle { value: false });
                        }
                        Some(id)
                            if Some(id) != self.override_subtitle
                                && (self.override_subtitle.is_some() || Some(id) != self.default_track(kind)) =>
                        {
                            self.override_subtitle = Some(id);
                            self.emit(PlayerEvent::OverrideSubtitle { value: id });
                        }
                        Some(_) => {}
                    }
                } else if let Some(id) = active {
                    self.show_subtitle = true;
                    self.emit(PlayerEvent::ShowSubtitle { value: true });
                    if Some(id) != self.override_subtitle {
                        self.override_subtitle = Some(id);
                        self.emit(PlayerEvent::OverrideSubtitle { value: id });
                    }
                }
            }
        }
    }

    fn is_networked(&self) -> bool {
        self.source.as_ref().is_some_and(MediaSource::is_networked)
    }

    fn fail(&mut self, error: Error) {
        warn!(session_id = %self.id, code = error.error_code(), error = %error, "Session failed");
        self.close();
        self.emit(PlayerEvent::Error { value: error.event_value() });
    }

    fn emit(&mut self, event: PlayerEvent) {
        debug!(session_id = %self.id, event = event.name(), "Event");
        self.sink.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedBackend, SimulatedMedia};

    fn media() -> SimulatedMedia {
        SimulatedMedia::new(Some(10_000))
            .with_track(TrackInfo::audio(1, "en-US"))
            .with_track(TrackInfo::audio(2, "en"))
            .with_track(TrackInfo::audio(3, "ja").with_primary(true))
            .with_track(TrackInfo::subtitle(10, "en"))
            .with_track(TrackInfo::subtitle(11, "fr"))
    }

    fn session(media: SimulatedMedia) -> (PlayerSession<SimulatedBackend>, SimulatedBackend) {
        let engine = SimulatedBackend::new(media);
        let config = PlayerConfig::default().with_system_languages(["de"]);
        (PlayerSession::new(engine.clone(), Vec::new(), config), engine)
    }

    fn opened(media: SimulatedMedia) -> (PlayerSession<SimulatedBackend>, SimulatedBackend) {
        let (mut session, engine) = session(media);
        session.open("/media/video.mp4");
        session.handle_backend_event(BackendEvent::Ready);
        session.sink_mut().clear();
        (session, engine)
    }

    #[test]
    fn test_session_creation() {
        let (session, _) = session(media());
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.position(), 0);
        assert!(session.sink().is_empty());
    }

    #[test]
    fn test_open_reaches_ready() {
        let (mut session, engine) = session(media());
        session.open("/media/video.mp4");
        assert_eq!(session.state(), PlaybackState::Opening);
        assert!(engine.is_prepared());

        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(session.state(), PlaybackState::Ready);
        match &session.sink()[..] {
            [PlayerEvent::MediaInfo { duration, audio_tracks, subtitle_tracks, source }] => {
                assert_eq!(*duration, 10_000);
                assert_eq!(audio_tracks.len(), 3);
                assert_eq!(subtitle_tracks.len(), 2);
                assert_eq!(source, "/media/video.mp4");
            }
            other => panic!("unexpected events: {other:?}"),
        }
        // no preferred language, no "de" track: last primary track
        assert_eq!(engine.active_track(TrackKind::Audio), Some(TrackId(3)));
        assert_eq!(engine.active_track(TrackKind::Subtitle), None);
    }

    #[test]
    fn test_invalid_source_stays_idle() {
        let (mut session, engine) = session(media());
        session.open("http://[::1");
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.sink()[..], [PlayerEvent::Error { value: "INVALID_SOURCE".into() }]);
        assert!(!engine.is_prepared());
    }

    #[test]
    fn test_prepare_failure_reports_error() {
        let (mut session, engine) = session(media());
        engine.fail_next_prepare("ERROR_CODE_IO_FILE_NOT_FOUND");
        session.open("/missing.mp4");
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Error { value: "ERROR_CODE_IO_FILE_NOT_FOUND".into() }]
        );
    }

    #[test]
    fn test_play_pause_only_from_valid_states() {
        let (mut session, engine) = session(media());
        session.play();
        assert_eq!(session.state(), PlaybackState::Idle);

        session.open("/media/video.mp4");
        session.play();
        assert_eq!(session.state(), PlaybackState::Opening);
        assert!(!engine.is_playing());

        session.handle_backend_event(BackendEvent::Ready);
        session.pause();
        assert_eq!(session.state(), PlaybackState::Ready);

        session.play();
        assert_eq!(session.state(), PlaybackState::Playing);
        assert!(engine.is_playing());

        session.pause();
        assert_eq!(session.state(), PlaybackState::Ready);
        assert!(!engine.is_playing());
    }

    #[test]
    fn test_seek_while_opening_applied_on_ready() {
        let (mut session, engine) = session(media());
        session.open("/media/video.mp4");
        session.seek_to(4_000, false);
        assert!(engine.seeks().is_empty());

        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(session.state(), PlaybackState::Opening);
        assert_eq!(engine.seeks(), vec![(4_000, SeekMode::Fast)]);

        assert!(engine.complete_seek());
        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(session.state(), PlaybackState::Ready);
        assert!(matches!(session.sink()[0], PlayerEvent::MediaInfo { .. }));
        assert_eq!(session.sink()[1], PlayerEvent::Position { value: 4_000 });
        assert!(!session.sink().contains(&PlayerEvent::SeekEnd));
    }

    #[test]
    fn test_seek_while_opening_clamped_to_duration() {
        let (mut session, engine) = session(media());
        session.open("/media/video.mp4");
        session.seek_to(60_000, true);
        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(engine.seeks(), vec![(10_000, SeekMode::Fast)]);
    }

    #[test]
    fn test_single_seek_in_flight() {
        let (mut session, engine) = opened(media());
        session.seek_to(1_000, false);
        session.seek_to(2_000, false);
        session.seek_to(3_000, true);
        assert_eq!(engine.seeks(), vec![(1_000, SeekMode::Exact)]);

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(engine.seeks().last(), Some(&(3_000, SeekMode::Fast)));
        assert!(session.sink().is_empty());

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Position { value: 3_000 }, PlayerEvent::SeekEnd]
        );
    }

    #[test]
    fn test_seek_while_opening_queued_behind_pending_seek() {
        let (mut session, engine) = session(media());
        session.open("/media/video.mp4");
        session.seek_to(4_000, false);
        session.handle_backend_event(BackendEvent::Ready);
        session.seek_to(7_000, false);
        assert_eq!(engine.seeks(), vec![(4_000, SeekMode::Fast)]);

        assert!(engine.complete_seek());
        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(session.state(), PlaybackState::Opening);
        assert_eq!(engine.seeks(), vec![(4_000, SeekMode::Fast), (7_000, SeekMode::Fast)]);
        assert!(session.sink().is_empty());

        assert!(engine.complete_seek());
        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(session.state(), PlaybackState::Ready);
        assert!(matches!(session.sink()[0], PlayerEvent::MediaInfo { .. }));
        assert_eq!(session.sink()[1], PlayerEvent::Position { value: 7_000 });
        assert!(!session.sink().contains(&PlayerEvent::SeekEnd));
    }

    #[test]
    fn test_seek_to_current_position_ends_immediately() {
        let (mut session, engine) = opened(media());
        session.seek_to(0, true);
        assert!(engine.seeks().is_empty());
        assert_eq!(session.sink()[..], [PlayerEvent::SeekEnd]);
    }

    #[test]
    fn test_play_after_end_restarts() {
        let (mut session, engine) = opened(media());
        session.play();
        assert!(engine.advance(20_000));
        session.handle_backend_event(BackendEvent::Ended);
        assert_eq!(session.state(), PlaybackState::Ready);
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Position { value: 10_000 }, PlayerEvent::Finished]
        );

        session.play();
        assert_eq!(engine.seeks(), vec![(0, SeekMode::Fast)]);
        session.tick_position();
        assert_eq!(session.sink().last(), Some(&PlayerEvent::Position { value: 0 }));
    }

    #[test]
    fn test_seek_after_restart_waits_for_rewind() {
        let (mut session, engine) = opened(media());
        session.play();
        assert!(engine.advance(20_000));
        session.handle_backend_event(BackendEvent::Ended);
        session.play();
        session.seek_to(3_000, true);
        assert_eq!(engine.seeks(), vec![(0, SeekMode::Fast)]);
        session.sink_mut().clear();

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(engine.seeks(), vec![(0, SeekMode::Fast), (3_000, SeekMode::Fast)]);
        assert!(session.sink().is_empty());

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Position { value: 3_000 }, PlayerEvent::SeekEnd]
        );
    }

    #[test]
    fn test_seek_during_loop_restart_is_queued() {
        let (mut session, engine) = opened(media());
        session.set_looping(true);
        session.play();
        assert!(engine.advance(10_000));
        session.handle_backend_event(BackendEvent::Ended);
        session.sink_mut().clear();

        session.seek_to(5_000, false);
        assert_eq!(engine.seeks(), vec![(0, SeekMode::Fast)]);

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(engine.seeks(), vec![(0, SeekMode::Fast), (5_000, SeekMode::Exact)]);
        assert!(session.sink().is_empty());

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Position { value: 5_000 }, PlayerEvent::SeekEnd]
        );
        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert_eq!(session.sink().len(), 2);
    }

    #[test]
    fn test_loop_restart_completion_is_silent() {
        let (mut session, engine) = opened(media());
        session.set_looping(true);
        session.play();
        assert!(engine.advance(10_000));
        session.handle_backend_event(BackendEvent::Ended);
        session.sink_mut().clear();

        session.handle_backend_event(BackendEvent::SeekCompleted);
        assert!(session.sink().is_empty());

        session.seek_to(2_000, true);
        assert_eq!(engine.seeks().last(), Some(&(2_000, SeekMode::Fast)));
    }

    #[test]
    fn test_error_closes_session() {
        let (mut session, engine) = opened(media());
        session.play();
        session.handle_backend_event(BackendEvent::Error { message: "ERROR_CODE_DECODING_FAILED".into() });
        assert_eq!(session.state(), PlaybackState::Idle);
        assert!(!engine.is_prepared());
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Error { value: "ERROR_CODE_DECODING_FAILED".into() }]
        );

        // errors after close are dropped
        session.handle_backend_event(BackendEvent::Error { message: "late".into() });
        assert_eq!(session.sink().len(), 1);
    }

    #[test]
    fn test_track_selection_failure_closes_session() {
        let (mut session, engine) = session(media());
        session.open("/media/video.mp4");
        engine.fail_track_selection("TRACK_UNAVAILABLE");
        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(session.state(), PlaybackState::Idle);
        assert_eq!(session.sink()[..], [PlayerEvent::Error { value: "TRACK_UNAVAILABLE".into() }]);
    }

    #[test]
    fn test_volume_and_speed_clamped() {
        let (mut session, engine) = opened(media());
        session.set_volume(1.5);
        assert_eq!(engine.volume(), 1.0);
        session.set_volume(-1.0);
        assert_eq!(engine.volume(), 0.0);
        session.set_speed(4.0);
        assert_eq!(engine.speed(), 2.0);
        session.set_speed(0.1);
        assert_eq!(engine.speed(), 0.5);
        assert!(session.sink().is_empty());
    }

    #[test]
    fn test_echo_playback_changes() {
        let engine = SimulatedBackend::new(media());
        let config = PlayerConfig { echo_playback_changes: true, ..PlayerConfig::default() };
        let mut session = PlayerSession::new(engine, Vec::new(), config);
        session.open("/media/video.mp4");
        session.handle_backend_event(BackendEvent::Ready);
        session.sink_mut().clear();

        session.set_speed(3.0);
        session.set_volume(0.25);
        session.play();
        session.pause();
        assert_eq!(
            session.sink()[..],
            [
                PlayerEvent::Speed { value: 2.0 },
                PlayerEvent::Volume { value: 0.25 },
                PlayerEvent::Playing { value: true },
                PlayerEvent::Playing { value: false },
            ]
        );
    }

    #[test]
    fn test_show_subtitle_uses_preferred_language() {
        let (mut session, engine) = opened(media());
        session.set_preferred_subtitle_language("fr");
        assert_eq!(engine.active_track(TrackKind::Subtitle), None);

        session.set_show_subtitle(true);
        assert_eq!(engine.active_track(TrackKind::Subtitle), Some(TrackId(11)));

        session.set_show_subtitle(false);
        assert_eq!(engine.active_track(TrackKind::Subtitle), None);
    }

    #[test]
    fn test_override_beats_preferred_language() {
        let (mut session, engine) = opened(media());
        session.set_override_track(TrackKind::Audio, TrackId(1), true);
        session.set_preferred_audio_language("ja");
        assert_eq!(engine.active_track(TrackKind::Audio), Some(TrackId(1)));

        session.set_override_track(TrackKind::Audio, TrackId(1), false);
        assert_eq!(session.override_track(TrackKind::Audio), None);
        assert_eq!(engine.active_track(TrackKind::Audio), Some(TrackId(3)));
    }

    #[test]
    fn test_release_of_other_track_keeps_override() {
        let (mut session, engine) = opened(media());
        session.set_override_track(TrackKind::Audio, TrackId(1), true);
        session.set_override_track(TrackKind::Audio, TrackId(2), false);
        assert_eq!(session.override_track(TrackKind::Audio), Some(TrackId(1)));
        assert_eq!(engine.active_track(TrackKind::Audio), Some(TrackId(1)));
    }

    #[test]
    fn test_override_unknown_track_ignored() {
        let (mut session, engine) = opened(media());
        session.set_override_track(TrackKind::Subtitle, TrackId(99), true);
        assert_eq!(session.override_track(TrackKind::Subtitle), None);
        assert_eq!(engine.active_track(TrackKind::Subtitle), None);
    }

    #[test]
    fn test_override_ignored_while_opening() {
        let (mut session, _) = session(media());
        session.open("/media/video.mp4");
        session.set_override_track(TrackKind::Audio, TrackId(1), true);
        assert_eq!(session.override_track(TrackKind::Audio), None);
    }

    #[test]
    fn test_native_subtitle_switch_adopted_once_per_tick() {
        let (mut session, engine) = opened(media());
        engine.activate(TrackKind::Subtitle, Some(TrackId(10)));
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Subtitle });
        engine.activate(TrackKind::Subtitle, Some(TrackId(11)));
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Subtitle });
        assert!(session.sink().is_empty());

        session.flush_deferred();
        assert!(session.show_subtitle());
        assert_eq!(session.override_track(TrackKind::Subtitle), Some(TrackId(11)));
        assert_eq!(
            session.sink()[..],
            [
                PlayerEvent::ShowSubtitle { value: true },
                PlayerEvent::OverrideSubtitle { value: TrackId(11) },
            ]
        );

        engine.activate(TrackKind::Subtitle, None);
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Subtitle });
        session.flush_deferred();
        assert!(!session.show_subtitle());
        assert_eq!(session.sink().last(), Some(&PlayerEvent::ShowSubtitle { value: false }));
    }

    #[test]
    fn test_native_audio_switch_adopted() {
        let (mut session, engine) = opened(media());
        // default selection already active: nothing to adopt
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Audio });
        session.flush_deferred();
        assert!(session.sink().is_empty());

        engine.activate(TrackKind::Audio, Some(TrackId(2)));
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Audio });
        session.flush_deferred();
        assert_eq!(session.override_track(TrackKind::Audio), Some(TrackId(2)));
        assert_eq!(session.sink()[..], [PlayerEvent::OverrideAudio { value: TrackId(2) }]);
    }

    #[test]
    fn test_pending_reconcile_dropped_on_close() {
        let (mut session, engine) = opened(media());
        engine.activate(TrackKind::Audio, Some(TrackId(2)));
        session.handle_backend_event(BackendEvent::TracksChanged { kind: TrackKind::Audio });
        session.close();
        session.flush_deferred();
        assert!(session.sink().is_empty());
    }

    #[test]
    fn test_video_size_reported_when_ready() {
        let (mut session, _) = session(media().with_video_size(VideoSize::new(1920.0, 1080.0)));
        session.set_keep_screen_on(true);
        session.open("/media/video.mp4");
        session.handle_backend_event(BackendEvent::SizeChanged { size: VideoSize::new(1920.0, 1080.0) });
        assert!(session.sink().is_empty());

        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(
            session.sink().last(),
            Some(&PlayerEvent::VideoSize { width: 1920.0, height: 1080.0, rotation: 0 })
        );
        assert!(!session.wants_screen_on());
        session.play();
        assert!(session.wants_screen_on());
    }

    #[test]
    fn test_stall_reported_while_playing() {
        let (mut session, _) = opened(media());
        session.handle_backend_event(BackendEvent::Stalled { stalled: true });
        assert!(session.sink().is_empty());
        session.play();
        session.handle_backend_event(BackendEvent::Stalled { stalled: true });
        session.handle_backend_event(BackendEvent::Stalled { stalled: false });
        assert_eq!(
            session.sink()[..],
            [PlayerEvent::Loading { value: true }, PlayerEvent::Loading { value: false }]
        );
    }

    #[test]
    fn test_buffer_poll_only_for_networked_sources() {
        let (mut session, engine) = opened(media());
        engine.set_loading(true);
        session.handle_backend_event(BackendEvent::LoadingChanged { loading: true });
        assert!(!session.wants_buffer_poll());

        session.open("https://cdn.example.com/video.mp4");
        session.handle_backend_event(BackendEvent::Ready);
        session.sink_mut().clear();
        engine.set_loading(true);
        session.handle_backend_event(BackendEvent::LoadingChanged { loading: true });
        assert!(session.wants_buffer_poll());

        engine.set_buffered(3_000);
        session.poll_buffer();
        session.poll_buffer();
        assert_eq!(session.sink()[..], [PlayerEvent::Buffer { start: 0, end: 3_000 }]);

        engine.set_loading(false);
        session.poll_buffer();
        assert!(!session.wants_buffer_poll());
    }

    #[test]
    fn test_buffered_range_reported_when_ready() {
        let (mut session, engine) = session(media());
        session.open("https://cdn.example.com/video.mp4");
        engine.set_buffered(3_000);
        session.handle_backend_event(BackendEvent::Ready);
        assert!(matches!(session.sink()[0], PlayerEvent::MediaInfo { .. }));
        assert_eq!(session.sink()[1..], [PlayerEvent::Buffer { start: 0, end: 3_000 }]);
    }

    #[test]
    fn test_buffer_changed_deduplicated() {
        let (mut session, engine) = session(media());
        session.open("https://cdn.example.com/video.mp4");
        session.handle_backend_event(BackendEvent::Ready);
        session.sink_mut().clear();

        engine.set_buffered(4_000);
        session.handle_backend_event(BackendEvent::BufferChanged);
        session.handle_backend_event(BackendEvent::BufferChanged);
        assert_eq!(session.sink()[..], [PlayerEvent::Buffer { start: 0, end: 4_000 }]);

        engine.set_buffered(6_000);
        session.handle_backend_event(BackendEvent::BufferChanged);
        assert_eq!(session.sink().last(), Some(&PlayerEvent::Buffer { start: 0, end: 6_000 }));
    }

    #[test]
    fn test_max_resolution_ignores_nan() {
        let (mut session, engine) = opened(media());
        session.set_max_resolution(f64::NAN, 720.0);
        assert_eq!(engine.max_resolution(), None);
        session.set_max_resolution(1280.0, f64::INFINITY);
        assert_eq!(engine.max_resolution(), Some((1280, u32::MAX)));
    }

    #[test]
    fn test_auto_play() {
        let (mut session, engine) = session(media());
        session.set_auto_play(true);
        session.open("/media/video.mp4");
        session.handle_backend_event(BackendEvent::Ready);
        assert_eq!(session.state(), PlaybackState::Playing);
        assert!(engine.is_playing());
    }

    #[test]
    fn test_execute_dispatches_commands() {
        let (mut session, engine) = session(media());
        session.execute(Command::Open { source: "/media/video.mp4".into() });
        session.execute(Command::SetLooping { value: true });
        session.handle_backend_event(BackendEvent::Ready);
        session.execute(Command::Play);
        session.execute(Command::SetMaxBitrate { value: 2_000_000 });
        session.execute(Command::SetMaxResolution { width: 1280.0, height: f64::INFINITY });
        assert_eq!(session.state(), PlaybackState::Playing);
        assert!(session.looping());
        assert_eq!(engine.max_bitrate(), Some(2_000_000));
        assert_eq!(engine.max_resolution(), Some((1280, u32::MAX)));
    }
}
