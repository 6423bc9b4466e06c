//! Player controller
//!
//! Owns a [`PlayerSession`] on a tokio task. Host commands and native
//! callbacks share one queue, so they reach the session in order and never
//! concurrently. The task also runs the position watcher and the buffer
//! poller at the configured intervals.

use crate::{
    backend::{BackendEvent, MediaBackend},
    command::Command,
    config::PlayerConfig,
    event::EventSink,
    screen::KeepScreenOn,
    session::PlayerSession,
    types::{PlaybackState, SessionId, TrackId, TrackKind},
    Error, Result,
};
use serde::Serialize;
use std::{ops::ControlFlow, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, trace};

/// Everything the controller task consumes
#[derive(Debug)]
pub enum Input {
    /// Host command
    Command(Command),
    /// Native callback
    Backend(BackendEvent),
    /// Read the settled session state
    Snapshot { respond_to: oneshot::Sender<PlayerSnapshot> },
    /// Close the media and stop the task
    Dispose,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: SessionId,
    pub state: PlaybackState,
    pub position: u64,
    pub buffer_position: u64,
    pub live: bool,
    pub source: Option<String>,
    pub show_subtitle: bool,
    pub looping: bool,
    pub audio_override: Option<TrackId>,
    pub subtitle_override: Option<TrackId>,
}

/// Delivers native callbacks to a controller. Handed to the backend factory.
#[derive(Debug, Clone)]
pub struct BackendNotifier {
    sender: mpsc::UnboundedSender<Input>,
}

impl BackendNotifier {
    /// Queue a callback. Returns false once the controller is gone.
    pub fn notify(&self, event: BackendEvent) -> bool {
        self.sender.send(Input::Backend(event)).is_ok()
    }
}

/// Handle for communicating with a player controller
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    id: SessionId,
    sender: mpsc::UnboundedSender<Input>,
}

impl PlayerHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue a command
    pub fn send(&self, command: Command) -> Result<()> {
        self.sender
            .send(Input::Command(command))
            .map_err(|_| Error::PlayerClosed(self.id))
    }

    pub fn open(&self, source: impl Into<String>) -> Result<()> {
        self.send(Command::Open { source: source.into() })
    }

    pub fn close(&self) -> Result<()> {
        self.send(Command::Close)
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn seek_to(&self, position: u64, fast: bool) -> Result<()> {
        self.send(Command::SeekTo { position, fast })
    }

    pub fn override_track(&self, kind: TrackKind, track_id: TrackId, enabled: bool) -> Result<()> {
        self.send(Command::OverrideTrack { kind, track_id, enabled })
    }

    /// Callback channel into the same controller
    pub fn notifier(&self) -> BackendNotifier {
        BackendNotifier { sender: self.sender.clone() }
    }

    /// Settled state after everything queued so far
    pub async fn snapshot(&self) -> Result<PlayerSnapshot> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(Input::Snapshot { respond_to })
            .map_err(|_| Error::PlayerClosed(self.id))?;
        response.await.map_err(|_| Error::PlayerClosed(self.id))
    }

    /// Ask the controller to close its media and exit
    pub fn dispose(&self) -> Result<()> {
        self.sender.send(Input::Dispose).map_err(|_| Error::PlayerClosed(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Controller that owns the session and processes its inputs
pub struct PlayerController<B, S> {
    session: PlayerSession<B, S>,
    receiver: Option<mpsc::UnboundedReceiver<Input>>,
    screen: Option<Arc<KeepScreenOn>>,
    screen_held: bool,
}

impl<B: MediaBackend, S: EventSink> PlayerController<B, S> {
    /// Create a controller for session `id`. `make_backend` receives the
    /// notifier the engine must report its callbacks through.
    pub fn new<F>(id: SessionId, config: PlayerConfig, sink: S, make_backend: F) -> (PlayerHandle, Self)
    where
        F: FnOnce(BackendNotifier) -> B,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backend = make_backend(BackendNotifier { sender: sender.clone() });
        let controller = Self {
            session: PlayerSession::new(backend, sink, config).with_id(id),
            receiver: Some(receiver),
            screen: None,
            screen_held: false,
        };
        (PlayerHandle { id, sender }, controller)
    }

    /// Share a host-wide keep-screen-on reference set
    pub fn with_screen_lock(mut self, screen: Arc<KeepScreenOn>) -> Self {
        self.screen = Some(screen);
        self
    }

    /// Run the controller event loop
    pub async fn run(mut self) {
        let Some(mut receiver) = self.receiver.take() else {
            return;
        };
        let id = self.session.id();
        let mut position_timer = ticker(self.session.config().position_interval());
        let mut buffer_timer = ticker(self.session.config().buffer_poll_interval());
        info!(session_id = %id, "Player controller started");

        loop {
            tokio::select! {
                input = receiver.recv() => {
                    let Some(input) = input else { break };
                    // drain the burst so deferred work runs once per tick
                    let mut next = Some(input);
                    let mut flow = ControlFlow::Continue(());
                    while let Some(input) = next.take() {
                        flow = self.handle(input).await;
                        if flow.is_break() {
                            break;
                        }
                        next = receiver.try_recv().ok();
                    }
                    if flow.is_break() {
                        break;
                    }
                    self.session.flush_deferred();
                }
                _ = position_timer.tick(), if self.session.wants_position_watch() => {
                    trace!(session_id = %id, "Position tick");
                    self.session.tick_position();
                }
                _ = buffer_timer.tick(), if self.session.wants_buffer_poll() => {
                    trace!(session_id = %id, "Buffer tick");
                    self.session.poll_buffer();
                }
            }
            self.sync_screen().await;
        }

        self.session.close();
        self.sync_screen().await;
        info!(session_id = %id, "Player controller stopped");
    }

    /// Spawn the event loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()>
    where
        B: Send + 'static,
        S: Send + 'static,
    {
        tokio::spawn(self.run())
    }

    async fn handle(&mut self, input: Input) -> ControlFlow<()> {
        match input {
            Input::Command(command) => self.session.execute(command),
            Input::Backend(event) => {
                debug!(session_id = %self.session.id(), ?event, "Native callback");
                self.session.handle_backend_event(event);
            }
            Input::Snapshot { respond_to } => {
                self.session.flush_deferred();
                self.sync_screen().await;
                let _ = respond_to.send(self.snapshot());
            }
            Input::Dispose => {
                debug!(session_id = %self.session.id(), "Dispose requested");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn snapshot(&self) -> PlayerSnapshot {
        let session = &self.session;
        PlayerSnapshot {
            id: session.id(),
            state: session.state(),
            position: session.position(),
            buffer_position: session.buffer_position(),
            live: session.is_live(),
            source: session.source().map(|source| source.source.clone()),
            show_subtitle: session.show_subtitle(),
            looping: session.looping(),
            audio_override: session.override_track(TrackKind::Audio),
            subtitle_override: session.override_track(TrackKind::Subtitle),
        }
    }

    async fn sync_screen(&mut self) {
        let wanted = self.session.wants_screen_on();
        if wanted == self.screen_held {
            return;
        }
        self.screen_held = wanted;
        if let Some(screen) = &self.screen {
            screen.request(self.session.id(), wanted).await;
        }
    }
}

/// Spawn a controller for a fresh session
pub fn spawn_player<B, S, F>(config: PlayerConfig, sink: S, make_backend: F) -> (PlayerHandle, JoinHandle<()>)
where
    B: MediaBackend + Send + 'static,
    S: EventSink + Send + 'static,
    F: FnOnce(BackendNotifier) -> B,
{
    let (handle, controller) = PlayerController::new(SessionId::new(), config, sink, make_backend);
    (handle, controller.spawn())
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut timer = interval(period.max(Duration::from_millis(1)));
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}
