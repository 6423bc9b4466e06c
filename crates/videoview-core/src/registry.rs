//! Player registry
//!
//! Host bindings keep one registry per plugin instance. Every player gets a
//! [`SessionId`], its events are tagged with that ID on a single host channel,
//! and method calls are routed by ID.

use crate::{
    backend::MediaBackend,
    command::MethodCall,
    config::PlayerConfig,
    controller::{BackendNotifier, PlayerController, PlayerHandle},
    event::{HostEvent, TaggedSink},
    screen::{KeepScreenOn, ScreenWake},
    types::SessionId,
    Error, Result,
};
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

struct Entry {
    handle: PlayerHandle,
    task: JoinHandle<()>,
}

/// Owns the controllers of one host
pub struct PlayerRegistry {
    config: PlayerConfig,
    players: HashMap<SessionId, Entry>,
    screen: Arc<KeepScreenOn>,
    events: mpsc::UnboundedSender<HostEvent>,
}

impl PlayerRegistry {
    /// Create a registry and the receiving end of its event channel
    pub fn new(config: PlayerConfig, wake: impl ScreenWake + 'static) -> (Self, mpsc::UnboundedReceiver<HostEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let registry = Self {
            config,
            players: HashMap::new(),
            screen: Arc::new(KeepScreenOn::new(wake)),
            events,
        };
        (registry, receiver)
    }

    /// Spawn a player. Must be called within a tokio runtime.
    pub fn create<B, F>(&mut self, make_backend: F) -> SessionId
    where
        B: MediaBackend + Send + 'static,
        F: FnOnce(BackendNotifier) -> B,
    {
        let id = SessionId::new();
        let sink = TaggedSink::new(id, self.events.clone());
        let (handle, controller) = PlayerController::new(id, self.config.clone(), sink, make_backend);
        let task = controller.with_screen_lock(self.screen.clone()).spawn();
        self.players.insert(id, Entry { handle, task });
        info!(session_id = %id, players = self.players.len(), "Player created");
        id
    }

    pub fn handle(&self, id: SessionId) -> Option<&PlayerHandle> {
        self.players.get(&id).map(|entry| &entry.handle)
    }

    /// Route a method call to its player
    pub fn dispatch(&self, call: MethodCall) -> Result<()> {
        let entry = self.players.get(&call.id).ok_or(Error::UnknownPlayer(call.id))?;
        debug!(session_id = %call.id, method = call.command.method(), "Dispatch");
        entry.handle.send(call.command)
    }

    /// Parse and route a JSON method call
    pub fn dispatch_json(&self, json: &str) -> Result<()> {
        self.dispatch(MethodCall::from_json(json)?)
    }

    /// Close and forget one player, waiting for its task to finish
    pub async fn dispose(&mut self, id: SessionId) -> Result<()> {
        let entry = self.players.remove(&id).ok_or(Error::UnknownPlayer(id))?;
        Self::shutdown(id, entry).await;
        info!(session_id = %id, players = self.players.len(), "Player disposed");
        Ok(())
    }

    /// Close and forget every player
    pub async fn dispose_all(&mut self) {
        let count = self.players.len();
        for (id, entry) in self.players.drain() {
            Self::shutdown(id, entry).await;
        }
        info!(count, "All players disposed");
    }

    async fn shutdown(id: SessionId, entry: Entry) {
        // an already stopped task has closed its queue
        let _ = entry.handle.dispose();
        if let Err(e) = entry.task.await {
            warn!(session_id = %id, error = %e, "Player task failed");
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.players.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Host-wide keep-screen-on state
    pub fn screen(&self) -> &KeepScreenOn {
        &self.screen
    }
}
