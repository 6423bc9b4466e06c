//! Scripted scenarios against the simulated engine
//!
//! ```json
//! {
//!   "media": {"duration": 10000, "tracks": [{"id": 1, "kind": "audio", "language": "en"}]},
//!   "steps": [
//!     {"command": {"method": "open", "source": "movie.mp4"}},
//!     {"native": {"type": "ready"}},
//!     {"command": {"method": "play"}},
//!     {"advance": 1000}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use videoview_core::{
    sim::{SimulatedBackend, SimulatedMedia},
    BackendEvent, Command, PlayerConfig, PlayerEvent, PlayerSession,
};

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// Host command
    Command(Command),
    /// Native callback
    Native(BackendEvent),
    /// Let the clock run for this many milliseconds
    Advance(u64),
    /// Finish the seek the engine is performing
    CompleteSeek,
    /// Switch buffering on or off, with an optional buffered end
    Loading {
        loading: bool,
        #[serde(default)]
        buffered: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub media: SimulatedMedia,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// An event and the simulated time it was emitted at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timed {
    pub at: u64,
    #[serde(flatten)]
    pub event: PlayerEvent,
}

/// Run `scenario` to completion and collect every emitted event
pub fn run(scenario: &Scenario, config: PlayerConfig) -> Vec<Timed> {
    let engine = SimulatedBackend::new(scenario.media.clone());
    let position_step = config.position_interval_ms.max(1);
    let buffer_step = config.buffer_poll_interval_ms.max(1);
    let mut session = PlayerSession::new(engine.clone(), Vec::new(), config);
    let mut timeline = Vec::new();
    let mut now = 0;

    for step in &scenario.steps {
        debug!(at = now, ?step, "Step");
        match step {
            Step::Command(command) => session.execute(command.clone()),
            Step::Native(event) => session.handle_backend_event(event.clone()),
            Step::CompleteSeek => {
                if engine.complete_seek() {
                    session.handle_backend_event(BackendEvent::SeekCompleted);
                }
            }
            Step::Loading { loading, buffered } => {
                engine.set_loading(*loading);
                if let Some(end) = buffered {
                    engine.set_buffered(*end);
                }
                session.handle_backend_event(BackendEvent::LoadingChanged { loading: *loading });
            }
            Step::Advance(duration) => {
                let end = now + duration;
                while now < end {
                    let elapsed = position_step.min(end - now);
                    now += elapsed;
                    if engine.advance(elapsed) {
                        session.handle_backend_event(BackendEvent::Ended);
                    }
                    session.tick_position();
                    if now % buffer_step < elapsed {
                        session.poll_buffer();
                    }
                    session.flush_deferred();
                    collect(&mut session, &mut timeline, now);
                }
            }
        }
        session.flush_deferred();
        collect(&mut session, &mut timeline, now);
    }

    timeline
}

fn collect(session: &mut PlayerSession<SimulatedBackend>, timeline: &mut Vec<Timed>, at: u64) {
    timeline.extend(session.sink_mut().drain(..).map(|event| Timed { at, event }));
}
