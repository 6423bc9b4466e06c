//! Keep-screen-on requests shared by all players of a host

use crate::types::SessionId;
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

/// Host hook toggling the platform wake lock
pub trait ScreenWake: Send + Sync {
    fn set_keep_screen_on(&self, enabled: bool);
}

impl<F> ScreenWake for F
where
    F: Fn(bool) + Send + Sync,
{
    fn set_keep_screen_on(&self, enabled: bool) {
        self(enabled)
    }
}

/// Reference set of sessions that want the screen awake.
///
/// The wake lock is taken when the first session asks for it and released
/// when the last one lets go.
pub struct KeepScreenOn {
    holders: Mutex<HashSet<SessionId>>,
    wake: Box<dyn ScreenWake>,
}

impl KeepScreenOn {
    pub fn new(wake: impl ScreenWake + 'static) -> Self {
        Self { holders: Mutex::new(HashSet::new()), wake: Box::new(wake) }
    }

    /// Record whether `id` wants the screen kept on
    pub async fn request(&self, id: SessionId, enabled: bool) {
        let mut holders = self.holders.lock().await;
        if enabled {
            let first = holders.is_empty();
            if holders.insert(id) && first {
                debug!(session_id = %id, "Acquiring screen wake lock");
                self.wake.set_keep_screen_on(true);
            }
        } else if holders.remove(&id) && holders.is_empty() {
            debug!(session_id = %id, "Releasing screen wake lock");
            self.wake.set_keep_screen_on(false);
        }
    }

    pub async fn is_held(&self) -> bool {
        !self.holders.lock().await.is_empty()
    }

    pub async fn holders(&self) -> usize {
        self.holders.lock().await.len()
    }
}

impl std::fmt::Debug for KeepScreenOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepScreenOn").finish_non_exhaustive()
    }
}
