//! Transient user-visible messages.
//!
//! At most one notification is displayed. Each one schedules its own clear
//! after the configured TTL, and that clear only fires if the notification it
//! was scheduled for is still the one on display.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct SurfaceState {
    next_id: u64,
    current: Option<Notification>,
}

#[derive(Debug, Clone)]
pub struct NotificationSurface {
    ttl: Duration,
    state: Arc<Mutex<SurfaceState>>,
}

impl NotificationSurface {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Arc::new(Mutex::new(SurfaceState::default())),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Displays `text`, replacing whatever is shown, and schedules its expiry.
    pub fn notify(&self, text: impl Into<String>) -> NotificationId {
        let text = text.into();
        let expires_at = Instant::now() + self.ttl;
        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            let id = NotificationId(state.next_id);
            state.current = Some(Notification {
                id,
                text: text.clone(),
                expires_at,
            });
            id
        };
        debug!(notification = id.0, %text, "notification shown");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let surface = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep_until(expires_at).await;
                    surface.clear_if_current(id);
                });
            }
            Err(_) => debug!(
                notification = id.0,
                "no async runtime; notification stays until replaced"
            ),
        }
        id
    }

    /// Clears the display only if `id` is still the active notification.
    /// Returns whether anything was cleared.
    pub fn clear_if_current(&self, id: NotificationId) -> bool {
        let mut state = self.lock();
        let is_current = state
            .current
            .as_ref()
            .is_some_and(|notification| notification.id == id);
        if is_current {
            state.current = None;
            debug!(notification = id.0, "notification expired");
        }
        is_current
    }

    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        self.lock().current.clone()
    }

    #[must_use]
    pub fn current_text(&self) -> Option<String> {
        self.lock()
            .current
            .as_ref()
            .map(|notification| notification.text.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
