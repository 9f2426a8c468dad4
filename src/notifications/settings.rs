//! User-facing switches read by the notification layer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Source of the "notifications enabled" switch
pub trait Settings: Send + Sync {
    fn notifications_enabled(&self) -> bool;
}

/// Runtime-toggleable settings shared between the poller and a UI
///
/// Clones share the same switch.
#[derive(Debug, Clone)]
pub struct SharedSettings {
    notifications: Arc<AtomicBool>,
}

impl SharedSettings {
    pub fn new(notifications_enabled: bool) -> Self {
        Self {
            notifications: Arc::new(AtomicBool::new(notifications_enabled)),
        }
    }

    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.notifications.store(enabled, Ordering::Relaxed);
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Settings for SharedSettings {
    fn notifications_enabled(&self) -> bool {
        self.notifications.load(Ordering::Relaxed)
    }
}
