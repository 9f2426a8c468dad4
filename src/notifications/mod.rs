//! Delivery of status updates to observers
//!
//! ```text
//!   StatusPoller ──► StatusPublisher ──► broadcast<StatusEvent> ──► tray UI
//!                        │                                     └──► notifier
//!                        └─ watch: latest tray status / snapshot
//! ```
//!
//! Observers usually live on another execution context (a UI thread, a
//! logging task). They subscribe to a broadcast channel and marshal events
//! themselves; the poller never blocks on them. The latest tray status and
//! snapshot are also kept in `watch` channels so late subscribers can catch
//! up without waiting for the next tick.
//!
//! # Example
//!
//! ```rust,ignore
//! use esostatus::notifications::{SharedSettings, StatusEvent, StatusPublisher};
//!
//! let publisher = StatusPublisher::new(SharedSettings::default());
//! let mut events = publisher.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if let StatusEvent::Notification(message) = event {
//!             show_balloon(&message);
//!         }
//!     }
//! });
//! ```

mod settings;

pub use settings::{Settings, SharedSettings};

use std::sync::Arc;
use tokio::sync::{broadcast, watch};

use crate::detector::notification_message;
use crate::models::{ChangeEvent, ServerStatusSnapshot, TrayStatus};

/// Broadcast buffer; slow observers skip events beyond this
const EVENT_CAPACITY: usize = 64;

/// Event delivered to observers
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Aggregate state changed or was refreshed
    Tray(TrayStatus),
    /// Full snapshot from a successful cycle
    Snapshot(Arc<ServerStatusSnapshot>),
    /// Batched transition message, one line per server
    Notification(String),
}

/// Fan-out point between the poll loop and its observers
#[derive(Clone)]
pub struct StatusPublisher {
    events: broadcast::Sender<StatusEvent>,
    latest_tray: Arc<watch::Sender<Option<TrayStatus>>>,
    latest_snapshot: Arc<watch::Sender<Option<Arc<ServerStatusSnapshot>>>>,
    settings: Arc<dyn Settings>,
}

impl StatusPublisher {
    pub fn new(settings: impl Settings + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (latest_tray, _) = watch::channel(None);
        let (latest_snapshot, _) = watch::channel(None);

        Self {
            events,
            latest_tray: Arc::new(latest_tray),
            latest_snapshot: Arc::new(latest_snapshot),
            settings: Arc::new(settings),
        }
    }

    /// Subscribe to every future event
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Watch the latest tray status
    pub fn watch_tray(&self) -> watch::Receiver<Option<TrayStatus>> {
        self.latest_tray.subscribe()
    }

    pub fn latest_tray(&self) -> Option<TrayStatus> {
        self.latest_tray.borrow().clone()
    }

    pub fn latest_snapshot(&self) -> Option<Arc<ServerStatusSnapshot>> {
        self.latest_snapshot.borrow().clone()
    }

    pub fn publish_tray(&self, tray: TrayStatus) {
        self.latest_tray.send_replace(Some(tray.clone()));
        self.send(StatusEvent::Tray(tray));
    }

    pub fn publish_snapshot(&self, snapshot: Arc<ServerStatusSnapshot>) {
        self.latest_snapshot.send_replace(Some(Arc::clone(&snapshot)));
        self.send(StatusEvent::Snapshot(snapshot));
    }

    /// Emit a batched notification for `changes`
    ///
    /// Suppressed when the list is empty or notifications are switched off.
    /// Returns the message that was sent.
    pub fn publish_changes(&self, changes: &[ChangeEvent]) -> Option<String> {
        let message = notification_message(changes)?;

        if !self.settings.notifications_enabled() {
            tracing::debug!(changes = changes.len(), "Notifications disabled, suppressing");
            return None;
        }

        self.send(StatusEvent::Notification(message.clone()));
        Some(message)
    }

    fn send(&self, event: StatusEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("No status subscribers");
        }
    }
}

impl std::fmt::Debug for StatusPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPublisher")
            .field("subscribers", &self.events.receiver_count())
            .field("notifications_enabled", &self.settings.notifications_enabled())
            .finish()
    }
}
