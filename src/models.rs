// Core data structures for the status watcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Megaserver;
use crate::utils::truncate_chars;

/// Maximum tooltip length accepted by the tray shell
pub const TOOLTIP_MAX_CHARS: usize = 63;

/// Verdict for one server in one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SingleServerStatus {
    pub server: Megaserver,
    pub is_online: bool,
}

impl SingleServerStatus {
    pub fn new(server: Megaserver, is_online: bool) -> Self {
        Self { server, is_online }
    }
}

/// Aggregate health indicator shown in the tray
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrayState {
    Unknown,
    Online,
    /// Reserved for partial outages; never derived from a snapshot
    Degraded,
    Offline,
}

impl TrayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Degraded => "degraded",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for TrayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tray state plus tooltip text, capped at [`TOOLTIP_MAX_CHARS`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTrayStatus")]
pub struct TrayStatus {
    state: TrayState,
    tooltip: String,
}

impl TrayStatus {
    pub fn new(state: TrayState, tooltip: impl AsRef<str>) -> Self {
        Self {
            state,
            tooltip: truncate_chars(tooltip.as_ref(), TOOLTIP_MAX_CHARS),
        }
    }

    pub fn state(&self) -> TrayState {
        self.state
    }

    pub fn tooltip(&self) -> &str {
        &self.tooltip
    }
}

#[derive(Deserialize)]
struct RawTrayStatus {
    state: TrayState,
    tooltip: String,
}

impl From<RawTrayStatus> for TrayStatus {
    fn from(raw: RawTrayStatus) -> Self {
        Self::new(raw.state, raw.tooltip)
    }
}

/// Immutable point-in-time record of every resolved server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct ServerStatusSnapshot {
    items: Vec<SingleServerStatus>,
    checked_at: DateTime<Utc>,
}

impl ServerStatusSnapshot {
    /// Build a snapshot from parser output
    ///
    /// A repeated server keeps its first position but takes the last verdict.
    pub fn build(
        statuses: impl IntoIterator<Item = SingleServerStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut items: Vec<SingleServerStatus> = Vec::new();
        for status in statuses {
            match items.iter_mut().find(|s| s.server == status.server) {
                Some(existing) => existing.is_online = status.is_online,
                None => items.push(status),
            }
        }

        Self {
            items,
            checked_at: now,
        }
    }

    pub fn items(&self) -> &[SingleServerStatus] {
        &self.items
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Verdict for a server, `None` if it was not resolved this cycle
    pub fn get(&self, server: Megaserver) -> Option<bool> {
        self.items
            .iter()
            .find(|s| s.server == server)
            .map(|s| s.is_online)
    }

    pub fn online_count(&self) -> usize {
        self.items.iter().filter(|s| s.is_online).count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Offline if any entry is offline, Online if all are, Unknown when empty
    pub fn overall_state(&self) -> TrayState {
        if self.items.iter().any(|s| !s.is_online) {
            TrayState::Offline
        } else if self.items.is_empty() {
            TrayState::Unknown
        } else {
            TrayState::Online
        }
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    items: Vec<SingleServerStatus>,
    checked_at: DateTime<Utc>,
}

impl From<RawSnapshot> for ServerStatusSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        Self::build(raw.items, raw.checked_at)
    }
}

/// Transition of a server that was present in both consecutive snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub server: Megaserver,
    pub is_online: bool,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_online { "Online" } else { "Offline" };
        write!(f, "{}: {state}", self.server.label())
    }
}
