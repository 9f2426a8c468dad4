//! Change detection between consecutive snapshots
//!
//! The detector owns the only mutable state of the watcher: the last good
//! snapshot. Each update diffs the new snapshot against it, derives the tray
//! status, and then replaces it unconditionally.
//!
//! Only servers present in both snapshots can produce a [`ChangeEvent`]. A
//! server seen for the first time (or again after a gap) becomes a fresh
//! baseline instead of a transition.

use crate::models::{ChangeEvent, ServerStatusSnapshot, TrayState, TrayStatus};

/// Result of feeding one snapshot to the detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub tray: TrayStatus,
    pub changes: Vec<ChangeEvent>,
}

/// Holds the previous snapshot and diffs new ones against it
#[derive(Debug, Default)]
pub struct ChangeDetector {
    previous: Option<ServerStatusSnapshot>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Snapshot the next update will be compared against
    pub fn previous(&self) -> Option<&ServerStatusSnapshot> {
        self.previous.as_ref()
    }

    /// Forget the baseline; the next update reports no changes
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Diff `snapshot` against the previous one and store it as the new baseline
    pub fn update(&mut self, snapshot: ServerStatusSnapshot) -> Detection {
        let changes = match &self.previous {
            Some(previous) => diff(previous, &snapshot),
            None => Vec::new(),
        };
        let tray = tray_status(&snapshot);

        self.previous = Some(snapshot);

        Detection { tray, changes }
    }
}

/// Transitions of servers present in both snapshots, in `current` order
pub fn diff(previous: &ServerStatusSnapshot, current: &ServerStatusSnapshot) -> Vec<ChangeEvent> {
    current
        .items()
        .iter()
        .filter(|item| {
            previous
                .get(item.server)
                .is_some_and(|was_online| was_online != item.is_online)
        })
        .map(|item| ChangeEvent {
            server: item.server,
            is_online: item.is_online,
        })
        .collect()
}

/// Tray status for a snapshot: derived state plus a short summary
pub fn tray_status(snapshot: &ServerStatusSnapshot) -> TrayStatus {
    TrayStatus::new(snapshot.overall_state(), summary(snapshot))
}

/// One-line summary suitable for a tooltip
///
/// Truncation to the tooltip cap happens in [`TrayStatus::new`].
pub fn summary(snapshot: &ServerStatusSnapshot) -> String {
    match snapshot.overall_state() {
        TrayState::Online => format!("ESO: all {} online", snapshot.len()),
        TrayState::Offline => {
            let down: Vec<&str> = snapshot
                .items()
                .iter()
                .filter(|s| !s.is_online)
                .map(|s| s.server.abbreviation())
                .collect();
            format!(
                "ESO: {}/{} online, down: {}",
                snapshot.online_count(),
                snapshot.len(),
                down.join(" ")
            )
        }
        TrayState::Unknown | TrayState::Degraded => "ESO: no data".to_string(),
    }
}

/// Batched notification text, one line per transition
///
/// Returns `None` when there is nothing to report.
pub fn notification_message(changes: &[ChangeEvent]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }

    Some(
        changes
            .iter()
            .map(ChangeEvent::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
