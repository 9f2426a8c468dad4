//! Poll loop
//!
//! Drives fetch → parse → snapshot → change detection on a fixed interval.
//! The first check runs immediately; afterwards the loop waits `interval`
//! after each completed tick, so ticks never overlap.
//!
//! A failed tick publishes [`TrayState::Unknown`] and leaves the detector's
//! baseline untouched, so a later recovery is compared against the last good
//! snapshot. The loop itself only ends on shutdown.
//!
//! # Example
//!
//! ```rust,ignore
//! use esostatus::fetcher::StatusFetcher;
//! use esostatus::notifications::{SharedSettings, StatusPublisher};
//! use esostatus::poller::StatusPoller;
//!
//! let publisher = StatusPublisher::new(SharedSettings::default());
//! let poller = StatusPoller::new(StatusFetcher::new()?, publisher.clone())?;
//! let handle = poller.spawn();
//! // ...
//! handle.shutdown().await?;
//! ```

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::catalog::Catalog;
use crate::config::{Config, IndeterminatePolicy};
use crate::detector::ChangeDetector;
use crate::error::{Error, ParseError};
use crate::fetcher::StatusSource;
use crate::models::{ChangeEvent, ServerStatusSnapshot, SingleServerStatus, TrayState, TrayStatus};
use crate::notifications::StatusPublisher;
use crate::parser::{ParseReport, StatusParser, Strategy, Verdict};

/// Default delay between checks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Tooltip published when the page could not be fetched
pub const FETCH_FAILED_TOOLTIP: &str = "ESO: update failed";

/// Tooltip published when no server could be read from the page
pub const UNREADABLE_TOOLTIP: &str = "ESO: status page unreadable";

/// Lifecycle of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Created or looping
    Running,
    /// Shut down; terminal
    Stopped,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A snapshot was built and handed to observers
    Published {
        snapshot: Arc<ServerStatusSnapshot>,
        changes: Vec<ChangeEvent>,
    },
    /// The fetch failed; Unknown was published
    FetchFailed,
    /// The page parsed to nothing; Unknown was published
    NothingParsed,
    /// Shutdown arrived before the tick finished; nothing was published
    Cancelled,
}

/// Periodic status checker
pub struct StatusPoller<S: StatusSource> {
    source: S,
    parser: StatusParser,
    catalog: Catalog,
    detector: ChangeDetector,
    publisher: StatusPublisher,
    interval: Duration,
    policy: IndeterminatePolicy,
    state: PollerState,
}

impl<S: StatusSource> StatusPoller<S> {
    /// Create a poller with the full catalog and default interval
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPattern` if the parser cannot be built
    pub fn new(source: S, publisher: StatusPublisher) -> Result<Self, ParseError> {
        Ok(Self {
            source,
            parser: StatusParser::new()?,
            catalog: Catalog::full(),
            detector: ChangeDetector::new(),
            publisher,
            interval: DEFAULT_INTERVAL,
            policy: IndeterminatePolicy::Omit,
            state: PollerState::Running,
        })
    }

    /// Create a poller using the `[poll]` config section
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPattern` if the parser cannot be built
    pub fn from_config(
        source: S,
        publisher: StatusPublisher,
        config: &Config,
    ) -> Result<Self, ParseError> {
        Ok(Self::new(source, publisher)?
            .with_interval(config.poll.interval())
            .with_policy(config.poll.indeterminate))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_policy(mut self, policy: IndeterminatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn publisher(&self) -> &StatusPublisher {
        &self.publisher
    }

    /// Run one tick: fetch, parse, diff and publish
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        let fetched = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => {
                tracing::debug!("Shutdown during fetch, abandoning tick");
                return CycleOutcome::Cancelled;
            }
            result = self.source.fetch() => result,
        };

        match fetched {
            Ok(document) => self.process(&document),
            Err(err) => {
                self.report_failure(err.into(), FETCH_FAILED_TOOLTIP);
                CycleOutcome::FetchFailed
            }
        }
    }

    /// Loop until shutdown is signalled
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.state = PollerState::Running;
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            servers = self.catalog.len(),
            "Status poller started"
        );

        loop {
            if self.run_cycle(&mut shutdown).await == CycleOutcome::Cancelled {
                break;
            }

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state = PollerState::Stopped;
        tracing::info!("Status poller stopped");
    }

    fn process(&mut self, document: &str) -> CycleOutcome {
        let report = self.parser.parse_report(document, &self.catalog);
        if report.is_empty() {
            tracing::debug!(bytes = document.len(), "Keeping previous baseline");
            self.report_failure(ParseError::NothingResolved.into(), UNREADABLE_TOOLTIP);
            return CycleOutcome::NothingParsed;
        }

        let statuses = self.apply_policy(&report);
        let snapshot = ServerStatusSnapshot::build(statuses, Utc::now());
        let detection = self.detector.update(snapshot.clone());
        let snapshot = Arc::new(snapshot);

        tracing::info!(
            strategy = report.strategy.as_str(),
            resolved = snapshot.len(),
            online = snapshot.online_count(),
            state = %detection.tray.state(),
            changes = detection.changes.len(),
            "Status updated"
        );
        for change in &detection.changes {
            tracing::info!(
                server = %change.server,
                online = change.is_online,
                "Server state changed"
            );
        }

        self.publisher.publish_snapshot(Arc::clone(&snapshot));
        self.publisher.publish_tray(detection.tray);
        self.publisher.publish_changes(&detection.changes);

        CycleOutcome::Published {
            snapshot,
            changes: detection.changes,
        }
    }

    fn apply_policy(&self, report: &ParseReport) -> Vec<SingleServerStatus> {
        report
            .verdicts
            .iter()
            .filter_map(|(server, verdict)| {
                let is_online = match verdict {
                    Verdict::Online => Some(true),
                    Verdict::Offline => Some(false),
                    // A server missing from a table is omitted, never assumed
                    Verdict::Indeterminate if report.strategy != Strategy::Proximity => None,
                    Verdict::Indeterminate => {
                        let resolved = self.policy.resolve();
                        tracing::debug!(
                            server = %server,
                            policy = ?self.policy,
                            "No confident status for server"
                        );
                        resolved
                    }
                };
                is_online.map(|online| SingleServerStatus::new(*server, online))
            })
            .collect()
    }

    /// Log a failed tick and publish Unknown; the baseline is left alone
    fn report_failure(&self, err: Error, tooltip: &str) {
        if err.is_recoverable() {
            tracing::warn!(
                category = %err.category(),
                error = %err,
                "Status check failed, retrying next tick"
            );
        } else {
            tracing::error!(category = %err.category(), error = %err, "Status check failed");
        }
        self.publisher
            .publish_tray(TrayStatus::new(TrayState::Unknown, tooltip));
    }
}

impl<S: StatusSource + 'static> StatusPoller<S> {
    /// Run the loop on its own task
    pub fn spawn(mut self) -> PollerHandle<S> {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            self.run(shutdown_rx).await;
            self
        });

        PollerHandle { join, shutdown }
    }
}

/// Resolves once shutdown is requested or the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Handle to a spawned poller
///
/// Dropping the handle stops the loop as well.
pub struct PollerHandle<S: StatusSource> {
    join: JoinHandle<StatusPoller<S>>,
    shutdown: watch::Sender<bool>,
}

impl<S: StatusSource> PollerHandle<S> {
    /// Signal shutdown and wait for the loop to stop
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` if the poller task panicked
    pub async fn shutdown(self) -> Result<StatusPoller<S>, JoinError> {
        let _ = self.shutdown.send(true);
        self.join.await
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Megaserver;
    use crate::notifications::SharedSettings;
    use crate::utils::error::FetchError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Reply {
        Body(&'static str),
        Status(u16),
    }

    struct Scripted(Mutex<VecDeque<Reply>>);

    impl Scripted {
        fn new(replies: Vec<Reply>) -> Self {
            Self(Mutex::new(replies.into()))
        }
    }

    #[async_trait]
    impl StatusSource for Scripted {
        async fn fetch(&self) -> Result<String, FetchError> {
            match self.0.lock().unwrap().pop_front() {
                Some(Reply::Body(body)) => Ok(body.to_string()),
                Some(Reply::Status(code)) => Err(FetchError::ServerError(code)),
                None => Err(FetchError::Timeout),
            }
        }
    }

    const BOTH_UP: &str = "<table><tr><td>PC EU Megaserver</td><td>Online</td></tr>\
        <tr><td>PC NA Megaserver</td><td>Online</td></tr></table>";
    const EU_DOWN: &str = "<table><tr><td>PC EU Megaserver</td><td>Offline</td></tr>\
        <tr><td>PC NA Megaserver</td><td>Online</td></tr></table>";

    fn poller(replies: Vec<Reply>) -> StatusPoller<Scripted> {
        StatusPoller::new(Scripted::new(replies), StatusPublisher::new(SharedSettings::default()))
            .unwrap()
            .with_catalog(Catalog::only(&[Megaserver::PcEu, Megaserver::PcNa]))
    }

    #[tokio::test]
    async fn test_cycle_publishes_snapshot() {
        let (_tx, mut rx) = watch::channel(false);
        let mut poller = poller(vec![Reply::Body(BOTH_UP)]);

        let outcome = poller.run_cycle(&mut rx).await;
        let CycleOutcome::Published { snapshot, changes } = outcome else {
            panic!("expected a published snapshot, got {outcome:?}");
        };
        assert_eq!(snapshot.len(), 2);
        assert!(changes.is_empty());
        assert_eq!(
            poller.publisher().latest_tray().map(|t| t.state()),
            Some(TrayState::Online)
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_baseline() {
        let (_tx, mut rx) = watch::channel(false);
        let mut poller = poller(vec![
            Reply::Body(BOTH_UP),
            Reply::Status(503),
            Reply::Body("<p>maintenance page</p>"),
            Reply::Body(EU_DOWN),
        ]);

        poller.run_cycle(&mut rx).await;
        let baseline = poller.detector().previous().cloned();

        assert_eq!(poller.run_cycle(&mut rx).await, CycleOutcome::FetchFailed);
        let tray = poller.publisher().latest_tray().unwrap();
        assert_eq!(tray.state(), TrayState::Unknown);
        assert_eq!(tray.tooltip(), FETCH_FAILED_TOOLTIP);

        assert_eq!(poller.run_cycle(&mut rx).await, CycleOutcome::NothingParsed);
        assert_eq!(poller.detector().previous().cloned(), baseline);

        let CycleOutcome::Published { changes, .. } = poller.run_cycle(&mut rx).await else {
            panic!("expected recovery");
        };
        assert_eq!(
            changes,
            vec![ChangeEvent {
                server: Megaserver::PcEu,
                is_online: false
            }]
        );
    }

    #[tokio::test]
    async fn test_policy_fills_proximity_gaps() {
        let (_tx, mut rx) = watch::channel(false);
        let only_eu = "<p>PC EU Megaserver is Online</p>";
        let mut poller = StatusPoller::new(
            Scripted::new(vec![Reply::Body(only_eu), Reply::Body(only_eu)]),
            StatusPublisher::new(SharedSettings::default()),
        )
        .unwrap()
        .with_catalog(Catalog::only(&[Megaserver::PcEu, Megaserver::PcNa]));

        let CycleOutcome::Published { snapshot, .. } = poller.run_cycle(&mut rx).await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.get(Megaserver::PcNa), None);

        poller = poller.with_policy(IndeterminatePolicy::AssumeOffline);
        let CycleOutcome::Published { snapshot, .. } = poller.run_cycle(&mut rx).await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.get(Megaserver::PcNa), Some(false));
    }

    #[tokio::test]
    async fn test_policy_ignores_rows_missing_from_table() {
        let (_tx, mut rx) = watch::channel(false);
        let only_eu = "<table><tr><td>PC EU Megaserver</td><td>Online</td></tr></table>";
        let mut poller = StatusPoller::new(
            Scripted::new(vec![Reply::Body(only_eu)]),
            StatusPublisher::new(SharedSettings::default()),
        )
        .unwrap()
        .with_catalog(Catalog::only(&[Megaserver::PcEu, Megaserver::PcNa]))
        .with_policy(IndeterminatePolicy::AssumeOnline);

        let CycleOutcome::Published { snapshot, .. } = poller.run_cycle(&mut rx).await else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.get(Megaserver::PcEu), Some(true));
        assert_eq!(snapshot.get(Megaserver::PcNa), None);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_wait_for_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let mut wait = tokio_test::task::spawn(async move { wait_for_shutdown(&mut rx).await });
        tokio_test::assert_pending!(wait.poll());

        tx.send(true).unwrap();
        assert!(wait.is_woken());
        tokio_test::assert_ready!(wait.poll());
    }

    #[test]
    fn test_dropped_sender_counts_as_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let mut wait = tokio_test::task::spawn(async move { wait_for_shutdown(&mut rx).await });
        tokio_test::assert_pending!(wait.poll());

        drop(tx);
        tokio_test::assert_ready!(wait.poll());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let (tx, mut rx) = watch::channel(false);
        let mut poller = poller(vec![Reply::Body(BOTH_UP)]);
        tx.send(true).unwrap();

        assert_eq!(poller.run_cycle(&mut rx).await, CycleOutcome::Cancelled);
        assert!(poller.publisher().latest_snapshot().is_none());
        assert!(poller.detector().previous().is_none());
    }
}
