//! esostatus - ESO megaserver status watcher
//!
//! Periodically fetches the public status page, extracts a per-server
//! online/offline verdict and reports transitions to observers.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`catalog`] - The closed set of tracked megaservers and their page labels
//! - [`parser`] - Table extraction with a proximity-search fallback
//! - [`models`] - Snapshots, tray state and change events
//! - [`detector`] - Diffing consecutive snapshots
//! - [`fetcher`] - HTTP access to the status page
//! - [`notifications`] - Broadcasting updates to observers
//! - [`poller`] - The periodic fetch/parse/diff loop
//! - [`config`] - Configuration management and settings
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use esostatus::fetcher::StatusFetcher;
//! use esostatus::notifications::{SharedSettings, StatusEvent, StatusPublisher};
//! use esostatus::poller::StatusPoller;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let publisher = StatusPublisher::new(SharedSettings::default());
//!     let mut events = publisher.subscribe();
//!     let handle = StatusPoller::new(StatusFetcher::new()?, publisher)?.spawn();
//!
//!     if let Ok(StatusEvent::Snapshot(snapshot)) = events.recv().await {
//!         println!("{} servers online", snapshot.online_count());
//!     }
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod notifications;
pub mod parser;
pub mod poller;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{Catalog, Megaserver};
    pub use crate::config::{Config, IndeterminatePolicy};
    pub use crate::detector::{ChangeDetector, Detection};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::fetcher::{StatusFetcher, StatusSource};
    pub use crate::models::{
        ChangeEvent, ServerStatusSnapshot, SingleServerStatus, TrayState, TrayStatus,
    };
    pub use crate::notifications::{SharedSettings, StatusEvent, StatusPublisher};
    pub use crate::parser::{ParseReport, StatusParser, Strategy, Verdict};
    pub use crate::poller::{CycleOutcome, PollerHandle, PollerState, StatusPoller};
}

// Direct re-exports for convenience
pub use catalog::{Catalog, Megaserver};
pub use models::{ServerStatusSnapshot, SingleServerStatus, TrayState, TrayStatus};
