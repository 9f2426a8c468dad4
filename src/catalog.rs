//! Megaserver catalog
//!
//! The tracked servers form a closed set. Each one maps to the exact label
//! printed on the status page; the mapping is an exhaustive `match`, so adding
//! a variant without a label does not compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the tracked megaserver clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Megaserver {
    PcEu,
    PcNa,
    PcPts,
    XboxEu,
    XboxNa,
    PlayStationEu,
    PlayStationNa,
}

impl Megaserver {
    /// Every megaserver in catalog order
    pub const ALL: [Megaserver; 7] = [
        Self::PcEu,
        Self::PcNa,
        Self::PcPts,
        Self::XboxEu,
        Self::XboxNa,
        Self::PlayStationEu,
        Self::PlayStationNa,
    ];

    /// Display label as it appears on the status page
    pub fn label(&self) -> &'static str {
        match self {
            Self::PcEu => "PC EU Megaserver",
            Self::PcNa => "PC NA Megaserver",
            Self::PcPts => "PC PTS Megaserver",
            Self::XboxEu => "XBOX EU Megaserver",
            Self::XboxNa => "XBOX NA Megaserver",
            Self::PlayStationEu => "PlayStation EU Megaserver",
            Self::PlayStationNa => "PlayStation NA Megaserver",
        }
    }

    /// Short code for compact tooltips
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::PcEu => "PCEU",
            Self::PcNa => "PCNA",
            Self::PcPts => "PTS",
            Self::XboxEu => "XBEU",
            Self::XboxNa => "XBNA",
            Self::PlayStationEu => "PSEU",
            Self::PlayStationNa => "PSNA",
        }
    }
}

impl fmt::Display for Megaserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Megaserver {
    type Err = String;

    /// Accepts the page label or the abbreviation, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|server| {
                server.label().eq_ignore_ascii_case(wanted)
                    || server.abbreviation().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("Unknown megaserver: {s}"))
    }
}

/// Ordered set of megaservers the parser looks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    servers: Vec<Megaserver>,
}

impl Catalog {
    /// Catalog covering every megaserver
    pub fn full() -> Self {
        Self {
            servers: Megaserver::ALL.to_vec(),
        }
    }

    /// Catalog restricted to the given servers, first occurrence kept
    pub fn only(servers: &[Megaserver]) -> Self {
        let mut unique = Vec::with_capacity(servers.len());
        for server in servers {
            if !unique.contains(server) {
                unique.push(*server);
            }
        }
        Self { servers: unique }
    }

    /// Iterate `(server, label)` pairs in catalog order
    pub fn entries(&self) -> impl Iterator<Item = (Megaserver, &'static str)> + '_ {
        self.servers.iter().map(|s| (*s, s.label()))
    }

    pub fn servers(&self) -> &[Megaserver] {
        &self.servers
    }

    pub fn contains(&self, server: Megaserver) -> bool {
        self.servers.contains(&server)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::full()
    }
}
