//! Status page parsing
//!
//! Two independent strategies turn the status page into per-server verdicts:
//!
//! 1. [`structured`] reads `name | status` pairs out of table rows.
//! 2. [`proximity`] searches the raw text for a label followed closely by a
//!    status keyword.
//!
//! The structured pass wins atomically: if it resolves at least one server
//! the proximity pass never runs, even for servers the table did not cover.
//! Parsing never fails on document content; an unreadable page simply
//! produces no verdicts.

pub mod proximity;
pub mod sanitize;
pub mod selectors;
pub mod structured;

pub use proximity::{ProximityMatcher, PROXIMITY_WINDOW_CHARS};

use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Megaserver};
use crate::models::SingleServerStatus;
use crate::utils::error::ParseError;

/// Outcome for one server in one parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Online,
    Offline,
    /// Label missing, or no confident status next to it
    Indeterminate,
}

impl Verdict {
    /// `Some(is_online)` for a confident verdict
    pub fn is_online(&self) -> Option<bool> {
        match self {
            Self::Online => Some(true),
            Self::Offline => Some(false),
            Self::Indeterminate => None,
        }
    }
}

/// Which strategy produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    Structured,
    Proximity,
    /// Neither strategy resolved anything
    None,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Proximity => "proximity",
            Self::None => "none",
        }
    }
}

/// Per-server verdicts for one document, in catalog order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReport {
    pub strategy: Strategy,
    pub verdicts: Vec<(Megaserver, Verdict)>,
}

impl ParseReport {
    /// Confident verdicts only
    pub fn statuses(&self) -> Vec<SingleServerStatus> {
        self.verdicts
            .iter()
            .filter_map(|(server, verdict)| {
                verdict
                    .is_online()
                    .map(|is_online| SingleServerStatus::new(*server, is_online))
            })
            .collect()
    }

    /// Servers without a confident verdict
    pub fn indeterminate(&self) -> Vec<Megaserver> {
        self.verdicts
            .iter()
            .filter(|(_, verdict)| *verdict == Verdict::Indeterminate)
            .map(|(server, _)| *server)
            .collect()
    }

    pub fn resolved_count(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|(_, verdict)| *verdict != Verdict::Indeterminate)
            .count()
    }

    /// True when no server was resolved
    pub fn is_empty(&self) -> bool {
        self.resolved_count() == 0
    }
}

/// Status page parser
#[derive(Debug, Clone)]
pub struct StatusParser {
    proximity: ProximityMatcher,
}

impl StatusParser {
    /// Create a new parser
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPattern` if a label pattern fails to compile
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            proximity: ProximityMatcher::new()?,
        })
    }

    /// Confident statuses for every catalog entry that resolved
    pub fn parse(&self, document: &str, catalog: &Catalog) -> Vec<SingleServerStatus> {
        self.parse_report(document, catalog).statuses()
    }

    /// Full per-server report including indeterminate entries
    pub fn parse_report(&self, document: &str, catalog: &Catalog) -> ParseReport {
        let html = Html::parse_document(document);
        let verdicts = structured::extract(&html, catalog);
        if resolved(&verdicts) > 0 {
            tracing::debug!(
                resolved = resolved(&verdicts),
                catalog = catalog.len(),
                "Structured extraction succeeded"
            );
            return ParseReport {
                strategy: Strategy::Structured,
                verdicts,
            };
        }

        tracing::debug!("No table rows matched, falling back to proximity search");
        let verdicts = self.proximity.extract(document, catalog);
        if resolved(&verdicts) > 0 {
            tracing::debug!(
                resolved = resolved(&verdicts),
                catalog = catalog.len(),
                "Proximity fallback succeeded"
            );
            return ParseReport {
                strategy: Strategy::Proximity,
                verdicts,
            };
        }

        tracing::warn!(bytes = document.len(), "No server status found in document");
        ParseReport {
            strategy: Strategy::None,
            verdicts,
        }
    }
}

fn resolved(verdicts: &[(Megaserver, Verdict)]) -> usize {
    verdicts
        .iter()
        .filter(|(_, verdict)| *verdict != Verdict::Indeterminate)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> StatusParser {
        StatusParser::new().unwrap()
    }

    #[test]
    fn test_structured_table() {
        let html = r#"<table>
            <tr><td>PC EU Megaserver</td><td>Online</td></tr>
            <tr><td>PC NA Megaserver</td><td>Offline</td></tr>
        </table>"#;
        let catalog = Catalog::only(&[Megaserver::PcEu, Megaserver::PcNa]);
        let report = parser().parse_report(html, &catalog);

        assert_eq!(report.strategy, Strategy::Structured);
        assert_eq!(
            report.statuses(),
            vec![
                SingleServerStatus::new(Megaserver::PcEu, true),
                SingleServerStatus::new(Megaserver::PcNa, false),
            ]
        );
    }

    #[test]
    fn test_structured_wins_atomically() {
        // PC NA is only resolvable by proximity; it must stay unresolved.
        let html = r#"<table><tr><td>PC EU Megaserver</td><td>Online</td></tr></table>
            <p>PC NA Megaserver is Offline</p>"#;
        let catalog = Catalog::only(&[Megaserver::PcEu, Megaserver::PcNa]);
        let report = parser().parse_report(html, &catalog);

        assert_eq!(report.strategy, Strategy::Structured);
        assert_eq!(report.indeterminate(), vec![Megaserver::PcNa]);
        assert_eq!(report.statuses().len(), 1);
    }

    #[test]
    fn test_proximity_fallback() {
        let html = "<p>PC EU Megaserver is currently Online for maintenance</p>";
        let catalog = Catalog::only(&[Megaserver::PcEu, Megaserver::XboxEu]);
        let report = parser().parse_report(html, &catalog);

        assert_eq!(report.strategy, Strategy::Proximity);
        assert_eq!(
            report.statuses(),
            vec![SingleServerStatus::new(Megaserver::PcEu, true)]
        );
        assert_eq!(report.indeterminate(), vec![Megaserver::XboxEu]);
    }

    #[test]
    fn test_nothing_resolved() {
        let html = "<html><body>Service unavailable</body></html>";
        let report = parser().parse_report(html, &Catalog::full());
        assert_eq!(report.strategy, Strategy::None);
        assert!(report.is_empty());
        assert_eq!(report.indeterminate().len(), 7);
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parser().parse("", &Catalog::full()).is_empty());
    }

    #[test]
    fn test_ambiguous_table_falls_back() {
        // A table whose status cells are all ambiguous resolves nothing, so
        // the proximity pass gets its turn on the raw text.
        let html = r#"<table><tr><td>PC PTS Megaserver</td><td>Maintenance</td></tr></table>
            <div>PC PTS Megaserver status: offline</div>"#;
        let catalog = Catalog::only(&[Megaserver::PcPts]);
        let report = parser().parse_report(html, &catalog);
        assert_eq!(report.strategy, Strategy::Proximity);
        assert_eq!(report.verdicts, vec![(Megaserver::PcPts, Verdict::Offline)]);
    }
}
