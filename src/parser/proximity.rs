//! Proximity fallback
//!
//! Used when the page has no usable table structure. A server resolves when
//! its label is followed by "Online" or "Offline" within a bounded window of
//! characters; the nearest keyword after the leftmost such label wins.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::catalog::{Catalog, Megaserver};
use crate::parser::Verdict;
use crate::utils::error::ParseError;

/// Characters allowed between a label and its status keyword
pub const PROXIMITY_WINDOW_CHARS: usize = 200;

/// Pre-compiled label patterns for every megaserver
#[derive(Debug, Clone)]
pub struct ProximityMatcher {
    patterns: HashMap<Megaserver, Regex>,
    window: usize,
}

impl ProximityMatcher {
    /// Build a matcher with the default window
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPattern` if a label pattern fails to compile
    pub fn new() -> Result<Self, ParseError> {
        Self::with_window(PROXIMITY_WINDOW_CHARS)
    }

    /// Build a matcher with a custom window
    ///
    /// # Errors
    ///
    /// Returns `ParseError::InvalidPattern` if a label pattern fails to compile
    pub fn with_window(window: usize) -> Result<Self, ParseError> {
        let mut patterns = HashMap::with_capacity(Megaserver::ALL.len());

        for server in Megaserver::ALL {
            let label = server.label();
            let pattern = format!(r"{}.{{0,{window}}}?(online|offline)", regex::escape(label));
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .dot_matches_new_line(true)
                .build()
                .map_err(|source| ParseError::InvalidPattern {
                    label: label.to_string(),
                    source,
                })?;
            patterns.insert(server, regex);
        }

        Ok(Self { patterns, window })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Verdict for a single server
    pub fn find(&self, document: &str, server: Megaserver) -> Verdict {
        let Some(regex) = self.patterns.get(&server) else {
            return Verdict::Indeterminate;
        };

        match regex.captures(document).and_then(|caps| caps.get(1)) {
            Some(keyword) if keyword.as_str().eq_ignore_ascii_case("online") => Verdict::Online,
            Some(_) => Verdict::Offline,
            None => Verdict::Indeterminate,
        }
    }

    /// Run the proximity pass for every catalog entry
    pub fn extract(&self, document: &str, catalog: &Catalog) -> Vec<(Megaserver, Verdict)> {
        catalog
            .entries()
            .map(|(server, _)| (server, self.find(document, server)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> ProximityMatcher {
        ProximityMatcher::new().unwrap()
    }

    #[test]
    fn test_keyword_inside_window() {
        let doc = format!("PC EU Megaserver{}Online", "-".repeat(40));
        assert_eq!(matcher().find(&doc, Megaserver::PcEu), Verdict::Online);
    }

    #[test]
    fn test_keyword_outside_window_is_indeterminate() {
        let doc = format!("PC EU Megaserver{}Online", "-".repeat(250));
        assert_eq!(matcher().find(&doc, Megaserver::PcEu), Verdict::Indeterminate);
    }

    #[test]
    fn test_window_boundary() {
        let at_edge = format!("PC NA Megaserver{}offline", "x".repeat(200));
        let past_edge = format!("PC NA Megaserver{}offline", "x".repeat(201));
        assert_eq!(matcher().find(&at_edge, Megaserver::PcNa), Verdict::Offline);
        assert_eq!(matcher().find(&past_edge, Megaserver::PcNa), Verdict::Indeterminate);
    }

    #[test]
    fn test_nearest_keyword_wins() {
        let doc = "XBOX EU Megaserver\n<span>OFFLINE</span> ... later Online";
        assert_eq!(matcher().find(doc, Megaserver::XboxEu), Verdict::Offline);
    }

    #[test]
    fn test_label_must_match_exactly() {
        let doc = "PC PTS server Online";
        assert_eq!(matcher().find(doc, Megaserver::PcPts), Verdict::Indeterminate);
    }

    #[test]
    fn test_extract_follows_catalog() {
        let doc = "PlayStation NA Megaserver: Online. PlayStation EU Megaserver: Offline.";
        let catalog = Catalog::only(&[Megaserver::PlayStationEu, Megaserver::PlayStationNa]);
        assert_eq!(
            matcher().extract(doc, &catalog),
            vec![
                (Megaserver::PlayStationEu, Verdict::Offline),
                (Megaserver::PlayStationNa, Verdict::Online),
            ]
        );
    }
}
