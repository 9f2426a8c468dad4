//! Structured extraction from table rows
//!
//! Every row with at least two cells contributes a `name -> status` pair
//! taken from its first two cells. Names are matched case-insensitively and
//! a later row overrides an earlier one with the same name.

use scraper::Html;
use std::collections::HashMap;

use crate::catalog::{Catalog, Megaserver};
use crate::parser::sanitize::element_text;
use crate::parser::selectors;
use crate::parser::Verdict;

/// Collect `lowercased name -> status text` pairs from every row-like element
pub fn row_map(document: &Html) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for row in document.select(selectors::rows()) {
        let cells = selectors::cells(&row);
        if cells.len() < 2 {
            continue;
        }

        let name = element_text(&cells[0]);
        if name.is_empty() {
            continue;
        }
        let status = element_text(&cells[1]);
        map.insert(name.to_lowercase(), status);
    }

    map
}

/// Classify a status cell
///
/// Exactly one of "online"/"offline" must appear; anything else is ambiguous.
pub fn classify_status(text: &str) -> Verdict {
    let lower = text.to_lowercase();
    match (lower.contains("online"), lower.contains("offline")) {
        (true, false) => Verdict::Online,
        (false, true) => Verdict::Offline,
        _ => Verdict::Indeterminate,
    }
}

/// Run the structured pass for every catalog entry
pub fn extract(document: &Html, catalog: &Catalog) -> Vec<(Megaserver, Verdict)> {
    let rows = row_map(document);
    tracing::trace!(rows = rows.len(), "Collected table rows");

    catalog
        .entries()
        .map(|(server, label)| {
            let verdict = rows
                .get(&label.to_lowercase())
                .map(|status| classify_status(status))
                .unwrap_or(Verdict::Indeterminate);
            (server, verdict)
        })
        .collect()
}
