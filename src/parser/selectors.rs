//! CSS selectors for table-like markup on the status page
//!
//! The page has changed layout before, so rows are matched both as real
//! `<tr>` elements and as ARIA grid rows built out of `<div>`s.

use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    static ref ROWS: Selector = parse_selector!("tr, [role='row']");
}

/// Cell element names that count as a table cell
const CELL_TAGS: &[&str] = &["td", "th"];

/// ARIA roles that count as a table cell
const CELL_ROLES: &[&str] = &["cell", "gridcell", "rowheader", "columnheader"];

/// Selector matching every row-like element
pub fn rows() -> &'static Selector {
    &ROWS
}

/// Whether an element is a cell of a row-like parent
pub fn is_cell(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if CELL_TAGS.contains(&value.name()) {
        return true;
    }

    value
        .attr("role")
        .map(|role| CELL_ROLES.iter().any(|r| role.eq_ignore_ascii_case(r)))
        .unwrap_or(false)
}

/// Direct cell children of a row, in document order
pub fn cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(is_cell)
        .collect()
}
