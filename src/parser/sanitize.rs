//! Text cleanup for extracted table cells
//!
//! Cell text arrives with layout whitespace, non-breaking spaces and the
//! occasional invisible character copied in by the page's CMS. Lookups by
//! label only work after all of that is flattened.

use scraper::ElementRef;

/// Clean text extracted from a cell
///
/// # Examples
///
/// ```
/// use esostatus::parser::sanitize::clean_cell_text;
///
/// let dirty = "\n  PC EU\u{200B}\u{a0} Megaserver \t";
/// assert_eq!(clean_cell_text(dirty), "PC EU Megaserver");
/// ```
pub fn clean_cell_text(text: &str) -> String {
    let visible = remove_control_chars(&remove_zero_width(text));
    crate::utils::normalize_whitespace(&visible)
}

/// Remove zero-width spaces and similar invisible characters
///
/// # Examples
///
/// ```
/// use esostatus::parser::sanitize::remove_zero_width;
///
/// assert_eq!(remove_zero_width("On\u{200B}line\u{FEFF}"), "Online");
/// ```
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(*c,
                '\u{200B}'..='\u{200F}' |
                '\u{2060}' |
                '\u{FEFF}'
            )
        })
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Cleaned text content of an element and its descendants
pub fn element_text(element: &ElementRef<'_>) -> String {
    clean_cell_text(&element.text().collect::<String>())
}
