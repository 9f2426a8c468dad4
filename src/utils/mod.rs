//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use anyhow::{Context, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Normalize whitespace in text
///
/// Collapses every run of whitespace (including non-breaking spaces) into a
/// single ASCII space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Truncate text to at most `max_chars` characters
///
/// Counts Unicode scalar values, so the cut never lands inside a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Parse a URL and require an http or https scheme
pub fn parse_http_url(raw: &str) -> Result<Url> {
    let parsed = Url::parse(raw).with_context(|| format!("Invalid URL: {raw}"))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => anyhow::bail!("Unsupported URL scheme '{other}' in {raw}"),
    }
}
