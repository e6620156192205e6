//! Version strings: extraction from free text, normalization, comparison.
//!
//! Catalogs are trusted to publish a changed version string only for a newer
//! release, so versions are compared for equality and never ordered.

mod store;

use regex::Regex;
use std::sync::LazyLock;

pub use store::VersionStore;

/// Logical version of a package that has never been retrieved.
pub const UNKNOWN_VERSION: &str = "0.0.0";

static VERSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)+)").expect("version pattern is valid"));

/// Returns the first dot-separated numeric run (e.g. `6.10.1`) in `text`.
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_RUN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Like [`extract_version`], falling back to [`UNKNOWN_VERSION`].
pub fn version_from_title(title: &str) -> String {
    extract_version(title).unwrap_or_else(|| UNKNOWN_VERSION.to_string())
}

/// Trims whitespace and a single leading `v`/`V` that precedes a digit.
pub fn normalize(version: &str) -> &str {
    let trimmed = version.trim();
    match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    }
}

/// True when the two versions are identical after [`normalize`].
pub fn versions_match(v1: &str, v2: &str) -> bool {
    normalize(v1) == normalize(v2)
}
