//! Query extraction from free-form model output.

use crate::prompt::QUERY_DELIMITER;
use regex::Regex;
use std::sync::OnceLock;

fn delimited_region() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let marker = regex::escape(QUERY_DELIMITER);
        Regex::new(&format!(r"(?s){marker}(.*?){marker}")).expect("delimiter pattern is valid")
    })
}

/// Return the content of the first region wrapped in [`QUERY_DELIMITER`].
///
/// The match is non-greedy and may span lines. The content is returned as-is,
/// so a pair of adjacent markers yields `Some("")`, which is distinct from the
/// `None` returned when no delimited region exists at all.
pub fn extract_query(raw: &str) -> Option<&str> {
    delimited_region()
        .captures(raw)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}
