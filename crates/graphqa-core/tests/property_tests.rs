//! Property-Based Tests for GraphQA
//!
//! Uses proptest for:
//! 1. Extraction returns the delimited region verbatim
//! 2. The first region always wins
//! 3. Direction normalization is idempotent and leaves no arrows
//! 4. Large-value removal keeps rows within the cutoffs

use graphqa_core::summarize::{CHARACTER_CUTOFF, LIST_CUTOFF};
use graphqa_core::*;
use proptest::prelude::*;
use serde_json::Value;

// ============================================================================
// Strategies
// ============================================================================

/// Text that never contains a backtick
fn payload_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ()\\[\\]:{}<>\\-\n.,']{0,80}"
}

/// Cypher-ish fragments with arrows in both directions
fn pattern_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("(a)".to_string()),
            Just("-[:KNOWS]->".to_string()),
            Just("<-[:OWNS]-".to_string()),
            Just("-->".to_string()),
            Just("<--".to_string()),
            Just(" RETURN a".to_string()),
            "[a-z]{1,5}".prop_map(|s| s),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

// ============================================================================
// Extraction
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_single_region_is_returned_verbatim(
        before in payload_strategy(),
        inner in payload_strategy(),
        after in payload_strategy(),
    ) {
        let raw = format!("{before}```{inner}```{after}");
        prop_assert_eq!(extract_query(&raw), Some(inner.as_str()));
    }

    #[test]
    fn prop_first_region_wins(
        first in payload_strategy(),
        second in payload_strategy(),
        between in payload_strategy(),
    ) {
        let raw = format!("```{first}```{between}```{second}```");
        prop_assert_eq!(extract_query(&raw), Some(first.as_str()));
    }

    #[test]
    fn prop_no_marker_no_payload(raw in payload_strategy()) {
        prop_assert_eq!(extract_query(&raw), None);
    }
}

// ============================================================================
// Direction Normalization
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_normalization_is_idempotent(query in pattern_strategy()) {
        let once = remove_relationship_direction(&query);
        let twice = remove_relationship_direction(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_normalization_leaves_no_arrows(query in pattern_strategy()) {
        let normalized = remove_relationship_direction(&query);
        prop_assert!(!normalized.contains("->"));
        prop_assert!(!normalized.contains("<-"));
    }

    #[test]
    fn prop_arrow_free_text_is_untouched(query in "[a-zA-Z0-9 ()\\[\\]:\\-]{0,60}") {
        prop_assert_eq!(remove_relationship_direction(&query), query);
    }
}

// ============================================================================
// Large-Value Removal
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_cleaned_rows_respect_cutoffs(
        list_len in 0usize..120,
        text_len in 0usize..6000,
    ) {
        let mut row = Row::new();
        row.insert("list".to_string(), Value::from(vec![1; list_len]));
        row.insert("text".to_string(), Value::from("x".repeat(text_len)));

        let cleaned = remove_large_values(row);

        match &cleaned["list"] {
            Value::Null => prop_assert!(list_len > LIST_CUTOFF),
            Value::Array(items) => prop_assert_eq!(items.len(), list_len),
            other => prop_assert!(false, "unexpected value {other}"),
        }
        let text = cleaned["text"].as_str().unwrap_or_default();
        prop_assert_eq!(text.len(), text_len.min(CHARACTER_CUTOFF));
    }
}
