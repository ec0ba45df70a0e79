//! Field normalization for structural equality.
//!
//! Product and avatar payloads originate from producers that do not share
//! a canonical serialization. Comparison must not be sensitive to case,
//! surrounding whitespace, list order, repeated list entries, or map
//! insertion order.

use std::collections::{BTreeMap, BTreeSet};

/// Canonical form of a text field: trimmed, then case-folded.
#[must_use]
pub fn norm_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Canonical form of a list field: the membership set of normalized
/// entries. Order and within-list duplicates are not significant.
#[must_use]
pub fn norm_list(values: &[String]) -> BTreeSet<String> {
    values.iter().map(|value| norm_text(value)).collect()
}

/// Canonical form of a map field: the set of (key, normalized value)
/// pairs, irrespective of insertion order.
#[must_use]
pub fn norm_map(values: &BTreeMap<String, String>) -> BTreeSet<(String, String)> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), norm_text(value)))
        .collect()
}

#[must_use]
pub fn text_eq(a: &str, b: &str) -> bool {
    norm_text(a) == norm_text(b)
}

#[must_use]
pub fn list_eq(a: &[String], b: &[String]) -> bool {
    norm_list(a) == norm_list(b)
}

#[must_use]
pub fn map_eq(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> bool {
    norm_map(a) == norm_map(b)
}

///
/// FieldComparison
///
/// Field-level verdict from a core-field comparison. Both sides are kept
/// so diagnostics and tests can name exactly what diverged.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldComparison {
    pub matched: Vec<&'static str>,
    pub mismatched: Vec<&'static str>,
}

impl FieldComparison {
    pub(crate) fn record(&mut self, field: &'static str, matched: bool) {
        if matched {
            self.matched.push(field);
        } else {
            self.mismatched.push(field);
        }
    }

    /// True iff every compared field matched.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.mismatched.is_empty()
    }
}
