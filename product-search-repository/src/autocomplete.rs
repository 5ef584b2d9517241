//! Autocomplete candidate merging.
//!
//! Popular terms and a requester's own history occurrences are merged by exact
//! term into one ranked, deduplicated list. The popular count and the number
//! of history occurrences are summed without normalization between the two
//! scales.

use std::collections::HashMap;

use product_search_shared::{AutocompleteSuggestion, PopularSearchTerm};

/// Prefixes shorter than this (in characters, after trimming) yield no suggestions.
pub const MIN_PREFIX_LEN: usize = 2;

/// Returns true if the prefix is long enough to look up suggestions.
pub fn is_searchable_prefix(prefix: &str) -> bool {
    prefix.trim().chars().count() >= MIN_PREFIX_LEN
}

/// Merge popular candidates and history occurrences into ranked suggestions.
///
/// Terms are keyed case-sensitively. Each popular candidate contributes its
/// count and each history occurrence contributes one. The result is ordered by
/// merged count descending, then term ascending, and truncated to `limit`.
/// The output depends only on the multiset of inputs, never on their order.
pub fn merge_suggestions(
    popular: &[PopularSearchTerm],
    history: &[String],
    limit: usize,
) -> Vec<AutocompleteSuggestion> {
    let mut weights: HashMap<&str, i64> = HashMap::new();

    for candidate in popular {
        *weights.entry(candidate.term.as_str()).or_insert(0) += candidate.count;
    }
    for occurrence in history {
        *weights.entry(occurrence.as_str()).or_insert(0) += 1;
    }

    let mut suggestions: Vec<AutocompleteSuggestion> = weights
        .into_iter()
        .map(|(term, count)| AutocompleteSuggestion::new(term, count))
        .collect();

    suggestions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
    suggestions.truncate(limit);
    suggestions
}
