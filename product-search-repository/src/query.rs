//! Query normalization.
//!
//! Turns raw user input into a canonical AND-of-prefixes search expression.
//! Every surviving token must match a word of the searchable text as a prefix.

use std::fmt;

/// Marker appended to each token so that it matches as a prefix.
pub const PREFIX_MARKER: &str = ":*";

/// Operator joining tokens; every token must match.
pub const AND_OPERATOR: &str = " & ";

/// A normalized query: an ordered sequence of lowercase alphanumeric tokens.
///
/// An empty token sequence is the "empty query" signal. It is not an error:
/// callers fall back to filter-only retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NormalizedQuery {
    tokens: Vec<String>,
}

impl NormalizedQuery {
    /// Normalize raw input.
    ///
    /// Splits on whitespace, strips every non-alphanumeric character from each
    /// token, drops tokens left empty and lowercases the rest. Token order is
    /// preserved.
    ///
    /// # Example
    ///
    /// ```
    /// use product_search_repository::query::NormalizedQuery;
    ///
    /// let query = NormalizedQuery::parse("  Gold,  ring!! -- 18k ");
    /// assert_eq!(query.tokens(), ["gold", "ring", "18k"]);
    /// assert_eq!(query.to_search_expression().as_deref(), Some("gold:* & ring:* & 18k:*"));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let tokens = raw
            .split_whitespace()
            .map(|token| {
                token
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect::<String>()
            })
            .filter(|token| !token.is_empty())
            .collect();

        Self { tokens }
    }

    /// Build a query from already-normalized tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = tokens
            .into_iter()
            .map(|t| t.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Self::parse(&joined)
    }

    /// Returns true if no token survived normalization.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The normalized tokens, in input order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Render the canonical AND-of-prefixes expression (`gold:* & ring:*`).
    ///
    /// Returns `None` for the empty query. The expression is valid Postgres
    /// `to_tsquery` input because tokens are purely alphanumeric.
    pub fn to_search_expression(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }

        Some(
            self.tokens
                .iter()
                .map(|token| format!("{}{}", token, PREFIX_MARKER))
                .collect::<Vec<_>>()
                .join(AND_OPERATOR),
        )
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace_and_strips_punctuation() {
        let query = NormalizedQuery::parse("\t gold\n\n  ring, (vintage) ");
        assert_eq!(query.tokens(), ["gold", "ring", "vintage"]);
    }

    #[test]
    fn test_drops_tokens_empty_after_stripping() {
        let query = NormalizedQuery::parse("gold -- !!! & ring");
        assert_eq!(query.tokens(), ["gold", "ring"]);
    }

    #[test]
    fn test_strips_inside_tokens() {
        let query = NormalizedQuery::parse("rose-gold o'brien");
        assert_eq!(query.tokens(), ["rosegold", "obrien"]);
    }

    #[test]
    fn test_empty_query() {
        assert!(NormalizedQuery::parse("").is_empty());
        assert!(NormalizedQuery::parse("    ").is_empty());
        assert!(NormalizedQuery::parse("?! -- ...").is_empty());
        assert_eq!(NormalizedQuery::parse("  ").to_search_expression(), None);
    }

    #[test]
    fn test_search_expression() {
        let query = NormalizedQuery::parse("Gold Ring");
        assert_eq!(
            query.to_search_expression().as_deref(),
            Some("gold:* & ring:*")
        );

        let single = NormalizedQuery::parse("necklace");
        assert_eq!(single.to_search_expression().as_deref(), Some("necklace:*"));
    }

    #[test]
    fn test_unicode_alphanumerics_are_kept() {
        let query = NormalizedQuery::parse("Collier doré");
        assert_eq!(query.tokens(), ["collier", "doré"]);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = ["  Gold,  RING!! 18k ", "a-b c", "", "silver & chain:*"];

        for input in inputs {
            let once = NormalizedQuery::parse(input);

            // Re-normalizing the canonical text is a fixed point
            let twice = NormalizedQuery::parse(&once.to_string());
            assert_eq!(once, twice, "display form of {:?}", input);

            // So is re-normalizing the rendered expression
            if let Some(expression) = once.to_search_expression() {
                assert_eq!(once, NormalizedQuery::parse(&expression), "expression of {:?}", input);
            }

            // And rebuilding from the token sequence
            assert_eq!(once, NormalizedQuery::from_tokens(once.tokens()));
        }
    }
}
