//! Filter composition.
//!
//! Translates an immutable [`FilterSet`] into a [`Predicate`]: an ordered,
//! AND-combined list of clauses that every backend can render in its own query
//! language. Composition is a pure function; no builder state is shared
//! between requests.

use product_search_shared::{FilterSet, ProductDocument};
use uuid::Uuid;

use crate::errors::SearchError;

/// A single facet constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateClause {
    /// `category_id = value`
    CategoryEquals(Uuid),
    /// `price >= value`
    PriceAtLeast(f64),
    /// `price <= value`
    PriceAtMost(f64),
    /// `material = value`
    MaterialEquals(String),
    /// `style = value`
    StyleEquals(String),
    /// `in_stock = value`
    InStock(bool),
}

impl PredicateClause {
    /// Evaluate the clause against a document.
    pub fn matches(&self, product: &ProductDocument) -> bool {
        match self {
            Self::CategoryEquals(category_id) => product.category_id == Some(*category_id),
            Self::PriceAtLeast(min) => product.price >= *min,
            Self::PriceAtMost(max) => product.price <= *max,
            Self::MaterialEquals(material) => product.material.as_deref() == Some(material),
            Self::StyleEquals(style) => product.style.as_deref() == Some(style),
            Self::InStock(in_stock) => product.in_stock == *in_stock,
        }
    }
}

/// AND-combination of facet clauses. An empty predicate matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<PredicateClause>,
}

impl Predicate {
    /// The predicate that imposes no constraint.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// The clauses in composition order.
    pub fn clauses(&self) -> &[PredicateClause] {
        &self.clauses
    }

    /// Returns true if the predicate has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate every clause against a document.
    pub fn matches(&self, product: &ProductDocument) -> bool {
        self.clauses.iter().all(|clause| clause.matches(product))
    }
}

/// Compose the predicate for a filter set.
///
/// Absent filters contribute nothing. Blank tag strings are treated as absent.
/// `in_stock_only = false` contributes nothing.
///
/// # Errors
///
/// Returns `SearchError::ValidationError` for negative or non-finite prices
/// and for `min_price > max_price`.
pub fn compose(filters: &FilterSet) -> Result<Predicate, SearchError> {
    filters.validate().map_err(SearchError::validation)?;

    let mut clauses = Vec::new();

    if let Some(category_id) = filters.category_id {
        clauses.push(PredicateClause::CategoryEquals(category_id));
    }
    if let Some(min) = filters.min_price {
        clauses.push(PredicateClause::PriceAtLeast(min));
    }
    if let Some(max) = filters.max_price {
        clauses.push(PredicateClause::PriceAtMost(max));
    }
    if let Some(material) = non_blank(filters.material_tag.as_deref()) {
        clauses.push(PredicateClause::MaterialEquals(material));
    }
    if let Some(style) = non_blank(filters.style_tag.as_deref()) {
        clauses.push(PredicateClause::StyleEquals(style));
    }
    if filters.in_stock_only {
        clauses.push(PredicateClause::InStock(true));
    }

    Ok(Predicate { clauses })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filters_compose_to_match_all() {
        let predicate = compose(&FilterSet::default()).unwrap();
        assert!(predicate.is_empty());
        assert_eq!(predicate, Predicate::match_all());
    }

    #[test]
    fn test_all_filters() {
        let category = Uuid::new_v4();
        let filters = FilterSet::new()
            .with_category(category)
            .with_price_range(Some(10.0), Some(20.0))
            .with_material("gold")
            .with_style(" vintage ")
            .in_stock_only();

        let predicate = compose(&filters).unwrap();
        assert_eq!(
            predicate.clauses(),
            [
                PredicateClause::CategoryEquals(category),
                PredicateClause::PriceAtLeast(10.0),
                PredicateClause::PriceAtMost(20.0),
                PredicateClause::MaterialEquals("gold".to_string()),
                PredicateClause::StyleEquals("vintage".to_string()),
                PredicateClause::InStock(true),
            ]
        );
    }

    #[test]
    fn test_absent_and_blank_filters_contribute_nothing() {
        let filters = FilterSet {
            material_tag: Some("  ".to_string()),
            in_stock_only: false,
            ..FilterSet::default()
        };
        assert!(compose(&filters).unwrap().is_empty());
    }

    #[test]
    fn test_inverted_price_bounds_are_rejected() {
        let filters = FilterSet::new().with_price_range(Some(100.0), Some(50.0));
        let err = compose(&filters).unwrap_err();
        assert!(matches!(err, SearchError::ValidationError(_)));
    }

    #[test]
    fn test_predicate_matches() {
        let category = Uuid::new_v4();
        let product = ProductDocument::new(Uuid::new_v4(), "Gold Ring", None, 15.0)
            .with_category(category)
            .with_material("gold")
            .with_stock(false);

        let within = compose(&FilterSet::new().with_price_range(Some(10.0), Some(15.0))).unwrap();
        assert!(within.matches(&product));

        let cheaper = compose(&FilterSet::new().with_price_range(None, Some(14.99))).unwrap();
        assert!(!cheaper.matches(&product));

        let stocked = compose(&FilterSet::new().in_stock_only()).unwrap();
        assert!(!stocked.matches(&product));

        let other_category = compose(&FilterSet::new().with_category(Uuid::new_v4())).unwrap();
        assert!(!other_category.matches(&product));

        let material = compose(&FilterSet::new().with_material("gold").with_category(category)).unwrap();
        assert!(material.matches(&product));

        let style = compose(&FilterSet::new().with_style("modern")).unwrap();
        assert!(!style.matches(&product));
    }
}
