//! Product document types for the search index.
//!
//! This module defines the searchable projection of a catalog product. The
//! catalog owns products; the search engine only reads this projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Searchable projection of a catalog product.
///
/// # Fields
///
/// - `id`: Catalog product identifier (also the final ordering tiebreaker)
/// - `name`: Product display name (primary search field)
/// - `description`: Optional description text (secondary search field)
/// - `price`: Unit price, non-negative
/// - `category_id`: Optional category the product is filed under
/// - `material`: Optional material facet tag (e.g. "gold")
/// - `style`: Optional style facet tag (e.g. "vintage")
/// - `in_stock`: Stock indicator
/// - `created_at`: Catalog creation timestamp, used by the `newest` ordering
/// - `searchable_text`: Precomputed name + description text used for matching
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDocument {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub searchable_text: String,
}

impl ProductDocument {
    /// Create a new in-stock document with no facets, created now.
    ///
    /// The searchable text is derived from `name` and `description`.
    ///
    /// # Example
    ///
    /// ```
    /// use product_search_shared::ProductDocument;
    /// use uuid::Uuid;
    ///
    /// let doc = ProductDocument::new(
    ///     Uuid::new_v4(),
    ///     "Gold Ring",
    ///     Some("18k band".to_string()),
    ///     249.0,
    /// );
    /// assert_eq!(doc.searchable_text, "Gold Ring 18k band");
    /// ```
    pub fn new(id: Uuid, name: impl Into<String>, description: Option<String>, price: f64) -> Self {
        let name = name.into();
        let searchable_text = Self::compose_searchable_text(&name, description.as_deref());
        Self {
            id,
            name,
            description,
            price,
            category_id: None,
            material: None,
            style: None,
            in_stock: true,
            created_at: Utc::now(),
            searchable_text,
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set the material facet tag.
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Set the style facet tag.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Set the stock indicator.
    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Set the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the searchable text from the name and optional description.
    pub fn compose_searchable_text(name: &str, description: Option<&str>) -> String {
        match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(description) => format!("{} {}", name.trim(), description),
            None => name.trim().to_string(),
        }
    }
}
