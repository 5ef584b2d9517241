//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the product index.

use serde_json::{json, Value};

/// Configuration for the product index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the product index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 0 for "products_v0").
    pub version: u32,
}

impl IndexConfig {
    /// Create a new index configuration.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
        }
    }

    /// The concrete index the alias points at.
    pub fn versioned_index_name(&self) -> String {
        get_versioned_index_name(Some(self.version))
    }
}

/// The base name of the product index (without version).
pub const INDEX_NAME: &str = "products";

/// Get the versioned index name (e.g., "products_v0").
pub fn get_versioned_index_name(version: Option<u32>) -> String {
    let v = version.unwrap_or(0);
    format!("{}_v{}", INDEX_NAME, v)
}

/// Get the index settings and mappings for the product index.
///
/// - `searchable_text` is analyzed text, matched per token as word or prefix
/// - facet fields are keywords so that filters are exact
/// - `price` and `created_at` are sortable
///
/// One primary shard, one replica.
pub fn get_index_settings(alias: &str) -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "aliases": {
            alias: {}
        },
        "mappings": {
            "properties": {
                "id": {
                    "type": "keyword"
                },
                "name": {
                    "type": "text",
                    "fields": {
                        "raw": {
                            "type": "keyword"
                        }
                    }
                },
                "description": {
                    "type": "text"
                },
                "searchable_text": {
                    "type": "text"
                },
                "price": {
                    "type": "double"
                },
                "category_id": {
                    "type": "keyword"
                },
                "material": {
                    "type": "keyword"
                },
                "style": {
                    "type": "keyword"
                },
                "in_stock": {
                    "type": "boolean"
                },
                "created_at": {
                    "type": "date"
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings("products");

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["aliases"]["products"].is_object());

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["searchable_text"]["type"], "text");
        assert_eq!(properties["id"]["type"], "keyword");
        assert_eq!(properties["material"]["type"], "keyword");
        assert_eq!(properties["price"]["type"], "double");
        assert_eq!(properties["in_stock"]["type"], "boolean");
        assert_eq!(properties["created_at"]["type"], "date");
    }

    #[test]
    fn test_versioned_index_name() {
        assert_eq!(get_versioned_index_name(None), "products_v0");
        assert_eq!(get_versioned_index_name(Some(3)), "products_v3");
        assert_eq!(IndexConfig::new("products", 2).versioned_index_name(), "products_v2");
    }
}
