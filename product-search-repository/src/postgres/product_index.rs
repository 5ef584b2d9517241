//! PostgreSQL full-text product index.

use async_trait::async_trait;
use product_search_shared::{ProductDocument, SearchResultItem};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info, warn};

use crate::errors::SearchError;
use crate::filter::PredicateClause;
use crate::interfaces::ProductIndexProvider;
use crate::postgres::MIGRATOR;
use crate::types::{
    BatchOperationResult, BatchOperationSummary, EffectiveSort, ProductPage, ProductQuery,
};

const SELECT_COLUMNS: &str = "SELECT id, name, description, price, category_id, material, style, \
     in_stock, created_at, searchable_text, ";

/// Ranked product retrieval over `product_search_documents`.
///
/// Each query token becomes a `token:*` prefix term and all terms are
/// AND-combined through `to_tsquery('simple', ...)`. Relevance is `ts_rank`.
pub struct PostgresProductIndex {
    pool: PgPool,
}

impl PostgresProductIndex {
    /// Create an index over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append the shared `FROM ... WHERE ...` part of the count and page queries.
    fn push_match_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
        builder.push(" FROM product_search_documents WHERE TRUE");

        if let Some(expression) = query.query.to_search_expression() {
            builder
                .push(" AND search_vector @@ to_tsquery('simple', ")
                .push_bind(expression)
                .push(")");
        }

        for clause in query.predicate.clauses() {
            match clause {
                PredicateClause::CategoryEquals(category_id) => {
                    builder.push(" AND category_id = ").push_bind(*category_id);
                }
                PredicateClause::PriceAtLeast(min) => {
                    builder.push(" AND price >= ").push_bind(*min);
                }
                PredicateClause::PriceAtMost(max) => {
                    builder.push(" AND price <= ").push_bind(*max);
                }
                PredicateClause::MaterialEquals(material) => {
                    builder.push(" AND material = ").push_bind(material.clone());
                }
                PredicateClause::StyleEquals(style) => {
                    builder.push(" AND style = ").push_bind(style.clone());
                }
                PredicateClause::InStock(in_stock) => {
                    builder.push(" AND in_stock = ").push_bind(*in_stock);
                }
            }
        }
    }

    fn order_clause(sort: EffectiveSort) -> &'static str {
        match sort {
            EffectiveSort::Relevance => " ORDER BY relevance_score DESC, id ASC",
            EffectiveSort::PriceAscending => " ORDER BY price ASC, id ASC",
            EffectiveSort::PriceDescending => " ORDER BY price DESC, id ASC",
            EffectiveSort::Newest => " ORDER BY created_at DESC, id ASC",
        }
    }

    fn build_count_query(query: &ProductQuery) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*)");
        Self::push_match_conditions(&mut builder, query);
        builder
    }

    fn build_page_query(
        query: &ProductQuery,
    ) -> Result<QueryBuilder<'static, Postgres>, SearchError> {
        let limit = i64::try_from(query.limit)
            .map_err(|_| SearchError::validation("page size out of range"))?;
        let offset = i64::try_from(query.offset)
            .map_err(|_| SearchError::validation("page offset out of range"))?;

        let mut builder = QueryBuilder::new(SELECT_COLUMNS);

        match query.query.to_search_expression() {
            Some(expression) => {
                builder
                    .push("ts_rank(search_vector, to_tsquery('simple', ")
                    .push_bind(expression)
                    .push("))::float8 AS relevance_score");
            }
            None => {
                builder.push("0::float8 AS relevance_score");
            }
        }

        Self::push_match_conditions(&mut builder, query);
        builder
            .push(Self::order_clause(query.sort))
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        Ok(builder)
    }

    fn map_row(row: &PgRow) -> Result<SearchResultItem, sqlx::Error> {
        Ok(SearchResultItem {
            product: ProductDocument {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                price: row.try_get("price")?,
                category_id: row.try_get("category_id")?,
                material: row.try_get("material")?,
                style: row.try_get("style")?,
                in_stock: row.try_get("in_stock")?,
                created_at: row.try_get("created_at")?,
                searchable_text: row.try_get("searchable_text")?,
            },
            relevance_score: row.try_get("relevance_score")?,
        })
    }

    async fn upsert_product(&self, product: &ProductDocument) -> Result<(), SearchError> {
        sqlx::query(
            r#"
            INSERT INTO product_search_documents
                (id, name, description, price, category_id, material, style, in_stock, created_at, searchable_text)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                category_id = EXCLUDED.category_id,
                material = EXCLUDED.material,
                style = EXCLUDED.style,
                in_stock = EXCLUDED.in_stock,
                created_at = EXCLUDED.created_at,
                searchable_text = EXCLUDED.searchable_text,
                indexed_at = NOW()
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category_id)
        .bind(&product.material)
        .bind(&product.style)
        .bind(product.in_stock)
        .bind(product.created_at)
        .bind(&product.searchable_text)
        .execute(&self.pool)
        .await
        .map_err(|e| SearchError::write(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ProductIndexProvider for PostgresProductIndex {
    async fn ensure_index_exists(&self) -> Result<(), SearchError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| SearchError::index_creation(e.to_string()))?;

        info!("Product search schema is up to date");
        Ok(())
    }

    async fn search(&self, query: &ProductQuery) -> Result<ProductPage, SearchError> {
        let total_count: i64 = Self::build_count_query(query)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let rows = Self::build_page_query(query)?
            .build()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(Self::map_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            total_count = total_count,
            returned = items.len(),
            "Postgres search executed"
        );

        Ok(ProductPage {
            items,
            total_count: total_count.max(0) as u64,
        })
    }

    async fn index_products(
        &self,
        products: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchError> {
        let mut results = Vec::with_capacity(products.len());

        for product in products {
            match self.upsert_product(product).await {
                Ok(()) => results.push(BatchOperationResult {
                    product_id: product.id,
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    warn!(product_id = %product.id, error = %e, "Failed to index product");
                    results.push(BatchOperationResult {
                        product_id: product.id,
                        success: false,
                        error: Some(e),
                    });
                }
            }
        }

        Ok(BatchOperationSummary::from_results(results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Predicate;
    use crate::query::NormalizedQuery;
    use product_search_shared::FilterSet;

    fn product_query(text: &str, filters: FilterSet, sort: EffectiveSort) -> ProductQuery {
        ProductQuery {
            query: NormalizedQuery::parse(text),
            predicate: crate::filter::compose(&filters).unwrap(),
            sort,
            offset: 24,
            limit: 12,
        }
    }

    #[test]
    fn test_page_query_with_text_and_filters() {
        let query = product_query(
            "gold ring",
            FilterSet::new()
                .with_price_range(Some(10.0), Some(500.0))
                .with_material("gold")
                .in_stock_only(),
            EffectiveSort::Relevance,
        );

        let builder = PostgresProductIndex::build_page_query(&query).unwrap();
        let sql = builder.sql();

        assert!(sql.contains("ts_rank(search_vector, to_tsquery('simple', $1))::float8 AS relevance_score"));
        assert!(sql.contains("search_vector @@ to_tsquery('simple', $2)"));
        assert!(sql.contains("price >= $3"));
        assert!(sql.contains("price <= $4"));
        assert!(sql.contains("material = $5"));
        assert!(sql.contains("in_stock = $6"));
        assert!(sql.contains("ORDER BY relevance_score DESC, id ASC"));
        assert!(sql.ends_with("LIMIT $7 OFFSET $8"));
    }

    #[test]
    fn test_filter_only_query_has_no_text_match() {
        let query = ProductQuery {
            query: NormalizedQuery::parse(" !! "),
            predicate: Predicate::match_all(),
            sort: EffectiveSort::Newest,
            offset: 0,
            limit: 12,
        };

        let builder = PostgresProductIndex::build_page_query(&query).unwrap();
        let sql = builder.sql();

        assert!(sql.contains("0::float8 AS relevance_score"));
        assert!(!sql.contains("to_tsquery"));
        assert!(sql.contains("ORDER BY created_at DESC, id ASC"));
    }

    #[test]
    fn test_count_query_shares_conditions() {
        let query = product_query("gold", FilterSet::new().in_stock_only(), EffectiveSort::PriceAscending);
        let builder = PostgresProductIndex::build_count_query(&query);
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT COUNT(*) FROM product_search_documents WHERE TRUE"));
        assert!(sql.contains("search_vector @@ to_tsquery('simple', $1)"));
        assert!(sql.contains("in_stock = $2"));
        assert!(!sql.contains("ORDER BY"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_every_order_ends_with_id() {
        for sort in [
            EffectiveSort::Relevance,
            EffectiveSort::PriceAscending,
            EffectiveSort::PriceDescending,
            EffectiveSort::Newest,
        ] {
            assert!(PostgresProductIndex::order_clause(sort).ends_with("id ASC"));
        }
    }
}
