//! Postgres-backed product store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database (any code) | `Database` |
//! | PoolClosed / PoolTimedOut / Io | `Unavailable` |
//! | Other | `Database` |
//!
//! Prices live in a `BIGINT` cents column; rows that fail `Price` validation on
//! read surface as `InvalidRow`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{instrument, Span};

use prodstats_core::{ExternalId, Price, ProductId};
use prodstats_products::{CategoryPriceTotal, NormalizedProduct, Ordering, Product, ProductFilter};

use super::{ProductStore, StoreError, UpsertOutcome};

/// Rows per multi-row `INSERT`.
const UPSERT_BATCH_SIZE: usize = 1000;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        category VARCHAR(100) NOT NULL,
        price_cents BIGINT NOT NULL CHECK (price_cents > 0 AND price_cents <= 9999999999),
        updated_at TIMESTAMPTZ NOT NULL,
        external_id VARCHAR(64) NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL,
        modified_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_name_idx ON products (name)",
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (category)",
    "CREATE INDEX IF NOT EXISTS products_category_price_idx ON products (category, price_cents)",
    "CREATE INDEX IF NOT EXISTS products_updated_at_idx ON products (updated_at DESC)",
];

const PRODUCT_COLUMNS: &str =
    "id, name, category, price_cents, updated_at, external_id, created_at, modified_at";

#[derive(Debug, Clone)]
pub struct PostgresProductStore {
    pool: Arc<PgPool>,
}

impl PostgresProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the table and indexes if missing. Safe to run repeatedly.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    #[instrument(
        skip(self, products),
        fields(
            rows = products.len(),
            created = tracing::field::Empty,
            updated = tracing::field::Empty
        ),
        err
    )]
    async fn upsert_products(
        &self,
        products: &[NormalizedProduct],
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::default();
        if products.is_empty() {
            return Ok(outcome);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // A single INSERT .. ON CONFLICT cannot touch the same row twice, so
        // each chunk holds at most one row per external id.
        for chunk in unique_chunks(products, UPSERT_BATCH_SIZE) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO products (name, category, price_cents, updated_at, external_id, created_at, modified_at) ",
            );
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(row.name.clone())
                    .push_bind(row.category.clone())
                    .push_bind(row.price.cents())
                    .push_bind(row.updated_at)
                    .push_bind(row.external_id.as_str().to_string())
                    .push_bind(now)
                    .push_bind(now);
            });
            qb.push(
                " ON CONFLICT (external_id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 category = EXCLUDED.category, \
                 price_cents = EXCLUDED.price_cents, \
                 updated_at = EXCLUDED.updated_at, \
                 modified_at = EXCLUDED.modified_at \
                 RETURNING (xmax = 0) AS inserted",
            );

            let rows = qb
                .build()
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("upsert_products", e))?;

            for row in rows {
                let inserted: bool = row
                    .try_get("inserted")
                    .map_err(|e| map_sqlx_error("upsert_products", e))?;
                if inserted {
                    outcome.created += 1;
                } else {
                    outcome.updated += 1;
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        let span = Span::current();
        span.record("created", outcome.created);
        span.record("updated", outcome.updated);
        Ok(outcome)
    }

    #[instrument(skip(self), err)]
    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) AS total FROM products");
        push_filter(&mut qb, filter);

        let row = qb
            .build()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = row
            .try_get("total")
            .map_err(|e| map_sqlx_error("count_products", e))?;
        Ok(total.max(0) as u64)
    }

    #[instrument(skip(self), err)]
    async fn list_products(
        &self,
        filter: &ProductFilter,
        ordering: &Ordering,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        qb.push(PRODUCT_COLUMNS).push(" FROM products");
        push_filter(&mut qb, filter);

        qb.push(" ORDER BY ");
        for (field, direction) in ordering.keys() {
            qb.push(field.column()).push(" ").push(direction.sql()).push(", ");
        }
        qb.push("id ASC");

        qb.push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn category_price_totals(&self) -> Result<Vec<CategoryPriceTotal>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT category, SUM(price_cents)::BIGINT AS total_cents, COUNT(*) AS count
            FROM products
            GROUP BY category
            ORDER BY category
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("category_price_totals", e))?;

        rows.iter()
            .map(|row| -> Result<CategoryPriceTotal, StoreError> {
                Ok(CategoryPriceTotal {
                    category: row
                        .try_get("category")
                        .map_err(|e| map_sqlx_error("category_price_totals", e))?,
                    total_cents: row
                        .try_get("total_cents")
                        .map_err(|e| map_sqlx_error("category_price_totals", e))?,
                    count: row
                        .try_get("count")
                        .map_err(|e| map_sqlx_error("category_price_totals", e))?,
                })
            })
            .collect()
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND LOWER(category) = LOWER(")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(min) = filter.price_min {
        qb.push(" AND price_cents >= ").push_bind(min.cents());
    }
    if let Some(max) = filter.price_max {
        qb.push(" AND price_cents <= ").push_bind(max.cents());
    }
}

/// Split rows into chunks of at most `size`, starting a new chunk whenever an
/// external id repeats inside the current one.
fn unique_chunks(rows: &[NormalizedProduct], size: usize) -> Vec<&[NormalizedProduct]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut seen = std::collections::HashSet::new();
    for (idx, row) in rows.iter().enumerate() {
        if idx - start == size || !seen.insert(&row.external_id) {
            chunks.push(&rows[start..idx]);
            start = idx;
            seen.clear();
            seen.insert(&row.external_id);
        }
    }
    if start < rows.len() {
        chunks.push(&rows[start..]);
    }
    chunks
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let get_err = |e| map_sqlx_error("decode_product", e);
    let cents: i64 = row.try_get("price_cents").map_err(get_err)?;
    let price = Price::from_cents(cents).map_err(|e| StoreError::InvalidRow(e.to_string()))?;
    let external_id: String = row.try_get("external_id").map_err(get_err)?;

    Ok(Product {
        id: ProductId::new(row.try_get("id").map_err(get_err)?),
        name: row.try_get("name").map_err(get_err)?,
        category: row.try_get("category").map_err(get_err)?,
        price,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
        external_id: ExternalId::from_raw(external_id),
        created_at: row.try_get("created_at").map_err(get_err)?,
        modified_at: row.try_get("modified_at").map_err(get_err)?,
    })
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Database {
            operation,
            message: match db_err.code() {
                Some(code) => format!("{} (code {code})", db_err.message()),
                None => db_err.message().to_string(),
            },
        },
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(operation)
        }
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
