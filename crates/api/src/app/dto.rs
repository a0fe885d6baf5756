use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use prodstats_products::Product;

// -------------------------
// Response DTOs
// -------------------------

/// Product as exposed by the listing endpoint. `external_id` stays internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: String,
    pub updated_at: String,
    pub created_at: String,
    pub modified_at: String,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: p.id.get(),
            name: p.name,
            category: p.category,
            price: p.price.to_string(),
            updated_at: timestamp(p.updated_at),
            created_at: timestamp(p.created_at),
            modified_at: timestamp(p.modified_at),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
