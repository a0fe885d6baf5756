use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prodstats_core::{ExternalId, Price, ProductId};

/// Maximum length of a product name.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a product category.
pub const MAX_CATEGORY_LEN: usize = 100;

/// A stored product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price: Price,
    /// Effective update timestamp reported by the feed.
    pub updated_at: DateTime<Utc>,
    pub external_id: ExternalId,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Product {
    /// Materialize a stored product from a cleaned feed row.
    pub fn from_normalized(id: ProductId, row: &NormalizedProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: row.name.clone(),
            category: row.category.clone(),
            price: row.price,
            updated_at: row.updated_at,
            external_id: row.external_id.clone(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Overwrite the mutable attributes with a newer feed row (same external id).
    pub fn refresh_from(&mut self, row: &NormalizedProduct, now: DateTime<Utc>) {
        self.name = row.name.clone();
        self.category = row.category.clone();
        self.price = row.price;
        self.updated_at = row.updated_at;
        self.modified_at = now;
    }
}

impl core::fmt::Display for Product {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({}) - ${}", self.name, self.category, self.price)
    }
}

/// A cleaned, validated feed row ready to be upserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub updated_at: DateTime<Utc>,
    pub external_id: ExternalId,
}

impl NormalizedProduct {
    /// Build a row whose external id is derived from its name and category.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Price,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        let category = category.into();
        let external_id = ExternalId::derive(&name, &category);
        Self {
            name,
            category,
            price,
            updated_at,
            external_id,
        }
    }
}
