//! Column normalization: map source header names onto the logical schema.

use std::collections::{BTreeSet, HashMap};

use crate::feed::{FeedError, RawFeed};

/// Source column name → logical column, applied in order.
///
/// A source column is renamed only when its logical target has not already been
/// claimed by an earlier entry, so `name` beats `product_name` beats `title`.
pub const COLUMN_SYNONYMS: &[(&str, &str)] = &[
    ("name", "name"),
    ("product_name", "name"),
    ("title", "name"),
    ("category", "category"),
    ("product_category", "category"),
    ("type", "category"),
    ("price", "price"),
    ("cost", "price"),
    ("amount", "price"),
    ("updated_at", "updated_at"),
    ("last_updated", "updated_at"),
    ("modified_at", "updated_at"),
    ("date", "updated_at"),
];

/// Logical columns every feed must provide.
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "category", "price", "updated_at"];

/// One feed row projected onto the logical columns (cells still untyped).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameRow {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub updated_at: Option<String>,
}

/// A feed reduced to the logical columns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFrame {
    pub rows: Vec<FrameRow>,
}

impl ProductFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Resolve which source column index feeds each logical column.
///
/// Headers are compared lowercased and trimmed. When the same header appears
/// twice, the first occurrence wins.
pub fn resolve_columns(headers: &[String]) -> Result<HashMap<&'static str, usize>, FeedError> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        positions.entry(header.trim().to_lowercase()).or_insert(idx);
    }

    let mut resolved: HashMap<&'static str, usize> = HashMap::new();
    for (source, target) in COLUMN_SYNONYMS {
        if resolved.contains_key(target) {
            continue;
        }
        if let Some(&idx) = positions.get(*source) {
            resolved.insert(*target, idx);
        }
    }

    let missing: BTreeSet<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !resolved.contains_key(*c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(FeedError::MissingColumns(missing));
    }

    Ok(resolved)
}

/// Rename source columns to the logical schema and keep only the required ones.
pub fn normalize(feed: &RawFeed) -> Result<ProductFrame, FeedError> {
    let columns = resolve_columns(&feed.headers)?;
    let cell = |row: &[Option<String>], column: &str| -> Option<String> {
        columns
            .get(column)
            .and_then(|&idx| row.get(idx))
            .cloned()
            .flatten()
    };

    let rows = feed
        .rows
        .iter()
        .map(|row| FrameRow {
            name: cell(row, "name"),
            category: cell(row, "category"),
            price: cell(row, "price"),
            updated_at: cell(row, "updated_at"),
        })
        .collect();

    Ok(ProductFrame { rows })
}
