use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use prodstats_core::{ExternalId, ProductId};
use prodstats_products::{CategoryPriceTotal, NormalizedProduct, Ordering, Product, ProductFilter};

use super::{ProductStore, StoreError, UpsertOutcome};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    products: Vec<Product>,
    by_external_id: HashMap<ExternalId, usize>,
}

/// In-memory product store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    state: RwLock<State>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a product by its external id.
    pub fn get_by_external_id(&self, external_id: &ExternalId) -> Option<Product> {
        let state = self.state.read().ok()?;
        state
            .by_external_id
            .get(external_id)
            .and_then(|&idx| state.products.get(idx))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.products.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn upsert_products(
        &self,
        products: &[NormalizedProduct],
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::Poisoned)?;
        let mut outcome = UpsertOutcome::default();

        for row in products {
            match state.by_external_id.get(&row.external_id).copied() {
                Some(idx) => {
                    state.products[idx].refresh_from(row, now);
                    outcome.updated += 1;
                }
                None => {
                    state.next_id += 1;
                    let product = Product::from_normalized(ProductId::new(state.next_id), row, now);
                    let idx = state.products.len();
                    state.products.push(product);
                    state.by_external_id.insert(row.external_id.clone(), idx);
                    outcome.created += 1;
                }
            }
        }

        Ok(outcome)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        Ok(state.products.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        ordering: &Ordering,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut matched: Vec<Product> = state
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        ordering.sort(&mut matched);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn category_price_totals(&self) -> Result<Vec<CategoryPriceTotal>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::Poisoned)?;
        let mut totals: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for p in &state.products {
            let entry = totals.entry(p.category.as_str()).or_default();
            entry.0 += p.price.cents();
            entry.1 += 1;
        }
        Ok(totals
            .into_iter()
            .map(|(category, (total_cents, count))| CategoryPriceTotal {
                category: category.to_string(),
                total_cents,
                count,
            })
            .collect())
    }
}
