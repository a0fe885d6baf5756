//! Average price per category.

use serde::{Deserialize, Serialize};

/// Aggregated price data for one category, as returned by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPriceTotal {
    pub category: String,
    pub total_cents: i64,
    pub count: i64,
}

/// Mean price of one category, serialized as `{"category": .., "avg_price": "12.34"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAvgPrice {
    pub category: String,
    #[serde(rename = "avg_price", with = "cents_string")]
    pub avg_price_cents: i64,
}

/// Compute the mean price per category, rounded half-up to the cent.
///
/// Categories with no rows are skipped. Output is sorted by category.
pub fn average_by_category(totals: &[CategoryPriceTotal]) -> Vec<CategoryAvgPrice> {
    let mut out: Vec<CategoryAvgPrice> = totals
        .iter()
        .filter(|t| t.count > 0)
        .map(|t| CategoryAvgPrice {
            category: t.category.clone(),
            avg_price_cents: mean_half_up(t.total_cents, t.count),
        })
        .collect();
    out.sort_by(|a, b| a.category.cmp(&b.category));
    out
}

fn mean_half_up(total: i64, count: i64) -> i64 {
    let total = i128::from(total);
    let count = i128::from(count);
    let doubled = 2 * total.abs() + count;
    let magnitude = doubled / (2 * count);
    let signed = if total < 0 { -magnitude } else { magnitude };
    signed.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

mod cents_string {
    use prodstats_core::{format_cents, Decimal};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_cents(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let value: Decimal = raw.parse().map_err(serde::de::Error::custom)?;
        value
            .round_cents_half_even()
            .and_then(|c| i64::try_from(c).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("amount out of range: {raw}")))
    }
}
