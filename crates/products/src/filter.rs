//! Listing filters and ordering.

use core::cmp::Ordering as CmpOrdering;

use serde::{Deserialize, Serialize};

use prodstats_core::Decimal;

use crate::product::Product;

/// A price bound expressed in whole cents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBound {
    cents: i64,
}

impl PriceBound {
    /// Lower bound: the smallest cent amount `>= value`.
    pub fn at_least(value: &Decimal) -> Self {
        Self {
            cents: saturate(value.ceil_cents(), value.is_positive()),
        }
    }

    /// Upper bound: the largest cent amount `<= value`.
    pub fn at_most(value: &Decimal) -> Self {
        Self {
            cents: saturate(value.floor_cents(), value.is_positive()),
        }
    }

    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }
}

fn saturate(cents: Option<i128>, positive: bool) -> i64 {
    match cents {
        Some(c) => c.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        None if positive => i64::MAX,
        None => i64::MIN,
    }
}

/// Filter applied to product listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive exact category match.
    pub category: Option<String>,
    pub price_min: Option<PriceBound>,
    pub price_max: Option<PriceBound>,
}

impl ProductFilter {
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_price_min(mut self, bound: PriceBound) -> Self {
        self.price_min = Some(bound);
        self
    }

    pub fn with_price_max(mut self, bound: PriceBound) -> Self {
        self.price_max = Some(bound);
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if product.category.to_lowercase() != category.to_lowercase() {
                return false;
            }
        }
        let cents = product.price.cents();
        if self.price_min.is_some_and(|min| cents < min.cents()) {
            return false;
        }
        if self.price_max.is_some_and(|max| cents > max.cents()) {
            return false;
        }
        true
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OrderField {
    Name,
    Price,
    UpdatedAt,
    Category,
}

impl OrderField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "updated_at" => Some(Self::UpdatedAt),
            "category" => Some(Self::Category),
            _ => None,
        }
    }

    /// Storage column backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price_cents",
            Self::UpdatedAt => "updated_at",
            Self::Category => "category",
        }
    }

    fn compare(&self, a: &Product, b: &Product) -> CmpOrdering {
        match self {
            Self::Name => a.name.cmp(&b.name),
            Self::Price => a.price.cmp(&b.price),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            Self::Category => a.category.cmp(&b.category),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Sort keys for a listing. The product id (ascending) always breaks ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    keys: Vec<(OrderField, SortDirection)>,
}

impl Default for Ordering {
    fn default() -> Self {
        Self {
            keys: vec![(OrderField::UpdatedAt, SortDirection::Desc)],
        }
    }
}

impl Ordering {
    /// Parse a comma-separated list such as `category,-price`.
    ///
    /// Unknown fields are ignored. Falls back to the default when nothing usable
    /// remains.
    pub fn parse(raw: &str) -> Self {
        let mut keys: Vec<(OrderField, SortDirection)> = Vec::new();
        for term in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (direction, name) = match term.strip_prefix('-') {
                Some(rest) => (SortDirection::Desc, rest),
                None => (SortDirection::Asc, term),
            };
            let Some(field) = OrderField::parse(name) else {
                continue;
            };
            if keys.iter().any(|(f, _)| *f == field) {
                continue;
            }
            keys.push((field, direction));
        }

        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    pub fn keys(&self) -> &[(OrderField, SortDirection)] {
        &self.keys
    }

    pub fn compare(&self, a: &Product, b: &Product) -> CmpOrdering {
        for (field, direction) in &self.keys {
            let ord = match direction {
                SortDirection::Asc => field.compare(a, b),
                SortDirection::Desc => field.compare(b, a),
            };
            if ord != CmpOrdering::Equal {
                return ord;
            }
        }
        a.id.cmp(&b.id)
    }

    pub fn sort(&self, products: &mut [Product]) {
        products.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::NormalizedProduct;
    use chrono::{DateTime, TimeZone, Utc};
    use prodstats_core::{Price, ProductId};

    fn product(id: i64, name: &str, category: &str, cents: i64, day: u32) -> Product {
        let ts: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        let row = NormalizedProduct::new(name, category, Price::from_cents(cents).unwrap(), ts);
        Product::from_normalized(ProductId::new(id), &row, ts)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn category_match_ignores_case_but_not_content() {
        let p = product(1, "Laptop", "Electronics", 129999, 1);
        assert!(ProductFilter::default().with_category("electronics").matches(&p));
        assert!(ProductFilter::default().with_category("ELECTRONICS").matches(&p));
        assert!(!ProductFilter::default().with_category("Electro").matches(&p));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let p = product(1, "Mouse", "Electronics", 2999, 1);
        let f = ProductFilter::default()
            .with_price_min(PriceBound::at_least(&dec("29.99")))
            .with_price_max(PriceBound::at_most(&dec("29.99")));
        assert!(f.matches(&p));

        let above = ProductFilter::default().with_price_min(PriceBound::at_least(&dec("29.991")));
        assert!(!above.matches(&p));
        let below = ProductFilter::default().with_price_max(PriceBound::at_most(&dec("29.989")));
        assert!(!below.matches(&p));
    }

    #[test]
    fn huge_bounds_saturate() {
        let huge = dec("1e35");
        assert_eq!(PriceBound::at_least(&huge).cents(), i64::MAX);
        assert_eq!(PriceBound::at_most(&dec("-1e35")).cents(), i64::MIN);
    }

    #[test]
    fn parse_ordering_ignores_unknown_fields() {
        let o = Ordering::parse("category,-price,bogus");
        assert_eq!(
            o.keys(),
            &[
                (OrderField::Category, SortDirection::Asc),
                (OrderField::Price, SortDirection::Desc)
            ]
        );
        assert_eq!(Ordering::parse("bogus,,"), Ordering::default());
        assert_eq!(Ordering::parse(""), Ordering::default());
    }

    #[test]
    fn default_ordering_is_newest_first_then_id() {
        let mut items = vec![
            product(3, "C", "X", 100, 1),
            product(1, "A", "X", 100, 2),
            product(2, "B", "X", 100, 2),
        ];
        Ordering::default().sort(&mut items);
        let ids: Vec<i64> = items.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn multi_key_ordering() {
        let mut items = vec![
            product(1, "Desk", "Furniture", 54999, 1),
            product(2, "Mouse", "Electronics", 2999, 1),
            product(3, "Laptop", "Electronics", 129999, 1),
        ];
        Ordering::parse("category,-price").sort(&mut items);
        let names: Vec<&str> = items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop", "Mouse", "Desk"]);
    }
}
