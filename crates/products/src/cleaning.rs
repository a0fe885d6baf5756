//! Row cleaning: drop invalid rows, type the cells, derive identifiers, dedupe.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use prodstats_core::{Decimal, ExternalId, Price};

use crate::columns::ProductFrame;
use crate::product::{NormalizedProduct, MAX_CATEGORY_LEN, MAX_NAME_LEN};

/// A cleaned row that cannot be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based position of the row in the feed.
    pub row: usize,
    pub name: String,
    pub message: String,
}

impl core::fmt::Display for RowError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "row {} ({}): {}", self.row, self.name, self.message)
    }
}

/// Outcome of cleaning a frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanReport {
    /// Valid rows, deduplicated by external id, in feed order.
    pub products: Vec<NormalizedProduct>,
    /// Rows missing a name, category or price.
    pub dropped_missing: usize,
    /// Rows whose price is not a positive number.
    pub dropped_invalid_price: usize,
    /// Earlier occurrences of an external id that a later row replaced.
    pub duplicates: usize,
    /// Rows that passed cleaning but violate storage limits.
    pub errors: Vec<RowError>,
}

impl CleanReport {
    /// Rows dropped for missing values or invalid prices.
    pub fn dropped(&self) -> usize {
        self.dropped_missing + self.dropped_invalid_price
    }

    /// Rows removed before reaching the store.
    pub fn skipped(&self) -> usize {
        self.dropped() + self.duplicates
    }

    /// Rows handed to the store, including the ones that failed.
    pub fn processed(&self) -> usize {
        self.products.len() + self.errors.len()
    }
}

struct Candidate {
    row: usize,
    name: String,
    category: String,
    price: Decimal,
    updated_at: DateTime<Utc>,
    external_id: ExternalId,
}

/// Clean a normalized frame.
///
/// `now` replaces missing or unparseable `updated_at` values.
pub fn clean(frame: &ProductFrame, now: DateTime<Utc>) -> CleanReport {
    let mut report = CleanReport::default();
    let mut candidates: Vec<Candidate> = Vec::with_capacity(frame.len());

    for (idx, row) in frame.rows.iter().enumerate() {
        let (Some(name), Some(category), Some(price)) = (&row.name, &row.category, &row.price) else {
            report.dropped_missing += 1;
            continue;
        };

        let name = name.trim();
        let category = category.trim();
        if name.is_empty() || category.is_empty() {
            report.dropped_missing += 1;
            continue;
        }

        let price = match price.parse::<Decimal>() {
            Ok(p) if p.is_positive() && p.round_cents_half_even().is_none_or(|c| c > 0) => p,
            _ => {
                report.dropped_invalid_price += 1;
                continue;
            }
        };

        let updated_at = row
            .updated_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(now);

        candidates.push(Candidate {
            row: idx + 1,
            name: name.to_string(),
            category: category.to_string(),
            price,
            updated_at,
            external_id: ExternalId::derive(name, category),
        });
    }

    // Keep the last occurrence of each external id.
    let mut last_seen: HashMap<ExternalId, usize> = HashMap::with_capacity(candidates.len());
    for (pos, c) in candidates.iter().enumerate() {
        last_seen.insert(c.external_id.clone(), pos);
    }

    for (pos, c) in candidates.into_iter().enumerate() {
        if last_seen.get(&c.external_id) != Some(&pos) {
            report.duplicates += 1;
            continue;
        }

        if c.name.chars().count() > MAX_NAME_LEN {
            report.errors.push(RowError {
                row: c.row,
                message: format!("name longer than {MAX_NAME_LEN} characters"),
                name: c.name,
            });
            continue;
        }
        if c.category.chars().count() > MAX_CATEGORY_LEN {
            report.errors.push(RowError {
                row: c.row,
                message: format!("category longer than {MAX_CATEGORY_LEN} characters"),
                name: c.name,
            });
            continue;
        }

        match Price::from_decimal(&c.price) {
            Ok(price) => report.products.push(NormalizedProduct {
                name: c.name,
                category: c.category,
                price,
                updated_at: c.updated_at,
                external_id: c.external_id,
            }),
            Err(e) => report.errors.push(RowError {
                row: c.row,
                name: c.name,
                message: e.to_string(),
            }),
        }
    }

    report
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse a feed timestamp into UTC.
///
/// Values with an offset are converted to UTC; naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let zulu = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .map(|s| format!("{s}+00:00"));
    let with_offset = zulu.as_deref().unwrap_or(raw);
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(with_offset, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}
