//! CSV product feed parsing.

use std::collections::BTreeSet;

use thiserror::Error;

/// Cell values treated as missing data.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Feed-level failure (the whole feed is unusable).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("malformed CSV: {0}")]
    Csv(String),

    #[error("feed has no header row")]
    MissingHeader,

    #[error("Missing required columns: {}", .0.iter().cloned().collect::<Vec<_>>().join(", "))]
    MissingColumns(BTreeSet<String>),
}

/// An untyped CSV table: header names plus rows of optional cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFeed {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawFeed {
    /// Parse CSV bytes with a header row.
    ///
    /// Short records are padded with missing cells; records with more fields than
    /// the header are rejected. Records whose cells are all blank are skipped.
    pub fn from_csv(bytes: &[u8]) -> Result<Self, FeedError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FeedError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(FeedError::MissingHeader);
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| FeedError::Csv(e.to_string()))?;

            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if record.len() > headers.len() {
                return Err(FeedError::Csv(format!(
                    "expected {} fields in line {}, saw {}",
                    headers.len(),
                    idx + 2,
                    record.len()
                )));
            }

            let mut row: Vec<Option<String>> = record.iter().map(cell_value).collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_value(raw: &str) -> Option<String> {
    if NA_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let feed = RawFeed::from_csv(b"name,category,price\nDesk,Furniture,10\n").unwrap();
        assert_eq!(feed.headers, vec!["name", "category", "price"]);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.rows[0][0].as_deref(), Some("Desk"));
    }

    #[test]
    fn na_tokens_become_missing() {
        let feed = RawFeed::from_csv(b"name,category,price\nDesk,NA,\n").unwrap();
        assert_eq!(feed.rows[0][1], None);
        assert_eq!(feed.rows[0][2], None);
    }

    #[test]
    fn short_rows_are_padded() {
        let feed = RawFeed::from_csv(b"name,category,price\nDesk\n").unwrap();
        assert_eq!(feed.rows[0], vec![Some("Desk".to_string()), None, None]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = RawFeed::from_csv(b"name,category\nDesk,Furniture,10\n").unwrap_err();
        assert!(matches!(err, FeedError::Csv(_)));
    }

    #[test]
    fn blank_records_are_skipped() {
        let feed = RawFeed::from_csv(b"name,category\nDesk,Furniture\n,\n").unwrap();
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let feed = RawFeed::from_csv(b"name,category\n\"Desk, large\",Furniture\n").unwrap();
        assert_eq!(feed.rows[0][0].as_deref(), Some("Desk, large"));
    }

    #[test]
    fn missing_columns_message_lists_names() {
        let err = FeedError::MissingColumns(["price".to_string(), "category".to_string()].into());
        assert_eq!(err.to_string(), "Missing required columns: category, price");
    }
}
