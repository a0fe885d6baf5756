//! Products domain module.
//!
//! This crate contains the business rules for the product feed and catalog,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage):
//! feed parsing, column normalization, row cleaning, listing filters and the
//! category statistics.

pub mod cleaning;
pub mod columns;
pub mod feed;
pub mod filter;
pub mod product;
pub mod stats;

pub use cleaning::{clean, parse_timestamp, CleanReport, RowError};
pub use columns::{normalize, FrameRow, ProductFrame, COLUMN_SYNONYMS, REQUIRED_COLUMNS};
pub use feed::{FeedError, RawFeed};
pub use filter::{OrderField, Ordering, PriceBound, ProductFilter, SortDirection};
pub use product::{NormalizedProduct, Product};
pub use stats::{average_by_category, CategoryAvgPrice, CategoryPriceTotal};
