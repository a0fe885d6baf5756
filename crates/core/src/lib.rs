//! `prodstats-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the price value object and exact decimal parsing.

pub mod decimal;
pub mod error;
pub mod id;
pub mod value_object;

pub use decimal::Decimal;
pub use error::{DomainError, DomainResult};
pub use id::{ExternalId, ProductId};
pub use value_object::{format_cents, Price, ValueObject};
