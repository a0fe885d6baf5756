//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DomainError;

/// Store-assigned product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

impl ProductId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ProductId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("ProductId: {e}")))
    }
}

/// Content-derived product identifier used as the upsert key.
///
/// Derived as the hex SHA-256 of `lower(trim(name)) + "|" + lower(trim(category))`,
/// so the same product always maps to the same identifier regardless of the
/// casing or surrounding whitespace in the source feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Length of a derived identifier (hex-encoded SHA-256).
    pub const LEN: usize = 64;

    pub fn derive(name: &str, category: &str) -> Self {
        let normalized = format!(
            "{}|{}",
            name.trim().to_lowercase(),
            category.trim().to_lowercase()
        );
        let digest = Sha256::digest(normalized.as_bytes());
        Self(format!("{digest:x}"))
    }

    /// Wrap an identifier that was already persisted (or a fixture value).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let a = ExternalId::derive("Laptop Pro", "Electronics");
        let b = ExternalId::derive("Laptop Pro", "Electronics");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), ExternalId::LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn derive_ignores_case_and_surrounding_whitespace() {
        let a = ExternalId::derive("Laptop Pro", "Electronics");
        let b = ExternalId::derive("  laptop pro ", "ELECTRONICS\t");
        assert_eq!(a, b);
    }

    #[test]
    fn derive_distinguishes_name_and_category() {
        let a = ExternalId::derive("Laptop Pro", "Electronics");
        let b = ExternalId::derive("Laptop Pro", "Furniture");
        let c = ExternalId::derive("Desktop Pro", "Electronics");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn derive_hashes_the_normalized_pair() {
        let id = ExternalId::derive(" ABC ", "Def");
        assert_eq!(
            id.as_str(),
            "0def6826e591afbb7b4431daaa6f2a78c1e5af533cb94b6db1635efbf255cb16"
        );
    }

    #[test]
    fn product_id_parses_integers() {
        let id: ProductId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert!("abc".parse::<ProductId>().is_err());
    }
}
