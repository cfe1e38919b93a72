use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Host that resolves compact DOIs to their landing pages.
pub const DOI_RESOLVER_HOST: &str = "https://doi.org/";

/// Errors raised while parsing a DOI from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DoiParseError {
    /// The input has no `/` separating prefix and suffix.
    #[error("DOI is missing a '/' separator: {0}")]
    MissingSeparator(String),

    /// The prefix does not start with the `10.` directory indicator.
    #[error("DOI prefix must start with '10.': {0}")]
    InvalidPrefix(String),

    /// The suffix is empty.
    #[error("DOI suffix is empty: {0}")]
    EmptySuffix(String),
}

/// A persistent identifier made of a registrant prefix and a suffix.
///
/// Serializes to its compact `prefix/suffix` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doi {
    prefix: String,
    suffix: String,
}

impl Doi {
    /// Builds a DOI from its parts, validating both.
    pub fn new(
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Result<Self, DoiParseError> {
        let prefix = prefix.into();
        let suffix = suffix.into();
        if !prefix.starts_with("10.") || prefix.len() <= 3 {
            return Err(DoiParseError::InvalidPrefix(prefix));
        }
        if suffix.is_empty() {
            return Err(DoiParseError::EmptySuffix(format!("{prefix}/")));
        }
        Ok(Self { prefix, suffix })
    }

    /// Returns the registrant prefix, e.g. `10.5072`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the suffix assigned under the prefix.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns the compact `prefix/suffix` form.
    pub fn to_compact(&self) -> String {
        format!("{}/{}", self.prefix, self.suffix)
    }

    /// Returns the resolvable `https://doi.org/prefix/suffix` URI.
    pub fn to_uri(&self) -> String {
        format!("{DOI_RESOLVER_HOST}{}/{}", self.prefix, self.suffix)
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

impl FromStr for Doi {
    type Err = DoiParseError;

    /// Accepts either the compact form or a resolver URI (`https://doi.org/...`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let compact = trimmed
            .strip_prefix(DOI_RESOLVER_HOST)
            .or_else(|| trimmed.strip_prefix("http://doi.org/"))
            .or_else(|| trimmed.strip_prefix("doi:"))
            .unwrap_or(trimmed);

        let (prefix, suffix) = compact
            .split_once('/')
            .ok_or_else(|| DoiParseError::MissingSeparator(s.to_string()))?;
        Self::new(prefix, suffix)
    }
}

impl TryFrom<String> for Doi {
    type Error = DoiParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.to_compact()
    }
}

/// Identifier of a tenant (a customer institution owning a DOI prefix).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the tenant ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doi_compact_and_uri_forms() {
        let doi = Doi::new("10.5072", "abc-123").unwrap();
        assert_eq!(doi.to_compact(), "10.5072/abc-123");
        assert_eq!(doi.to_string(), "10.5072/abc-123");
        assert_eq!(doi.to_uri(), "https://doi.org/10.5072/abc-123");
    }

    #[test]
    fn doi_parses_compact_and_uri_forms() {
        let compact: Doi = "10.5072/abc".parse().unwrap();
        let uri: Doi = "https://doi.org/10.5072/abc".parse().unwrap();
        let prefixed: Doi = "doi:10.5072/abc".parse().unwrap();
        assert_eq!(compact, uri);
        assert_eq!(compact, prefixed);
        assert_eq!(compact.prefix(), "10.5072");
        assert_eq!(compact.suffix(), "abc");
    }

    #[test]
    fn doi_suffix_may_contain_slashes() {
        let doi: Doi = "10.5072/a/b".parse().unwrap();
        assert_eq!(doi.suffix(), "a/b");
    }

    #[test]
    fn doi_rejects_malformed_input() {
        assert!(matches!(
            "no-separator".parse::<Doi>(),
            Err(DoiParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "11.5072/abc".parse::<Doi>(),
            Err(DoiParseError::InvalidPrefix(_))
        ));
        assert!(matches!(
            "10.5072/".parse::<Doi>(),
            Err(DoiParseError::EmptySuffix(_))
        ));
    }

    #[test]
    fn doi_equality_is_structural() {
        let a = Doi::new("10.5072", "x").unwrap();
        let b: Doi = "10.5072/x".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Doi::new("10.5073", "x").unwrap());
    }

    #[test]
    fn doi_serializes_as_compact_string() {
        let doi = Doi::new("10.5072", "abc").unwrap();
        let json = serde_json::to_string(&doi).unwrap();
        assert_eq!(json, "\"10.5072/abc\"");
        let back: Doi = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doi);
        assert!(serde_json::from_str::<Doi>("\"garbage\"").is_err());
    }

    #[test]
    fn tenant_id_is_transparent() {
        let tenant = TenantId::new("unit");
        assert_eq!(serde_json::to_string(&tenant).unwrap(), "\"unit\"");
        assert_eq!(tenant.as_str(), "unit");
    }
}
