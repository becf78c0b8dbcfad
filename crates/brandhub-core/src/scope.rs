//! Tenant scope identifier.
//!
//! A scope is the brand account that owns a notification. Every session,
//! channel subscription and store is keyed by exactly one scope.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Non-empty, trimmed brand scope identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(String);

impl ScopeId {
    /// Build a scope, failing on empty or whitespace-only input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        Self::parse(raw.as_ref()).ok_or_else(|| CoreError::invalid_scope(raw.as_ref()))
    }

    /// Build a scope, returning `None` for the unauthenticated (empty) case.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Same as [`ScopeId::parse`] but accepts an optional raw value.
    pub fn from_optional(raw: Option<&str>) -> Option<Self> {
        raw.and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when `raw` names this scope.
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == raw.trim()
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ScopeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for ScopeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ScopeId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ScopeId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ScopeId::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let scope = ScopeId::parse("  brandA ").unwrap();
        assert_eq!(scope.as_str(), "brandA");
        assert!(scope.matches("brandA"));
        assert!(!scope.matches("brandB"));
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(ScopeId::parse("").is_none());
        assert!(ScopeId::parse("   ").is_none());
        assert!(ScopeId::from_optional(None).is_none());
        assert!(ScopeId::from_optional(Some("")).is_none());
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(ScopeId::new(""), Err(CoreError::InvalidScope(_))));
        assert!("brandA".parse::<ScopeId>().is_ok());
    }

    #[test]
    fn test_serde_roundtrip_and_rejection() {
        let scope: ScopeId = serde_json::from_str("\"brandA\"").unwrap();
        assert_eq!(serde_json::to_string(&scope).unwrap(), "\"brandA\"");
        assert!(serde_json::from_str::<ScopeId>("\"\"").is_err());
    }
}
