//! Scope Types
//!
//! Ordered scope set serialized as a space-delimited string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Ordered set of scope names.
///
/// Duplicates are dropped on insertion and the first occurrence keeps its
/// position, so `"write read write"` becomes `"write read"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scopes {
    scopes: Vec<String>,
}

impl Scopes {
    /// Create an empty scope set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse scopes from a whitespace-delimited string.
    pub fn from_string(value: &str) -> Self {
        value.split_whitespace().collect()
    }

    /// Add a scope unless already present.
    pub fn add(&mut self, scope: impl Into<String>) {
        let scope = scope.into();
        if !scope.is_empty() && !self.exists(&scope) {
            self.scopes.push(scope);
        }
    }

    /// Check whether a single scope is present.
    pub fn exists(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Check whether every scope in `other` is present.
    pub fn has_scopes(&self, other: &Scopes) -> bool {
        other.iter().all(|scope| self.exists(scope))
    }

    /// Scope names in insertion order.
    pub fn all(&self) -> &[String] {
        &self.scopes
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scopes.join(" "))
    }
}

impl FromStr for Scopes {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_string(s))
    }
}

impl From<&str> for Scopes {
    fn from(value: &str) -> Self {
        Self::from_string(value)
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut scopes = Scopes::new();
        for scope in iter {
            scopes.add(scope);
        }
        scopes
    }
}

impl Serialize for Scopes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Scopes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_string(&value))
    }
}
