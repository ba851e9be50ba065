//! Query Abstraction
//!
//! The coordinator never executes queries itself; it only needs to know a
//! query's variable bag so fetched pages can be fingerprinted and deduplicated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A query understood by the injected query engine.
///
/// `Data` is the decoded payload of one page. Queries are cheap values that the
/// page resolver constructs freely, so they must be clonable and sendable.
pub trait Query: Clone + Send + Sync + 'static {
    /// Decoded payload of one page of this query
    type Data: Clone + Send + Sync + 'static;

    /// The query's variable bag, used to fingerprint the page it fetches
    fn variables(&self) -> Variables;
}

/// An order-independent bag of query variables.
///
/// Backed by a sorted map so that two bags with the same entries encode to the
/// same fingerprint regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables(BTreeMap<String, Value>);

impl Variables {
    /// Create an empty variable bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a variable, replacing any existing entry with the same name
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a variable by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in canonical (sorted) order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Variables {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Deterministic fingerprint of a query's variable bag.
///
/// Two fetches with identical variables produce equal keys, which makes page
/// storage idempotent: a re-fetch replaces its slot instead of appending.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PageKey(Arc<str>);

impl PageKey {
    /// Fingerprint a variable bag
    pub fn from_variables(variables: &Variables) -> Self {
        let mut encoded = String::new();
        for (name, value) in variables.iter() {
            encoded.push_str(name);
            encoded.push('=');
            encoded.push_str(&value.to_string());
            encoded.push(';');
        }
        Self(encoded.into())
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
