//! Session boundary.
//!
//! Every query a proxy produces is executed through a [`Session`]. The proxy
//! layer never talks to an engine directly, has no timeout or retry policy,
//! and passes session errors back unchanged.

use crate::error::SessionError;
use crate::fragment::RenderedQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Executes rendered Cypher against a graph engine.
///
/// Implementations must be Send + Sync so proxies can be shared across
/// threads. `context` is an opaque tag the caller attached to the proxy
/// (for example a request name for logging).
pub trait Session: Send + Sync {
    fn run(&self, query: &RenderedQuery, context: Option<&str>) -> Result<QueryResult, SessionError>;
}

/// Rows returned for one query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<Record>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One result row, keyed by RETURN column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new(data: HashMap<String, Value>) -> Self {
        Self { data }
    }

    /// Build a record from `(column, value)` pairs
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self {
            data: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column)
    }
}
