//! Exact-match selectors for rich queries.
//!
//! A [`Selector`] is the store's rich-query expression: a set of top-level
//! document fields, each of which must be present and equal to the given JSON
//! value. The textual form follows the CouchDB-style query document:
//!
//! ```text
//! {"selector":{"policyID":"pc2","hospitalID":"HP1"}}
//! ```
//!
//! Only equality is supported. The [`Display`](std::fmt::Display) form is
//! the query document, which is what shows up in trace spans.
//!
//! # Example
//!
//! ```
//! use crosschain_storage::Selector;
//! use serde_json::json;
//!
//! let selector = Selector::new().eq("hospitalID", "HP1").eq("policyID", "pc2");
//! assert!(selector.matches(&json!({"hospitalID": "HP1", "policyID": "pc2", "fileCount": 4})));
//! assert!(!selector.matches(&json!({"hospitalID": "HP1"})));
//! ```

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An exact-match rich-query selector.
///
/// Fields are kept in a [`BTreeMap`] so the textual form is deterministic.
/// An empty selector matches every JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector {
    fields: BTreeMap<String, Value>,
}

#[derive(Serialize)]
struct QueryDocument<'a> {
    selector: &'a Selector,
}

impl Selector {
    /// Creates an empty selector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality constraint on a top-level field.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns `true` if the selector has no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Tests a decoded document against every constraint.
    ///
    /// Non-object documents never match.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        let Value::Object(object) = document else {
            return false;
        };
        self.fields.iter().all(|(field, expected)| object.get(field) == Some(expected))
    }

    /// Tests a stored JSON payload against the selector.
    ///
    /// Payloads that are not valid JSON never match; rich queries skip them
    /// the same way a document database skips non-JSON values.
    #[must_use]
    pub fn matches_bytes(&self, payload: &[u8]) -> bool {
        serde_json::from_slice::<Value>(payload).is_ok_and(|doc| self.matches(&doc))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document =
            serde_json::to_string(&QueryDocument { selector: self }).map_err(|_| fmt::Error)?;
        f.write_str(&document)
    }
}
