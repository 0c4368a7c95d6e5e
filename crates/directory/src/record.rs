//! Documents stored in the regional shards and the global directory.
//!
//! Both types are flat JSON documents. The serialized field names are part
//! of the wire contract shared with the ledger runtime and must not change.

use serde::{Deserialize, Serialize};

/// A document with a shard-local primary key.
pub trait Document: Serialize + serde::de::DeserializeOwned + Send + Sync {
    /// The key the document is stored under.
    fn key(&self) -> &str;
}

/// A record owned by one regional shard.
///
/// ```json
/// {"ID":"pc2","color":"blue","size":5,"owner":"Alice","appraisedValue":3000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct RegionalRecord {
    /// Shard-local primary key.
    #[serde(rename = "ID")]
    #[builder(into)]
    pub id: String,

    /// Category label.
    #[builder(into)]
    pub color: String,

    pub size: i64,

    /// Display owner.
    #[builder(into)]
    pub owner: String,

    #[serde(rename = "appraisedValue")]
    pub appraised_value: i64,
}

impl Document for RegionalRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// A global directory entry routing an owner id to its regional shard.
///
/// The optional fields are omitted from the wire form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct DirectoryEntry {
    /// Owner id; primary key in the directory.
    #[serde(rename = "hospitalID")]
    #[builder(into)]
    pub owner_id: String,

    /// Name of the shard holding the owner's records.
    #[serde(rename = "regionalCCName")]
    #[builder(into)]
    pub shard: String,

    /// Record id inside the target shard, for compound lookups.
    #[serde(rename = "policyID", default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub record_id: Option<String>,

    /// Display owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub owner: Option<String>,

    #[serde(rename = "fileCount", default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<i64>,
}

impl DirectoryEntry {
    /// A simple entry with no compound routing key.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, shard: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            shard: shard.into(),
            record_id: None,
            owner: None,
            file_count: None,
        }
    }
}

impl Document for DirectoryEntry {
    fn key(&self) -> &str {
        &self.owner_id
    }
}
