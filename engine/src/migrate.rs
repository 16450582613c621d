//! Decoding and migration of stored collections.
//!
//! Older clients stored records without a snapshot, or with only some of
//! the display fields. Decoding repairs each record so display code never
//! has to handle a missing label, then restores the collection invariants
//! (unique keys, newest first).

use crate::{
    collection,
    error::{Error, Result},
    Category, FavoriteRecord, Snapshot, Timestamp,
};
use serde::Deserialize;
use serde_json::Value;

/// Counters describing what a migration had to fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Elements that could not be read as a record at all
    pub skipped: usize,
    /// Records whose snapshot was synthesized or completed
    pub repaired: usize,
    /// Records dropped because their key appeared earlier
    pub duplicates: usize,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.repaired == 0 && self.duplicates == 0
    }
}

/// Result of decoding a stored collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub records: Vec<FavoriteRecord>,
    pub report: MigrationReport,
}

/// A stored record of any historical shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    #[serde(alias = "type")]
    category: Category,
    #[serde(default)]
    timestamp: Timestamp,
    #[serde(default)]
    synced: bool,
    #[serde(default)]
    snapshot: Option<Value>,
}

/// Decode a stored JSON array into a valid collection.
///
/// Fails only when the document is not a JSON array; malformed elements are
/// skipped and counted.
pub fn decode_collection(json: &str) -> Result<Migration> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| Error::InvalidCollection(e.to_string()))?;
    let Value::Array(elements) = value else {
        return Err(Error::InvalidCollection("expected a JSON array".into()));
    };
    Ok(migrate(elements))
}

/// Migrate already-parsed elements.
pub fn migrate(elements: Vec<Value>) -> Migration {
    let mut report = MigrationReport::default();
    let mut records = Vec::with_capacity(elements.len());

    for element in elements {
        let stored = match serde_json::from_value::<StoredRecord>(element) {
            Ok(stored) if !stored.id.is_empty() => stored,
            _ => {
                report.skipped += 1;
                continue;
            }
        };

        let (snapshot, repaired) = Snapshot::repair(stored.category, &stored.id, stored.snapshot);
        if repaired {
            report.repaired += 1;
        }

        records.push(FavoriteRecord {
            id: stored.id,
            category: stored.category,
            timestamp: stored.timestamp,
            synced: stored.synced,
            snapshot,
        });
    }

    report.duplicates = collection::dedupe(&mut records);
    collection::sort_newest_first(&mut records);

    Migration { records, report }
}

/// Encode a collection for storage.
pub fn encode_collection(records: &[FavoriteRecord]) -> Result<String> {
    serde_json::to_string(records).map_err(|e| Error::Serialization(e.to_string()))
}
