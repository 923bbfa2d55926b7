//! Sorted secondary index implementation.

use serde::{Deserialize, Serialize};

use crate::error::MergeResult;
use crate::index::{IndexKey, IndexSpec};
use crate::types::{Row, RowGroupKind};

/// Statistics about an index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    /// Number of indexed rows.
    pub entry_count: u64,
    /// Number of distinct keys.
    pub distinct_key_count: u64,
    /// Number of distinct outer-interval ids.
    pub distinct_major_count: u64,
}

/// One indexed row: its key and its position within the row group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub key: IndexKey,
    pub row: u64,
}

/// Secondary index over one row group, sorted by key.
///
/// Rows sharing a key keep their group order, so looking a key up yields every matching row in
/// the order it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    group: RowGroupKind,
    entries: Vec<IndexEntry>,
}

impl SecondaryIndex {
    /// Creates an empty index for `group`.
    pub fn new(group: RowGroupKind) -> Self {
        Self {
            group,
            entries: Vec::new(),
        }
    }

    /// Builds the index of `spec`'s group from its rows, in group order.
    pub fn build<I>(spec: IndexSpec, rows: I) -> MergeResult<Self>
    where
        I: IntoIterator<Item = MergeResult<Row>>,
    {
        let mut entries = Vec::new();
        for (position, row) in rows.into_iter().enumerate() {
            let position = position as u64;
            let key = spec.key_of(&row?, position)?;
            entries.push(IndexEntry { key, row: position });
        }

        entries.sort_by_key(|entry| entry.key);

        Ok(Self {
            group: spec.group(),
            entries,
        })
    }

    pub fn group(&self) -> RowGroupKind {
        self.group
    }

    /// Returns every entry with exactly `key`.
    pub fn find(&self, key: IndexKey) -> &[IndexEntry] {
        let start = self.entries.partition_point(|entry| entry.key < key);
        let end = self.entries.partition_point(|entry| entry.key <= key);

        &self.entries[start..end]
    }

    /// Returns every entry whose outer-interval id is `major`.
    pub fn find_major(&self, major: u64) -> &[IndexEntry] {
        let start = self.entries.partition_point(|entry| entry.key.major < major);
        let end = self.entries.partition_point(|entry| entry.key.major <= major);

        &self.entries[start..end]
    }

    /// Returns the position of the first row with `key`.
    pub fn get(&self, key: IndexKey) -> Option<u64> {
        self.find(key).first().map(|entry| entry.row)
    }

    /// Returns the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns index statistics.
    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            entry_count: self.entries.len() as u64,
            ..Default::default()
        };

        let mut previous: Option<IndexKey> = None;
        for entry in &self.entries {
            if previous != Some(entry.key) {
                stats.distinct_key_count += 1;
            }
            if previous.map(|key| key.major) != Some(entry.key.major) {
                stats.distinct_major_count += 1;
            }
            previous = Some(entry.key);
        }

        stats
    }

    /// Returns an iterator over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }
}
