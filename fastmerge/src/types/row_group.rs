use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the column holding the identifying sub-columns of a row.
pub const AUX_COLUMN: &str = "aux";

/// The six row-aligned, append-only sequences of a container.
///
/// `Lumis` are the intervals and `Runs` the parent intervals of the event hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowGroupKind {
    Events,
    EventMetadata,
    Lumis,
    LumiMetadata,
    Runs,
    RunMetadata,
}

impl RowGroupKind {
    /// Every row group, in the order they are streamed into the output.
    pub const ALL: [RowGroupKind; 6] = [
        RowGroupKind::Events,
        RowGroupKind::EventMetadata,
        RowGroupKind::Lumis,
        RowGroupKind::LumiMetadata,
        RowGroupKind::Runs,
        RowGroupKind::RunMetadata,
    ];

    /// Returns the on-disk name of this row group.
    pub fn as_str(&self) -> &'static str {
        match self {
            RowGroupKind::Events => "events",
            RowGroupKind::EventMetadata => "event_metadata",
            RowGroupKind::Lumis => "lumis",
            RowGroupKind::LumiMetadata => "lumi_metadata",
            RowGroupKind::Runs => "runs",
            RowGroupKind::RunMetadata => "run_metadata",
        }
    }
}

impl fmt::Display for RowGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a row group: an ordered map from column name to cell value.
///
/// Rows are opaque to the merge; only the identifying sub-columns under [`AUX_COLUMN`] are ever
/// read, when indices and interval summaries are built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, serde_json::Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `column` to `value`, returning the row for chaining.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Returns the value of `column` if present.
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column)
    }

    /// Returns the unsigned identifier stored at `aux.<field>`.
    pub fn aux_id(&self, field: &str) -> Option<u64> {
        self.0.get(AUX_COLUMN)?.get(field)?.as_u64()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_row_group_names_match_serde() {
        for kind in RowGroupKind::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, json!(kind.as_str()));
        }
    }

    #[test]
    fn test_aux_id_reads_nested_identifier() {
        let row = Row::new()
            .with("x", 1.5)
            .with(AUX_COLUMN, json!({"run": 1, "lumi": 7, "event": 42}));

        assert_eq!(row.aux_id("run"), Some(1));
        assert_eq!(row.aux_id("event"), Some(42));
        assert_eq!(row.aux_id("missing"), None);
        assert_eq!(Row::new().with("x", 1).aux_id("run"), None);
    }

    #[test]
    fn test_negative_identifiers_are_not_ids() {
        let row = Row::new().with(AUX_COLUMN, json!({"run": -1}));

        assert_eq!(row.aux_id("run"), None);
    }
}
