use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MergeResult;
use crate::index::SecondaryIndex;
use crate::provenance::ProvenanceStore;
use crate::schema::SchemaRegistry;
use crate::types::{FileFormatVersion, FileIdentifier, Row, RowGroupKind};

/// Magic string carried by the header of every container.
pub const CONTAINER_MAGIC: &str = "fastmerge-container";

/// Layout revision of the container codec.
pub const CONTAINER_LAYOUT: u32 = 1;

/// The consolidated metadata section of a container.
///
/// Every part is optional on disk. Readers report a missing part only when it is asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata {
    pub format_version: Option<FileFormatVersion>,
    pub file_identifier: Option<FileIdentifier>,
    pub schema: Option<SchemaRegistry>,
    pub provenance: Option<ProvenanceStore>,
}

/// The metadata section as stored in a container.
///
/// Each part stays undecoded JSON until a reader asks for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_identifier: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
}

impl RawMetadata {
    /// Encodes every part of `metadata` that is present.
    pub fn encode(metadata: &FileMetadata) -> MergeResult<Self> {
        Ok(Self {
            format_version: encode_section(metadata.format_version.as_ref())?,
            file_identifier: encode_section(metadata.file_identifier.as_ref())?,
            schema: encode_section(metadata.schema.as_ref())?,
            provenance: encode_section(metadata.provenance.as_ref())?,
        })
    }
}

fn encode_section<T: Serialize>(section: Option<&T>) -> MergeResult<Option<Value>> {
    let Some(section) = section else {
        return Ok(None);
    };

    Ok(Some(serde_json::to_value(section)?))
}

/// One line of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record<'a> {
    Header {
        magic: Cow<'a, str>,
        layout: u32,
    },
    Row {
        group: RowGroupKind,
        row: Cow<'a, Row>,
    },
    Metadata {
        metadata: Cow<'a, RawMetadata>,
    },
    Index {
        index: Cow<'a, SecondaryIndex>,
    },
    End {
        groups: BTreeMap<RowGroupKind, u64>,
    },
}

impl Record<'_> {
    /// Returns the header written by this layout revision.
    pub fn header() -> Record<'static> {
        Record::Header {
            magic: Cow::Borrowed(CONTAINER_MAGIC),
            layout: CONTAINER_LAYOUT,
        }
    }

    /// Returns true if this is a header this codec can read.
    pub fn is_supported_header(&self) -> bool {
        matches!(
            self,
            Record::Header { magic, layout } if magic == CONTAINER_MAGIC && *layout == CONTAINER_LAYOUT
        )
    }
}
