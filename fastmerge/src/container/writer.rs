use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::container::{FileMetadata, RawMetadata, Record};
use crate::error::{MergeError, MergeResult};
use crate::index::SecondaryIndex;
use crate::types::{Row, RowGroupKind};

/// Appends records to a new container.
///
/// The header is written on creation. Row counts are tracked per group and written by
/// [`ContainerWriter::finish`] as the closing end record.
#[derive(Debug)]
pub struct ContainerWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    groups: BTreeMap<RowGroupKind, u64>,
}

impl ContainerWriter {
    /// Creates (or truncates) the container at `path` and writes its header.
    pub fn create(path: &Path) -> MergeResult<Self> {
        let file = File::create(path)?;
        let mut writer = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            groups: BTreeMap::new(),
        };
        writer.write_record(&Record::header())?;

        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declares `group` as present, even if no row is ever written to it.
    pub fn declare_group(&mut self, group: RowGroupKind) {
        self.groups.entry(group).or_insert(0);
    }

    /// Returns the row count of every declared group.
    pub fn groups(&self) -> &BTreeMap<RowGroupKind, u64> {
        &self.groups
    }

    /// Appends one row to `group`.
    pub fn write_row(&mut self, group: RowGroupKind, row: &Row) -> MergeResult<()> {
        self.write_record(&Record::Row {
            group,
            row: Cow::Borrowed(row),
        })?;
        *self.groups.entry(group).or_insert(0) += 1;

        Ok(())
    }

    pub fn write_metadata(&mut self, metadata: &FileMetadata) -> MergeResult<()> {
        self.write_record(&Record::Metadata {
            metadata: Cow::Owned(RawMetadata::encode(metadata)?),
        })
    }

    pub fn write_index(&mut self, index: &SecondaryIndex) -> MergeResult<()> {
        self.write_record(&Record::Index {
            index: Cow::Borrowed(index),
        })
    }

    /// Flushes buffered records to the file.
    pub fn flush(&mut self) -> MergeResult<()> {
        self.writer.flush()?;

        Ok(())
    }

    /// Writes the end record, syncs the file and returns the final group counts.
    pub fn finish(mut self) -> MergeResult<BTreeMap<RowGroupKind, u64>> {
        let end = Record::End {
            groups: self.groups.clone(),
        };
        self.write_record(&end)?;

        let file = self
            .writer
            .into_inner()
            .map_err(|err| MergeError::from(err.into_error()))?;
        file.sync_all()?;

        Ok(self.groups)
    }

    fn write_record(&mut self, record: &Record<'_>) -> MergeResult<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::container::RecordReader;

    #[test]
    fn test_written_container_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fm");

        let mut writer = ContainerWriter::create(&path).unwrap();
        writer.declare_group(RowGroupKind::Runs);
        writer
            .write_row(RowGroupKind::Events, &Row::new().with("x", 1))
            .unwrap();
        writer
            .write_row(RowGroupKind::Events, &Row::new().with("x", 2))
            .unwrap();
        writer.write_metadata(&FileMetadata::default()).unwrap();
        let groups = writer.finish().unwrap();

        assert_eq!(
            groups,
            BTreeMap::from([(RowGroupKind::Events, 2), (RowGroupKind::Runs, 0)])
        );

        let records: Vec<_> = RecordReader::open(&path)
            .unwrap()
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 5);
        assert!(records[0].is_supported_header());
        assert_eq!(records[2], Record::Row {
            group: RowGroupKind::Events,
            row: Cow::Owned(Row::new().with("x", json!(2))),
        });
        assert_eq!(records[4], Record::End { groups });
    }

    #[test]
    fn test_reader_reports_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.fm");
        std::fs::write(
            &path,
            "{\"record\":\"header\",\"magic\":\"fastmerge-container\",\"layout\":1}\nnot json\n",
        )
        .unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        assert!(reader.next_record().unwrap().is_some());
        let err = reader.next_record().unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::DeserializationError);
        assert_eq!(reader.line(), 2);
    }

    #[test]
    fn test_rewind_restarts_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fm");
        ContainerWriter::create(&path).unwrap().finish().unwrap();

        let mut reader = RecordReader::open(&path).unwrap();
        while reader.next_record().unwrap().is_some() {}
        reader.rewind().unwrap();

        assert!(reader.next_record().unwrap().unwrap().is_supported_header());
    }
}
