use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::{Path, PathBuf};

use crate::container::Record;
use crate::error::{ErrorKind, MergeResult};
use crate::merge_error;
use crate::types::{Row, RowGroupKind};

/// Sequential reader over the records of a container.
///
/// Records are decoded one line at a time; nothing beyond the current line is buffered.
#[derive(Debug)]
pub struct RecordReader {
    path: PathBuf,
    reader: BufReader<File>,
    buffer: String,
    line: u64,
}

impl RecordReader {
    /// Opens the container at `path` positioned at its first record.
    pub fn open(path: &Path) -> MergeResult<Self> {
        let file = File::open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            buffer: String::new(),
            line: 0,
        })
    }

    /// Moves the cursor back to the first record.
    pub fn rewind(&mut self) -> MergeResult<()> {
        self.reader.rewind()?;
        self.line = 0;

        Ok(())
    }

    /// Returns the line number of the last record read.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the next record, or `None` at the end of the file.
    pub fn next_record(&mut self) -> MergeResult<Option<Record<'static>>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let line = self.buffer.trim_end();
            if line.is_empty() {
                continue;
            }

            let record = serde_json::from_str(line).map_err(|err| {
                merge_error!(
                    ErrorKind::DeserializationError,
                    "Container record is malformed",
                    format!("{}:{}: {err}", self.path.display(), self.line),
                    source: err
                )
            })?;

            return Ok(Some(record));
        }
    }

    /// Streams the rows of `group` from the current position up to the end record.
    pub fn rows(&mut self, group: RowGroupKind) -> GroupRows<'_> {
        GroupRows {
            records: self,
            group,
            done: false,
        }
    }
}

impl Iterator for RecordReader {
    type Item = MergeResult<Record<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Lazy, single-pass sequence over the rows of one row group.
///
/// Other records are skipped. The sequence ends at the end record, at the end of the file, or
/// after the first error.
#[derive(Debug)]
pub struct GroupRows<'a> {
    records: &'a mut RecordReader,
    group: RowGroupKind,
    done: bool,
}

impl Iterator for GroupRows<'_> {
    type Item = MergeResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.records.next_record() {
                Ok(Some(Record::Row { group, row })) if group == self.group => {
                    return Some(Ok(row.into_owned()));
                }
                Ok(Some(Record::End { .. })) | Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some(_)) => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
