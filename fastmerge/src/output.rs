//! The destination container of a merge.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bail;
use crate::container::{ContainerWriter, FileMetadata, RecordReader};
use crate::error::{ErrorKind, MergeResult};
use crate::index::{IndexSpec, SecondaryIndex};
use crate::merge_error;
use crate::report::{ReportSink, ReportToken};
use crate::types::{Row, RowGroupKind};

/// Suffix of the file an output is written to until it is finalized.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// What finalizing an output produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedOutput {
    /// Path of the finalized container.
    pub path: PathBuf,
    /// Row count of every group in the output.
    pub groups: BTreeMap<RowGroupKind, u64>,
    /// Number of `(run, lumi)` intervals reported.
    pub intervals_reported: u64,
    /// Groups an index was built for.
    pub indexed_groups: Vec<RowGroupKind>,
}

/// Accumulates the row groups of every input into the output container.
///
/// Rows are written to `<output>.partial` as they arrive. Only [`OutputAccumulator::finalize`]
/// closes the container and moves it to the output path, so an aborted merge leaves an
/// incomplete partial file and never a valid-looking output.
#[derive(Debug)]
pub struct OutputAccumulator {
    path: PathBuf,
    writer: ContainerWriter,
}

impl OutputAccumulator {
    /// Creates the partial container for the output at `path`.
    pub fn create(path: &Path) -> MergeResult<Self> {
        let partial_path = partial_path(path);
        let writer = ContainerWriter::create(&partial_path).map_err(|err| {
            merge_error!(
                ErrorKind::IoError,
                "Output file could not be created",
                format!("{}: {}", partial_path.display(), err.detail().unwrap_or_default()),
                source: err
            )
        })?;

        debug!(
            output = %path.display(),
            partial = %partial_path.display(),
            "created output container"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    /// Returns the path the output is moved to once finalized.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path rows are written to until finalize.
    pub fn partial_path(&self) -> &Path {
        self.writer.path()
    }

    /// Returns true if some input contributed `group`.
    pub fn has_group(&self, group: RowGroupKind) -> bool {
        self.writer.groups().contains_key(&group)
    }

    /// Returns the rows accumulated so far in `group`.
    pub fn rows(&self, group: RowGroupKind) -> u64 {
        self.writer.groups().get(&group).copied().unwrap_or(0)
    }

    /// Appends `rows` to `group` unchanged and in order, returning how many were appended.
    ///
    /// The group is created on first use, even when `rows` is empty.
    pub fn append<I>(&mut self, group: RowGroupKind, rows: I) -> MergeResult<u64>
    where
        I: IntoIterator<Item = MergeResult<Row>>,
    {
        if !self.has_group(group) {
            debug!(%group, "creating row group accumulator");
            self.writer.declare_group(group);
        }

        let mut appended = 0;
        for row in rows {
            self.writer.write_row(group, &row?)?;
            appended += 1;
        }

        Ok(appended)
    }

    /// Completes the output.
    ///
    /// Writes `metadata`, builds the secondary index of every indexed group present, reports each
    /// interval of the merged `lumi_metadata` group, closes the container, moves it to the output
    /// path and finally reports the output as closed with its event-row total.
    ///
    /// Fails with [`ErrorKind::EmptyMerge`] when no group was ever contributed; the partial file
    /// is removed in that case.
    pub fn finalize<R>(
        mut self,
        metadata: &FileMetadata,
        report: &mut R,
        token: ReportToken,
        contributing: &[ReportToken],
    ) -> MergeResult<FinalizedOutput>
    where
        R: ReportSink + ?Sized,
    {
        if self.writer.groups().is_empty() {
            let partial = self.partial_path().to_path_buf();
            drop(self);
            fs::remove_file(&partial)?;

            bail!(
                ErrorKind::EmptyMerge,
                "No input contributed any row groups",
                format!("removed {}", partial.display())
            );
        }

        self.writer.write_metadata(metadata)?;
        self.writer.flush()?;

        let mut indexed_groups = Vec::new();
        for spec in IndexSpec::ALL {
            if !self.has_group(spec.group()) {
                continue;
            }

            let mut records = RecordReader::open(self.partial_path())?;
            let index = SecondaryIndex::build(spec, records.rows(spec.group()))?;
            debug!(group = %spec.group(), entries = index.len(), "built secondary index");

            self.writer.write_index(&index)?;
            self.writer.flush()?;
            indexed_groups.push(spec.group());
        }

        let intervals_reported = self.report_intervals(report)?;

        let groups = self.writer.finish()?;
        let partial = partial_path(&self.path);
        fs::rename(&partial, &self.path)?;

        let events = groups.get(&RowGroupKind::Events).copied().unwrap_or(0);
        report.output_closed(token, events, contributing)?;

        info!(
            output = %self.path.display(),
            events,
            intervals = intervals_reported,
            "finalized output"
        );

        Ok(FinalizedOutput {
            path: self.path,
            groups,
            intervals_reported,
            indexed_groups,
        })
    }

    fn report_intervals<R>(&self, report: &mut R) -> MergeResult<u64>
    where
        R: ReportSink + ?Sized,
    {
        if !self.has_group(RowGroupKind::LumiMetadata) {
            return Ok(0);
        }

        let mut records = RecordReader::open(self.partial_path())?;
        let mut reported = 0;
        for (position, row) in records.rows(RowGroupKind::LumiMetadata).enumerate() {
            let row = row?;
            let (Some(run), Some(lumi)) = (row.aux_id("run"), row.aux_id("lumi")) else {
                bail!(
                    ErrorKind::IndexBuildError,
                    "Interval metadata row lacks its identifiers",
                    format!(
                        "row {position} of group `{}` has no unsigned `aux.run` and `aux.lumi`",
                        RowGroupKind::LumiMetadata
                    )
                );
            };

            report.interval_discovered(run, lumi)?;
            reported += 1;
        }

        Ok(reported)
    }
}

/// Returns the partial path of the output at `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(PARTIAL_SUFFIX);

    PathBuf::from(name)
}
