//! Opening and validating input containers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::CatalogItem;
use crate::container::{GroupRows, RawMetadata, Record, RecordReader};
use crate::error::{ErrorKind, MergeError, MergeResult};
use crate::index::SecondaryIndex;
use crate::merge_error;
use crate::provenance::ProvenanceStore;
use crate::report::ReportSink;
use crate::schema::SchemaRegistry;
use crate::types::{FileFormatVersion, FileIdentifier, RowGroupKind};

/// Per-call options for opening an input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Report and skip an input that cannot be opened instead of failing.
    pub skip_on_failure: bool,
    /// Log open failures at debug level instead of warn.
    pub suppress_diagnostics: bool,
}

/// Opens input containers on behalf of a merge.
pub struct InputFileReader;

impl InputFileReader {
    /// Opens and structurally validates the input described by `item`.
    ///
    /// When the file cannot be opened and `options.skip_on_failure` is set, the input is
    /// reported as skipped and `None` is returned. Otherwise the failure is an
    /// [`ErrorKind::OpenError`]. Missing metadata is not checked here; the accessors of
    /// [`InputFile`] report it.
    pub fn open<R>(
        item: &CatalogItem,
        options: OpenOptions,
        report: &mut R,
    ) -> MergeResult<Option<InputFile>>
    where
        R: ReportSink + ?Sized,
    {
        let result = match &item.physical_path {
            Some(path) => InputFile::load(path, &item.logical_name),
            None => Err(merge_error!(
                ErrorKind::OpenError,
                "Logical file name was not found in the file catalog",
                format!(
                    "logical file name {} was not found in the file catalog; if you wanted a local file, use the 'file:' prefix",
                    item.logical_name
                )
            )),
        };

        let err = match result {
            Ok(file) => return Ok(Some(file)),
            Err(err) => err,
        };

        let name = item.display_name();
        if options.suppress_diagnostics {
            debug!(file = %name, error = %err, "input could not be opened");
        } else {
            warn!(file = %name, error = %err, "input could not be opened");
        }

        if !options.skip_on_failure {
            return Err(err);
        }

        let path = item
            .physical_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        report.input_skipped(&path, &item.logical_name)?;

        Ok(None)
    }
}

/// A validated input container.
///
/// The container's structure has been checked on open. Its rows are streamed from disk on
/// demand, one row group at a time.
#[derive(Debug)]
pub struct InputFile {
    path: PathBuf,
    logical_name: String,
    records: RecordReader,
    metadata: Option<RawMetadata>,
    indices: BTreeMap<RowGroupKind, SecondaryIndex>,
    groups: BTreeMap<RowGroupKind, u64>,
}

impl InputFile {
    /// Opens the container at `path` and validates its structure.
    ///
    /// Every structural failure is an [`ErrorKind::OpenError`] naming the file.
    pub fn load(path: &Path, logical_name: &str) -> MergeResult<Self> {
        let mut records = RecordReader::open(path).map_err(|err| open_error(path, err))?;
        let scan = scan(&mut records).map_err(|err| open_error(path, err))?;

        debug!(
            file = %path.display(),
            groups = scan.groups.len(),
            indices = scan.indices.len(),
            "opened input container"
        );

        Ok(Self {
            path: path.to_path_buf(),
            logical_name: logical_name.to_string(),
            records,
            metadata: scan.metadata,
            indices: scan.indices,
            groups: scan.groups,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// Returns the file's schema, with the row groups the container actually holds.
    pub fn schema(&self) -> MergeResult<SchemaRegistry> {
        let mut schema: SchemaRegistry = self.section("schema", |m| m.schema.as_ref())?;
        schema.set_row_groups(self.groups.keys().copied());

        Ok(schema)
    }

    pub fn format_version(&self) -> MergeResult<FileFormatVersion> {
        self.section("format_version", |m| m.format_version.as_ref())
    }

    pub fn provenance(&self) -> MergeResult<ProvenanceStore> {
        self.section("provenance", |m| m.provenance.as_ref())
    }

    pub fn file_identifier(&self) -> MergeResult<FileIdentifier> {
        self.section("file_identifier", |m| m.file_identifier.as_ref())
    }

    /// Returns true if the container declares `group`.
    pub fn has_row_group(&self, group: RowGroupKind) -> bool {
        self.groups.contains_key(&group)
    }

    /// Returns the declared groups in streaming order.
    pub fn row_groups(&self) -> impl Iterator<Item = RowGroupKind> + '_ {
        self.groups.keys().copied()
    }

    /// Returns the number of rows in `group`.
    pub fn row_count(&self, group: RowGroupKind) -> u64 {
        self.groups.get(&group).copied().unwrap_or(0)
    }

    /// Returns the stored index of `group`, if the container carries one.
    pub fn index(&self, group: RowGroupKind) -> Option<&SecondaryIndex> {
        self.indices.get(&group)
    }

    /// Streams the rows of `group` in file order.
    ///
    /// Consuming the sequence advances the file's cursor. Calling this again restarts from the
    /// first row of the requested group.
    pub fn row_group(&mut self, group: RowGroupKind) -> MergeResult<GroupRows<'_>> {
        self.records.rewind()?;

        Ok(self.records.rows(group))
    }

    /// Releases the file handle.
    pub fn close(self) {
        debug!(file = %self.path.display(), "closed input container");
    }

    /// Decodes one metadata section.
    ///
    /// A section that is absent or cannot be decoded is [`ErrorKind::CorruptMetadata`].
    fn section<T, F>(&self, name: &str, select: F) -> MergeResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&RawMetadata) -> Option<&Value>,
    {
        let Some(value) = self.metadata.as_ref().and_then(select) else {
            return Err(self.missing_section(name));
        };

        serde_json::from_value(value.clone()).map_err(|err| {
            merge_error!(
                ErrorKind::CorruptMetadata,
                "Input file has an unreadable metadata section",
                format!("{}: `{name}` section: {err}", self.path.display()),
                source: err
            )
        })
    }

    fn missing_section(&self, section: &str) -> MergeError {
        merge_error!(
            ErrorKind::CorruptMetadata,
            "Input file is missing a required metadata section",
            format!("{}: no `{section}` section", self.path.display())
        )
    }
}

/// What a structural scan of a container found.
struct ContainerScan {
    metadata: Option<RawMetadata>,
    indices: BTreeMap<RowGroupKind, SecondaryIndex>,
    groups: BTreeMap<RowGroupKind, u64>,
}

fn scan(records: &mut RecordReader) -> MergeResult<ContainerScan> {
    match records.next_record()? {
        Some(header) if header.is_supported_header() => {}
        _ => {
            return Err(merge_error!(
                ErrorKind::OpenError,
                "Container header is missing or unsupported"
            ));
        }
    }

    let mut metadata = None;
    let mut indices = BTreeMap::new();
    let mut counted: BTreeMap<RowGroupKind, u64> = BTreeMap::new();
    let mut end = None;

    while let Some(record) = records.next_record()? {
        if end.is_some() {
            return Err(merge_error!(
                ErrorKind::OpenError,
                "Container has records after its end record",
                format!("line {}", records.line())
            ));
        }

        match record {
            Record::Header { .. } => {
                return Err(merge_error!(
                    ErrorKind::OpenError,
                    "Container has more than one header",
                    format!("line {}", records.line())
                ));
            }
            Record::Row { group, .. } => {
                *counted.entry(group).or_insert(0) += 1;
            }
            Record::Metadata { metadata: section } => {
                if metadata.is_some() {
                    return Err(merge_error!(
                        ErrorKind::OpenError,
                        "Container has more than one metadata record",
                        format!("line {}", records.line())
                    ));
                }
                metadata = Some(section.into_owned());
            }
            Record::Index { index } => {
                let index = index.into_owned();
                indices.insert(index.group(), index);
            }
            Record::End { groups } => end = Some(groups),
        }
    }

    let Some(groups) = end else {
        return Err(merge_error!(
            ErrorKind::OpenError,
            "Container is incomplete",
            "no end record"
        ));
    };

    for (group, rows) in &counted {
        let declared = groups.get(group).copied().unwrap_or(0);
        if declared != *rows {
            return Err(merge_error!(
                ErrorKind::OpenError,
                "Container row counts do not match its end record",
                format!("group `{group}` has {rows} rows, end record declares {declared}")
            ));
        }
    }
    for (group, declared) in &groups {
        if *declared > 0 && !counted.contains_key(group) {
            return Err(merge_error!(
                ErrorKind::OpenError,
                "Container row counts do not match its end record",
                format!("group `{group}` has 0 rows, end record declares {declared}")
            ));
        }
    }

    Ok(ContainerScan {
        metadata,
        indices,
        groups,
    })
}

fn open_error(path: &Path, cause: MergeError) -> MergeError {
    let reason = cause.detail().unwrap_or(cause.description()).to_string();
    let description = if cause.kind() == ErrorKind::OpenError {
        cause.description().to_string()
    } else {
        "Unable to find file or unable to open file".to_string()
    };

    merge_error!(
        ErrorKind::OpenError,
        "Input file could not be opened",
        format!("{}: {description}: {reason}", path.display()),
        source: cause
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::container::{ContainerWriter, FileMetadata};
    use crate::report::{MemoryReport, ReportEvent};
    use crate::types::{AUX_COLUMN, Branch, BranchType, Row};

    fn event(n: u64) -> Row {
        Row::new()
            .with("n", n)
            .with(AUX_COLUMN, json!({"run": 1, "lumi": 1, "event": n}))
    }

    fn write_valid(path: &Path) {
        let mut writer = ContainerWriter::create(path).unwrap();
        for n in 0..3 {
            writer.write_row(RowGroupKind::Events, &event(n)).unwrap();
        }
        writer.declare_group(RowGroupKind::Runs);
        writer
            .write_metadata(&FileMetadata {
                format_version: Some(FileFormatVersion(1)),
                file_identifier: Some(FileIdentifier::generate()),
                schema: Some(
                    SchemaRegistry::new().with_branch(Branch::new("x", BranchType::Event)),
                ),
                provenance: None,
            })
            .unwrap();
        writer.finish().unwrap();
    }

    fn item(path: &Path) -> CatalogItem {
        CatalogItem {
            physical_path: Some(path.to_path_buf()),
            logical_name: String::new(),
        }
    }

    #[test]
    fn test_open_valid_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        write_valid(&path);
        let mut report = MemoryReport::new();

        let mut file = InputFileReader::open(&item(&path), OpenOptions::default(), &mut report)
            .unwrap()
            .unwrap();

        assert!(report.events().is_empty());
        assert_eq!(file.format_version().unwrap(), FileFormatVersion(1));
        assert_eq!(file.row_count(RowGroupKind::Events), 3);
        assert!(file.has_row_group(RowGroupKind::Runs));
        assert!(!file.has_row_group(RowGroupKind::Lumis));
        let schema = file.schema().unwrap();
        assert!(schema.has_row_group(RowGroupKind::Events));
        assert!(schema.has_row_group(RowGroupKind::Runs));

        let rows: Vec<_> = file
            .row_group(RowGroupKind::Events)
            .unwrap()
            .collect::<MergeResult<_>>()
            .unwrap();
        assert_eq!(rows, vec![event(0), event(1), event(2)]);

        assert_eq!(file.row_group(RowGroupKind::Runs).unwrap().count(), 0);
        assert_eq!(file.row_group(RowGroupKind::Events).unwrap().count(), 3);
        file.close();
    }

    #[test]
    fn test_missing_sections_are_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        write_valid(&path);

        let file = InputFile::load(&path, "").unwrap();

        assert_eq!(file.provenance().unwrap_err().kind(), ErrorKind::CorruptMetadata);
        assert!(file.file_identifier().is_ok());
    }

    #[test]
    fn test_undecodable_section_opens_but_is_corrupt_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        write_valid(&path);
        let contents = fs::read_to_string(&path).unwrap();
        let rewritten: Vec<_> = contents
            .lines()
            .map(|line| {
                if line.starts_with(r#"{"record":"metadata""#) {
                    r#"{"record":"metadata","metadata":{"format_version":1,"schema":"garbage"}}"#
                } else {
                    line
                }
            })
            .collect();
        fs::write(&path, rewritten.join("\n")).unwrap();

        let file = InputFile::load(&path, "").unwrap();

        assert_eq!(file.format_version().unwrap(), FileFormatVersion(1));
        let err = file.schema().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptMetadata);
        assert!(err.detail().unwrap().contains("`schema` section"));
    }

    #[test]
    fn test_unreadable_file_without_skip_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.fm");
        let mut report = MemoryReport::new();

        let err = InputFileReader::open(&item(&path), OpenOptions::default(), &mut report)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OpenError);
        assert!(report.events().is_empty());
    }

    #[test]
    fn test_unreadable_file_with_skip_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.fm");
        let mut report = MemoryReport::new();
        let options = OpenOptions {
            skip_on_failure: true,
            suppress_diagnostics: true,
        };

        let file = InputFileReader::open(&item(&path), options, &mut report).unwrap();

        assert!(file.is_none());
        assert_eq!(report.events(), &[ReportEvent::InputSkipped {
            path: path.display().to_string(),
            logical_name: String::new(),
        }]);
    }

    #[test]
    fn test_unresolved_logical_name() {
        let unresolved = CatalogItem {
            physical_path: None,
            logical_name: "/store/a.fm".to_string(),
        };
        let mut report = MemoryReport::new();

        let err = InputFileReader::open(&unresolved, OpenOptions::default(), &mut report)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OpenError);
        insta::assert_snapshot!(
            err.detail().unwrap(),
            @"logical file name /store/a.fm was not found in the file catalog; if you wanted a local file, use the 'file:' prefix"
        );
    }

    #[test]
    fn test_truncated_container_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        write_valid(&path);
        let contents = fs::read_to_string(&path).unwrap();
        let truncated: Vec<_> = contents.lines().take(3).collect();
        fs::write(&path, truncated.join("\n")).unwrap();

        let err = InputFile::load(&path, "").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OpenError);
        assert!(err.detail().unwrap().contains("Container is incomplete"));
    }

    #[test]
    fn test_row_count_mismatch_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        fs::write(
            &path,
            concat!(
                "{\"record\":\"header\",\"magic\":\"fastmerge-container\",\"layout\":1}\n",
                "{\"record\":\"row\",\"group\":\"runs\",\"row\":{}}\n",
                "{\"record\":\"end\",\"groups\":{\"runs\":2}}\n",
            ),
        )
        .unwrap();

        let err = InputFile::load(&path, "").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OpenError);
        assert!(
            err.detail()
                .unwrap()
                .contains("group `runs` has 1 rows, end record declares 2")
        );
    }

    #[test]
    fn test_foreign_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.fm");
        fs::write(&path, "{\"record\":\"end\",\"groups\":{}}\n").unwrap();

        let err = InputFile::load(&path, "").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::OpenError);
    }
}
