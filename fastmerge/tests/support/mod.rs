//! Container fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fastmerge::container::{ContainerWriter, FileMetadata};
use fastmerge::provenance::{
    ConfigurationBlob, ProcessConfiguration, ProcessHistory, ProvenanceId, ProvenanceStore,
};
use fastmerge::reader::InputFile;
use fastmerge::schema::SchemaRegistry;
use fastmerge::types::{
    AUX_COLUMN, Branch, BranchType, FileFormatVersion, FileIdentifier, Row, RowGroupKind,
};
use serde_json::json;
use tempfile::TempDir;

/// Name of the event branch every fixture carries.
pub const EVENT_BRANCH: &str = "recoTracks";

/// Returns the content id of a configuration labelled `label`.
pub fn configuration_id(label: &str) -> ProvenanceId {
    ProvenanceId::of(&ConfigurationBlob {
        content: label.to_string(),
    })
    .unwrap()
}

/// Returns a one-step processing history for the pass `pass_id`.
pub fn history(pass_id: &str) -> ProcessHistory {
    ProcessHistory {
        configurations: vec![ProcessConfiguration {
            process_name: "RECO".to_string(),
            release_version: "CMSSW_X_Y_Z".to_string(),
            pass_id: pass_id.to_string(),
            parameter_set_id: configuration_id(pass_id),
        }],
    }
}

/// Returns a schema with one event branch and one run branch.
pub fn schema(configuration: &str) -> SchemaRegistry {
    SchemaRegistry::new()
        .with_branch(
            Branch::new(EVENT_BRANCH, BranchType::Event)
                .with_configuration_id(configuration_id(configuration)),
        )
        .with_branch(
            Branch::new("runInfo", BranchType::Run)
                .with_configuration_id(configuration_id("run-info")),
        )
}

/// Returns a row identified by `(run, lumi, event)` and tagged with the file it came from.
pub fn row(source: &str, run: u64, lumi: u64, event: u64) -> Row {
    Row::new()
        .with(AUX_COLUMN, json!({"run": run, "lumi": lumi, "event": event}))
        .with("source", source)
}

/// Describes one input container.
#[derive(Debug, Clone)]
pub struct ContainerFixture {
    pub name: String,
    pub metadata: FileMetadata,
    pub groups: Vec<(RowGroupKind, Vec<Row>)>,
}

impl ContainerFixture {
    /// A version 1 container with `events` events in run `run`, one lumi and one run record.
    pub fn new(name: &str, run: u64, events: u64) -> Self {
        let mut provenance = ProvenanceStore::new();
        provenance.insert(history("pass-1")).unwrap();

        let event_rows = (1..=events).map(|event| row(name, run, 1, event)).collect();

        Self {
            name: name.to_string(),
            metadata: FileMetadata {
                format_version: Some(FileFormatVersion(1)),
                file_identifier: Some(FileIdentifier::generate()),
                schema: Some(schema("config-a")),
                provenance: Some(provenance),
            },
            groups: vec![
                (RowGroupKind::Events, event_rows),
                (RowGroupKind::LumiMetadata, vec![row(name, run, 1, 0)]),
                (RowGroupKind::Runs, vec![row(name, run, 0, 0)]),
            ],
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.metadata.format_version = Some(FileFormatVersion(version));
        self
    }

    pub fn with_schema(mut self, schema: SchemaRegistry) -> Self {
        self.metadata.schema = Some(schema);
        self
    }

    pub fn without_schema(mut self) -> Self {
        self.metadata.schema = None;
        self
    }

    pub fn with_history(mut self, pass_id: &str) -> Self {
        let provenance = self.metadata.provenance.get_or_insert_with(ProvenanceStore::new);
        provenance.insert(history(pass_id)).unwrap();
        self
    }

    pub fn without_group(mut self, group: RowGroupKind) -> Self {
        self.groups.retain(|(kind, _)| *kind != group);
        self
    }

    pub fn without_groups(mut self) -> Self {
        self.groups.clear();
        self
    }

    /// Adds a `lumis` group with one record for each of `lumis` in the fixture's run.
    pub fn with_lumis(mut self, run: u64, lumis: &[u64]) -> Self {
        let rows = lumis.iter().map(|lumi| row(&self.name, run, *lumi, 0)).collect();
        self.groups.push((RowGroupKind::Lumis, rows));
        self
    }

    /// Writes the container into `dir` and returns its path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.fm", self.name));
        let mut writer = ContainerWriter::create(&path).unwrap();

        for (group, rows) in &self.groups {
            writer.declare_group(*group);
            for row in rows {
                writer.write_row(*group, row).unwrap();
            }
        }
        writer.write_metadata(&self.metadata).unwrap();
        writer.finish().unwrap();

        path
    }
}

/// A temporary directory holding the inputs and output of one merge.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `fixture` and returns its path as an input name.
    pub fn input(&self, fixture: &ContainerFixture) -> String {
        fixture.write(self.path()).display().to_string()
    }

    /// Returns the path of a file that does not exist.
    pub fn missing(&self, name: &str) -> String {
        self.path().join(name).display().to_string()
    }

    pub fn output(&self) -> PathBuf {
        self.path().join("merged.fm")
    }

    pub fn output_name(&self) -> String {
        self.output().display().to_string()
    }
}

/// Reads every row of `group` from the container at `path`.
pub fn read_rows(path: &Path, group: RowGroupKind) -> Vec<Row> {
    let mut file = InputFile::load(path, "").unwrap();
    file.row_group(group)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// Returns the `source` column of each row.
pub fn sources(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| row.get("source").and_then(|v| v.as_str()).unwrap_or_default().to_string())
        .collect()
}

/// Replaces the metadata record of the written container at `path` with `line`.
pub fn rewrite_metadata(path: &str, line: &str) {
    let contents = fs::read_to_string(path).unwrap();
    let rewritten: Vec<_> = contents
        .lines()
        .map(|record| {
            if record.starts_with(r#"{"record":"metadata""#) {
                line
            } else {
                record
            }
        })
        .collect();
    fs::write(path, rewritten.join("\n")).unwrap();
}
