//! Core merger that validates inputs one by one and streams them into the output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::bail;
use crate::catalog::{Catalog, CatalogItem, OutputTarget};
use crate::config::MergerConfig;
use crate::container::FileMetadata;
use crate::error::{ErrorKind, MergeResult};
use crate::merge_error;
use crate::output::OutputAccumulator;
use crate::provenance::ProvenanceStore;
use crate::reader::{InputFile, InputFileReader};
use crate::report::{ReportSink, ReportToken};
use crate::schema::{MatchMode, SchemaRegistry};
use crate::types::{BranchType, FileFormatVersion, FileIdentifier, RowGroupKind};

/// Lifecycle of a [`MergeDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Idle,
    ExpectingFirstInput,
    AccumulatingInputs,
    Finalizing,
    Done,
    Failed,
}

/// Summary of a complete merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSummary {
    /// Path of the finalized output.
    pub output_path: PathBuf,
    /// Logical name of the output, empty when none was given.
    pub logical_name: String,
    /// Identifier minted for the output.
    pub file_identifier: FileIdentifier,
    /// Number of inputs merged into the output.
    pub inputs_merged: usize,
    /// Number of inputs skipped because they could not be opened.
    pub inputs_skipped: usize,
    /// Number of event rows in the output.
    pub events_written: u64,
    /// Row count of every group in the output.
    pub rows_written: BTreeMap<RowGroupKind, u64>,
    /// Number of `(run, lumi)` intervals reported.
    pub intervals_reported: u64,
}

/// The output of a merge once its first input has been accepted.
#[derive(Debug)]
struct OpenOutput {
    accumulator: OutputAccumulator,
    target: OutputTarget,
    token: ReportToken,
}

/// Merges input containers into one output container.
///
/// Inputs are processed strictly in catalog order, one at a time. The first accepted input seeds
/// the reference schema and file format version. Every later input must match them under the
/// configured [`MatchMode`]; the first incompatibility aborts the whole merge.
pub struct MergeDriver<C, R> {
    config: MergerConfig,
    catalog: C,
    report: R,
    state: MergeState,
    registry: SchemaRegistry,
    provenance: ProvenanceStore,
    version: Option<FileFormatVersion>,
    output: Option<OpenOutput>,
    input_tokens: Vec<ReportToken>,
    inputs_skipped: usize,
}

impl<C, R> MergeDriver<C, R>
where
    C: Catalog,
    R: ReportSink,
{
    /// Creates a new merge driver.
    pub fn new(config: MergerConfig, catalog: C, report: R) -> Self {
        Self {
            config,
            catalog,
            report,
            state: MergeState::Idle,
            registry: SchemaRegistry::new(),
            provenance: ProvenanceStore::new(),
            version: None,
            output: None,
            input_tokens: Vec::new(),
            inputs_skipped: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Returns the accumulated reference schema.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns the accumulated provenance.
    pub fn provenance(&self) -> &ProvenanceStore {
        &self.provenance
    }

    pub fn report(&self) -> &R {
        &self.report
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Consumes the driver, returning its report sink.
    pub fn into_report(self) -> R {
        self.report
    }

    /// Merges `inputs` into the configured output.
    ///
    /// Any fatal condition moves the driver to [`MergeState::Failed`] and releases the output,
    /// leaving its partial file incomplete.
    pub fn run(&mut self, inputs: &[String]) -> MergeResult<MergeSummary> {
        if self.state != MergeState::Idle {
            bail!(
                ErrorKind::InvalidState,
                "Merge driver can only run once",
                format!("driver is in state {:?}", self.state)
            );
        }

        let result = self.run_inputs(inputs);

        if let Err(err) = &result {
            self.state = MergeState::Failed;

            if let Some(open) = self.output.take() {
                warn!(
                    partial = %open.accumulator.partial_path().display(),
                    "merge failed, output left incomplete"
                );
            }

            error!(kind = ?err.kind(), error = %err, "merge failed");
        }

        result
    }

    fn run_inputs(&mut self, inputs: &[String]) -> MergeResult<MergeSummary> {
        let output = match self.config.output.as_deref() {
            Some(output) if !output.is_empty() => output.to_string(),
            _ => bail!(ErrorKind::BadArgument, "No output file was specified"),
        };
        if inputs.is_empty() {
            bail!(ErrorKind::BadArgument, "No input files were specified");
        }

        let items = self.catalog.resolve_inputs(inputs)?;
        info!(inputs = items.len(), %output, mode = ?self.config.match_mode, "starting merge");

        self.state = MergeState::ExpectingFirstInput;
        for item in &items {
            self.merge_file(item, &output)?;
        }

        self.finalize()
    }

    /// Opens, validates and streams one input.
    fn merge_file(&mut self, item: &CatalogItem, output: &str) -> MergeResult<()> {
        let options = self.config.open_options();
        let Some(mut file) = InputFileReader::open(item, options, &mut self.report)? else {
            self.inputs_skipped += 1;
            return Ok(());
        };

        let schema = file.schema()?;
        let branch_names = schema.branch_names(BranchType::Event);

        // The input is reported as opened before its compatibility is known. A rejected input is
        // then reported as closed without contributing rows.
        let token = self.report.input_opened(
            file.path(),
            file.logical_name(),
            self.catalog.url(),
            &branch_names,
        )?;

        match self.absorb_input(&mut file, schema, &branch_names, output) {
            Ok(events) => {
                file.close();
                self.report.input_closed(token, events)?;
                self.input_tokens.push(token);

                Ok(())
            }
            Err(err) => {
                file.close();
                if let Err(report_err) = self.report.input_closed(token, 0) {
                    warn!(error = %report_err, "failed to report rejected input as closed");
                }

                Err(err)
            }
        }
    }

    /// Checks an opened input against the reference and streams its rows into the output.
    ///
    /// Returns the number of event rows streamed.
    fn absorb_input(
        &mut self,
        file: &mut InputFile,
        schema: SchemaRegistry,
        branch_names: &[String],
        output: &str,
    ) -> MergeResult<u64> {
        let path = file.path().display().to_string();
        let version = file.format_version()?;

        match self.version {
            None => {
                if !version.is_supported() {
                    bail!(
                        ErrorKind::MismatchedInput,
                        "Only file format version 1 or greater can be merged",
                        format!("file {path} is version {version}")
                    );
                }

                if self.config.match_mode == MatchMode::Strict {
                    if let Err(mismatches) = schema.check_strict_criteria() {
                        let diagnostic = mismatches
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("\n");
                        bail!(
                            ErrorKind::MismatchedInput,
                            "Input does not meet the strict merge criteria",
                            format!("file {path}\n{diagnostic}")
                        );
                    }
                }

                self.registry = schema;
                self.version = Some(version);
                self.state = MergeState::AccumulatingInputs;
            }
            Some(reference) => {
                if version != reference {
                    bail!(
                        ErrorKind::MismatchedInput,
                        "File format version mismatch",
                        format!("first file is version {reference}\nfile {path} is version {version}")
                    );
                }

                let outcome = self.registry.merge(&schema, self.config.match_mode);
                if !outcome.is_compatible() {
                    bail!(
                        ErrorKind::MismatchedInput,
                        "Input is incompatible with the merged schema",
                        format!("file {path}\n{}", outcome.diagnostic())
                    );
                }
            }
        }

        let added = self
            .provenance
            .absorb(&file.provenance()?)
            .map_err(|err| {
                merge_error!(
                    ErrorKind::MismatchedInput,
                    "Input provenance is inconsistent",
                    format!("file {path}: {}", err.detail().unwrap_or_default()),
                    source: err
                )
            })?;
        debug!(file = %path, records = added, "absorbed provenance");

        // The output is created by the first accepted input that holds a row group.
        if file.row_groups().next().is_none() {
            info!(file = %path, "merged input file without row groups");
            return Ok(0);
        }
        if self.output.is_none() {
            self.open_output(output, branch_names)?;
        }
        let Some(open) = self.output.as_mut() else {
            bail!(ErrorKind::InvalidState, "Output is not open");
        };

        let mut events = 0;
        for group in RowGroupKind::ALL {
            if !file.has_row_group(group) {
                continue;
            }

            let appended = open.accumulator.append(group, file.row_group(group)?)?;
            debug!(file = %path, %group, rows = appended, "streamed row group");

            if group == RowGroupKind::Events {
                events = appended;
            }
        }

        info!(file = %path, events, "merged input file");

        Ok(events)
    }

    fn open_output(&mut self, output: &str, branch_names: &[String]) -> MergeResult<()> {
        let target = self
            .catalog
            .resolve_output(output, self.config.logical_output.as_deref())?;
        let accumulator = OutputAccumulator::create(&target.physical_path)?;
        let token = self.report.output_opened(
            &target.physical_path,
            &target.logical_name,
            &target.catalog_url,
            &target.file_identifier,
            branch_names,
        )?;

        info!(
            output = %target.physical_path.display(),
            file_identifier = %target.file_identifier,
            "opened output"
        );

        self.output = Some(OpenOutput {
            accumulator,
            target,
            token,
        });

        Ok(())
    }

    /// Writes the consolidated metadata and derived structures, then closes the output.
    fn finalize(&mut self) -> MergeResult<MergeSummary> {
        let Some(open) = self.output.take() else {
            bail!(
                ErrorKind::EmptyMerge,
                "No input file could be merged",
                format!("{} inputs skipped", self.inputs_skipped)
            );
        };

        self.state = MergeState::Finalizing;

        let metadata = FileMetadata {
            format_version: self.version,
            file_identifier: Some(open.target.file_identifier),
            schema: Some(self.registry.clone()),
            provenance: Some(self.provenance.clone()),
        };
        let finalized =
            open.accumulator
                .finalize(&metadata, &mut self.report, open.token, &self.input_tokens)?;

        self.catalog.register_output(&open.target)?;
        self.state = MergeState::Done;

        let summary = MergeSummary {
            output_path: finalized.path,
            logical_name: open.target.logical_name,
            file_identifier: open.target.file_identifier,
            inputs_merged: self.input_tokens.len(),
            inputs_skipped: self.inputs_skipped,
            events_written: finalized
                .groups
                .get(&RowGroupKind::Events)
                .copied()
                .unwrap_or(0),
            rows_written: finalized.groups,
            intervals_reported: finalized.intervals_reported,
        };

        info!(
            output = %summary.output_path.display(),
            inputs = summary.inputs_merged,
            skipped = summary.inputs_skipped,
            events = summary.events_written,
            "merge completed"
        );

        Ok(summary)
    }
}
