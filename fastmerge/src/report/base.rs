use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MergeResult;
use crate::types::FileIdentifier;

/// Label identifying the tool in every opened-file record.
pub const REPORT_SOURCE: &str = "FastMerge";

/// Label identifying the producing module in every opened-file record.
pub const REPORT_MODULE_LABEL: &str = "EdmFastMerge";

/// Opaque handle issued when a file is reported as opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportToken(u64);

impl ReportToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReportToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the job report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    InputOpened {
        token: ReportToken,
        path: String,
        logical_name: String,
        catalog_url: String,
        branch_names: Vec<String>,
        source: String,
        module_label: String,
    },
    InputSkipped {
        path: String,
        logical_name: String,
    },
    InputClosed {
        token: ReportToken,
        rows: u64,
    },
    OutputOpened {
        token: ReportToken,
        path: String,
        logical_name: String,
        catalog_url: String,
        file_identifier: FileIdentifier,
        branch_names: Vec<String>,
        source: String,
        module_label: String,
    },
    OutputClosed {
        token: ReportToken,
        rows: u64,
        contributing: Vec<ReportToken>,
    },
    IntervalDiscovered {
        run: u64,
        lumi: u64,
    },
}

/// Receives the externally observable lifecycle of a merge.
///
/// Implementations only decide where events go: they issue tokens and persist each
/// [`ReportEvent`]. The provided methods build the events, and the merge calls them synchronously
/// in the order the lifecycle happens.
pub trait ReportSink {
    /// Issues the next token.
    fn next_token(&mut self) -> ReportToken;

    /// Persists one event.
    fn emit(&mut self, event: ReportEvent) -> MergeResult<()>;

    /// Reports an input file as opened and returns its token.
    fn input_opened(
        &mut self,
        path: &Path,
        logical_name: &str,
        catalog_url: &str,
        branch_names: &[String],
    ) -> MergeResult<ReportToken> {
        let token = self.next_token();
        self.emit(ReportEvent::InputOpened {
            token,
            path: path.display().to_string(),
            logical_name: logical_name.to_string(),
            catalog_url: catalog_url.to_string(),
            branch_names: branch_names.to_vec(),
            source: REPORT_SOURCE.to_string(),
            module_label: REPORT_MODULE_LABEL.to_string(),
        })?;

        Ok(token)
    }

    /// Reports an input that could not be opened and was skipped.
    fn input_skipped(&mut self, path: &str, logical_name: &str) -> MergeResult<()> {
        self.emit(ReportEvent::InputSkipped {
            path: path.to_string(),
            logical_name: logical_name.to_string(),
        })
    }

    /// Reports an opened input as closed after `rows` event rows were read from it.
    fn input_closed(&mut self, token: ReportToken, rows: u64) -> MergeResult<()> {
        self.emit(ReportEvent::InputClosed { token, rows })
    }

    /// Reports the output file as opened and returns its token.
    fn output_opened(
        &mut self,
        path: &Path,
        logical_name: &str,
        catalog_url: &str,
        file_identifier: &FileIdentifier,
        branch_names: &[String],
    ) -> MergeResult<ReportToken> {
        let token = self.next_token();
        self.emit(ReportEvent::OutputOpened {
            token,
            path: path.display().to_string(),
            logical_name: logical_name.to_string(),
            catalog_url: catalog_url.to_string(),
            file_identifier: *file_identifier,
            branch_names: branch_names.to_vec(),
            source: REPORT_SOURCE.to_string(),
            module_label: REPORT_MODULE_LABEL.to_string(),
        })?;

        Ok(token)
    }

    /// Reports the output as closed with its event-row total and contributing inputs.
    fn output_closed(
        &mut self,
        token: ReportToken,
        rows: u64,
        contributing: &[ReportToken],
    ) -> MergeResult<()> {
        self.emit(ReportEvent::OutputClosed {
            token,
            rows,
            contributing: contributing.to_vec(),
        })
    }

    /// Reports a `(run, lumi)` interval found in the merged output.
    fn interval_discovered(&mut self, run: u64, lumi: u64) -> MergeResult<()> {
        self.emit(ReportEvent::IntervalDiscovered { run, lumi })
    }
}

impl<R: ReportSink + ?Sized> ReportSink for &mut R {
    fn next_token(&mut self) -> ReportToken {
        (**self).next_token()
    }

    fn emit(&mut self, event: ReportEvent) -> MergeResult<()> {
        (**self).emit(event)
    }
}

impl<R: ReportSink + ?Sized> ReportSink for Box<R> {
    fn next_token(&mut self) -> ReportToken {
        (**self).next_token()
    }

    fn emit(&mut self, event: ReportEvent) -> MergeResult<()> {
        (**self).emit(event)
    }
}
