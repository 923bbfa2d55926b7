use tracing::info;

use crate::error::MergeResult;
use crate::report::{ReportEvent, ReportSink, ReportToken};

/// Report sink that emits every event through `tracing`.
///
/// Used when no job-report destination is configured.
#[derive(Debug, Default)]
pub struct LogReport {
    issued: u64,
}

impl LogReport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for LogReport {
    fn next_token(&mut self) -> ReportToken {
        self.issued += 1;
        ReportToken::new(self.issued)
    }

    fn emit(&mut self, event: ReportEvent) -> MergeResult<()> {
        match event {
            ReportEvent::InputOpened {
                token,
                path,
                logical_name,
                branch_names,
                ..
            } => {
                info!(%token, %path, %logical_name, branches = branch_names.len(), "input opened");
            }
            ReportEvent::InputSkipped { path, logical_name } => {
                info!(%path, %logical_name, "input skipped");
            }
            ReportEvent::InputClosed { token, rows } => {
                info!(%token, rows, "input closed");
            }
            ReportEvent::OutputOpened {
                token,
                path,
                logical_name,
                file_identifier,
                ..
            } => {
                info!(%token, %path, %logical_name, %file_identifier, "output opened");
            }
            ReportEvent::OutputClosed {
                token,
                rows,
                contributing,
            } => {
                info!(%token, rows, inputs = contributing.len(), "output closed");
            }
            ReportEvent::IntervalDiscovered { run, lumi } => {
                info!(run, lumi, "interval discovered");
            }
        }

        Ok(())
    }
}
