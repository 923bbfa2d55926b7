use crate::error::MergeResult;
use crate::report::{ReportEvent, ReportSink, ReportToken};

/// In-memory report for tests and embedding.
///
/// [`MemoryReport`] keeps every event in emission order so callers can inspect the lifecycle of a
/// merge afterwards.
#[derive(Debug, Default, Clone)]
pub struct MemoryReport {
    events: Vec<ReportEvent>,
    issued: u64,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event emitted so far.
    pub fn events(&self) -> &[ReportEvent] {
        &self.events
    }

    /// Returns the number of input-closed events.
    pub fn inputs_closed(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ReportEvent::InputClosed { .. }))
            .count()
    }

    /// Returns the `(run, lumi)` intervals reported, in emission order.
    pub fn intervals(&self) -> Vec<(u64, u64)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ReportEvent::IntervalDiscovered { run, lumi } => Some((*run, *lumi)),
                _ => None,
            })
            .collect()
    }
}

impl ReportSink for MemoryReport {
    fn next_token(&mut self) -> ReportToken {
        self.issued += 1;
        ReportToken::new(self.issued)
    }

    fn emit(&mut self, event: ReportEvent) -> MergeResult<()> {
        self.events.push(event);

        Ok(())
    }
}
