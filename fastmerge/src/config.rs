//! Runtime configuration of a merge.

use fastmerge_config::shared::MergeSettings;

use crate::reader::OpenOptions;
use crate::schema::MatchMode;

/// Configuration consumed by [`crate::MergeDriver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergerConfig {
    /// Name of the output file. A merge without one fails before any input is touched.
    pub output: Option<String>,

    /// Logical name the output is reported and registered under.
    pub logical_output: Option<String>,

    /// How strictly branch provenance is compared across inputs.
    pub match_mode: MatchMode,

    /// Report and skip inputs that cannot be opened instead of aborting.
    pub skip_missing: bool,

    /// Log open failures at debug level instead of warn.
    pub suppress_open_diagnostics: bool,
}

impl MergerConfig {
    /// Creates a strict configuration writing to `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }

    /// Creates a configuration from loaded settings.
    pub fn from_settings(output: Option<String>, settings: &MergeSettings) -> Self {
        let match_mode = if settings.strict {
            MatchMode::Strict
        } else {
            MatchMode::Permissive
        };

        Self {
            output,
            logical_output: None,
            match_mode,
            skip_missing: settings.skip_missing,
            suppress_open_diagnostics: settings.suppress_open_diagnostics(),
        }
    }

    /// Sets the logical output name.
    pub fn with_logical_output(mut self, logical_output: Option<String>) -> Self {
        self.logical_output = logical_output;
        self
    }

    /// Sets the match mode.
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Sets whether unreadable inputs are skipped.
    ///
    /// Open diagnostics follow the same setting; use
    /// [`MergerConfig::with_suppress_open_diagnostics`] afterwards to override them.
    pub fn with_skip_missing(mut self, skip_missing: bool) -> Self {
        self.skip_missing = skip_missing;
        self.suppress_open_diagnostics = skip_missing;
        self
    }

    /// Sets whether open failures are logged quietly.
    pub fn with_suppress_open_diagnostics(mut self, suppress: bool) -> Self {
        self.suppress_open_diagnostics = suppress;
        self
    }

    /// Returns the options every input is opened with.
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            skip_on_failure: self.skip_missing,
            suppress_diagnostics: self.suppress_open_diagnostics,
        }
    }
}
