use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::ValidationError;

/// Settings that control how a merge treats its inputs and where it reports.
///
/// Every field has a default so an empty configuration is valid. The binary overlays its
/// command-line flags on top of these values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct MergeSettings {
    /// Require every branch to carry a single, identical configuration id across inputs.
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Skip inputs that cannot be opened instead of aborting the merge.
    #[serde(default)]
    pub skip_missing: bool,
    /// Silence open diagnostics for inputs that fail to open.
    ///
    /// When unset it follows `skip_missing`.
    #[serde(default)]
    pub suppress_open_diagnostics: Option<bool>,
    /// Catalog used to resolve logical input names.
    #[serde(default)]
    pub input_catalog: Option<String>,
    /// Catalog the finalized output is registered in.
    #[serde(default)]
    pub output_catalog: Option<String>,
    /// Destination of the JSON-lines job report.
    #[serde(default)]
    pub job_report: Option<PathBuf>,
}

impl MergeSettings {
    /// Default strictness used when nothing else is configured.
    pub const DEFAULT_STRICT: bool = true;

    /// Returns whether open failures should be logged quietly.
    pub fn suppress_open_diagnostics(&self) -> bool {
        self.suppress_open_diagnostics.unwrap_or(self.skip_missing)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if matches!(self.input_catalog.as_deref(), Some("")) {
            return Err(ValidationError::EmptyValue("input_catalog"));
        }

        if matches!(self.output_catalog.as_deref(), Some("")) {
            return Err(ValidationError::EmptyValue("output_catalog"));
        }

        if self
            .job_report
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ValidationError::EmptyValue("job_report"));
        }

        Ok(())
    }
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            strict: default_strict(),
            skip_missing: false,
            suppress_open_diagnostics: None,
            input_catalog: None,
            output_catalog: None,
            job_report: None,
        }
    }
}

impl Config for MergeSettings {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

fn default_strict() -> bool {
    MergeSettings::DEFAULT_STRICT
}
