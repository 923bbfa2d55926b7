use std::path::PathBuf;

use crate::error::MergeResult;
use crate::types::FileIdentifier;

/// One resolved input.
///
/// `physical_path` is `None` when a logical name could not be resolved; opening such an item
/// fails unless missing inputs are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub physical_path: Option<PathBuf>,
    pub logical_name: String,
}

impl CatalogItem {
    /// Returns the name used for this item in diagnostics and reports.
    pub fn display_name(&self) -> String {
        match &self.physical_path {
            Some(path) => path.display().to_string(),
            None => self.logical_name.clone(),
        }
    }
}

/// Where the merged output goes and how it is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub physical_path: PathBuf,
    pub logical_name: String,
    pub catalog_url: String,
    pub file_identifier: FileIdentifier,
}

/// Resolves file names for a merge.
///
/// Implementations must return inputs in the order they were given.
pub trait Catalog {
    /// Returns the identifier of the input catalog, or an empty string when none is used.
    fn url(&self) -> &str;

    /// Resolves every input name, preserving order.
    fn resolve_inputs(&self, names: &[String]) -> MergeResult<Vec<CatalogItem>>;

    /// Resolves the output file and mints its identifier.
    fn resolve_output(
        &mut self,
        name: &str,
        logical_name: Option<&str>,
    ) -> MergeResult<OutputTarget>;

    /// Records a finalized output.
    ///
    /// The default implementation records nothing.
    fn register_output(&mut self, _target: &OutputTarget) -> MergeResult<()> {
        Ok(())
    }
}

impl<C: Catalog + ?Sized> Catalog for &mut C {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn resolve_inputs(&self, names: &[String]) -> MergeResult<Vec<CatalogItem>> {
        (**self).resolve_inputs(names)
    }

    fn resolve_output(
        &mut self,
        name: &str,
        logical_name: Option<&str>,
    ) -> MergeResult<OutputTarget> {
        (**self).resolve_output(name, logical_name)
    }

    fn register_output(&mut self, target: &OutputTarget) -> MergeResult<()> {
        (**self).register_output(target)
    }
}
