use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogItem, OutputTarget};
use crate::error::{ErrorKind, MergeResult};
use crate::merge_error;
use crate::types::FileIdentifier;

/// Prefix marking a name as a physical path rather than a logical file name.
pub const PHYSICAL_NAME_PREFIX: &str = "file:";

/// One entry of a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub lfn: String,
    pub pfn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
}

/// On-disk catalog: a JSON document listing logical to physical name mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub files: Vec<CatalogEntry>,
}

impl CatalogFile {
    /// Loads the catalog at `path`.
    pub fn load(path: &Path) -> MergeResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            merge_error!(
                ErrorKind::ConfigError,
                "File catalog could not be read",
                format!("{}: {err}", path.display()),
                source: err
            )
        })?;

        serde_json::from_str(&contents).map_err(|err| {
            merge_error!(
                ErrorKind::ConfigError,
                "File catalog is malformed",
                format!("{}: {err}", path.display()),
                source: err
            )
        })
    }

    /// Loads the catalog at `path`, or an empty catalog if the file does not exist yet.
    pub fn load_or_default(path: &Path) -> MergeResult<Self> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the physical name registered for `lfn`.
    pub fn lookup(&self, lfn: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|entry| entry.lfn == lfn)
            .map(|entry| entry.pfn.as_str())
    }

    /// Adds `entry`, replacing any entry with the same logical name.
    pub fn upsert(&mut self, entry: CatalogEntry) {
        self.files.retain(|existing| existing.lfn != entry.lfn);
        self.files.push(entry);
    }

    pub fn save(&self, path: &Path) -> MergeResult<()> {
        let encoded = serde_json::to_string_pretty(self)?;
        fs::write(path, encoded)?;

        Ok(())
    }
}

/// Catalog backed by local JSON catalog files.
///
/// Names starting with [`PHYSICAL_NAME_PREFIX`] are physical paths. Other names are logical
/// names looked up in the input catalog; without an input catalog they are used as paths.
#[derive(Debug, Default)]
pub struct LocalCatalog {
    input_url: String,
    input: Option<CatalogFile>,
    output_url: Option<String>,
}

impl LocalCatalog {
    /// Creates a catalog that treats every name as a local path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog from optional input and output catalog identifiers.
    ///
    /// The input catalog is loaded eagerly. The output catalog is only touched when an output
    /// is registered.
    pub fn open(input_url: Option<&str>, output_url: Option<&str>) -> MergeResult<Self> {
        let input = match input_url {
            Some(url) => Some(CatalogFile::load(&catalog_path(url))?),
            None => None,
        };

        Ok(Self {
            input_url: input_url.unwrap_or_default().to_string(),
            input,
            output_url: output_url.map(ToString::to_string),
        })
    }

    fn resolve_input(&self, name: &str) -> CatalogItem {
        if let Some(path) = name.strip_prefix(PHYSICAL_NAME_PREFIX) {
            return CatalogItem {
                physical_path: Some(PathBuf::from(path)),
                logical_name: String::new(),
            };
        }

        match &self.input {
            Some(catalog) => {
                let physical_path = catalog.lookup(name).map(PathBuf::from);
                debug!(lfn = name, resolved = physical_path.is_some(), "resolved logical name");

                CatalogItem {
                    physical_path,
                    logical_name: name.to_string(),
                }
            }
            None => CatalogItem {
                physical_path: Some(PathBuf::from(name)),
                logical_name: String::new(),
            },
        }
    }
}

impl Catalog for LocalCatalog {
    fn url(&self) -> &str {
        &self.input_url
    }

    fn resolve_inputs(&self, names: &[String]) -> MergeResult<Vec<CatalogItem>> {
        Ok(names.iter().map(|name| self.resolve_input(name)).collect())
    }

    fn resolve_output(
        &mut self,
        name: &str,
        logical_name: Option<&str>,
    ) -> MergeResult<OutputTarget> {
        let physical = name.strip_prefix(PHYSICAL_NAME_PREFIX).unwrap_or(name);

        Ok(OutputTarget {
            physical_path: PathBuf::from(physical),
            logical_name: logical_name.unwrap_or_default().to_string(),
            catalog_url: self.output_url.clone().unwrap_or_default(),
            file_identifier: FileIdentifier::generate(),
        })
    }

    fn register_output(&mut self, target: &OutputTarget) -> MergeResult<()> {
        let Some(url) = &self.output_url else {
            return Ok(());
        };
        if target.logical_name.is_empty() {
            return Ok(());
        }

        let path = catalog_path(url);
        let mut catalog = CatalogFile::load_or_default(&path)?;
        catalog.upsert(CatalogEntry {
            lfn: target.logical_name.clone(),
            pfn: target.physical_path.display().to_string(),
            guid: Some(target.file_identifier.to_string()),
        });
        catalog.save(&path)?;

        info!(catalog = %path.display(), lfn = %target.logical_name, "registered output");

        Ok(())
    }
}

fn catalog_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix(PHYSICAL_NAME_PREFIX).unwrap_or(url))
}
