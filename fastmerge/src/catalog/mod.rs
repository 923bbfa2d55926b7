//! Resolution of input names to physical files and registration of the merged output.

mod base;
mod local;

pub use base::{Catalog, CatalogItem, OutputTarget};
pub use local::{CatalogEntry, CatalogFile, LocalCatalog, PHYSICAL_NAME_PREFIX};
