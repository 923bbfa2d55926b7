//! Value types shared by every merge component.

mod branch;
mod file_id;
mod row_group;
mod version;

pub use branch::{Branch, BranchType};
pub use file_id::FileIdentifier;
pub use row_group::{AUX_COLUMN, Row, RowGroupKind};
pub use version::FileFormatVersion;
