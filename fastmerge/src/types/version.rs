use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer compatibility tag carried by every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFormatVersion(pub u32);

impl FileFormatVersion {
    /// Oldest version the merge accepts.
    pub const MINIMUM_SUPPORTED: FileFormatVersion = FileFormatVersion(1);

    /// Returns true if inputs of this version can be merged.
    pub fn is_supported(&self) -> bool {
        *self >= Self::MINIMUM_SUPPORTED
    }
}

impl fmt::Display for FileFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_zero_is_unsupported() {
        assert!(!FileFormatVersion(0).is_supported());
        assert!(FileFormatVersion(1).is_supported());
        assert!(FileFormatVersion(7).is_supported());
    }
}
