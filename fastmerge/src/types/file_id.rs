use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique token minted once per output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileIdentifier(Uuid);

impl FileIdentifier {
    /// Mints a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for FileIdentifier {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated().to_string().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identifiers_are_distinct() {
        assert_ne!(FileIdentifier::generate(), FileIdentifier::generate());
    }

    #[test]
    fn test_display_is_uppercase_hyphenated() {
        let id = FileIdentifier::from(Uuid::nil());

        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.as_uuid(), &Uuid::nil());
    }
}
