use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An optional string setting was present but empty.
    #[error("`{0}` cannot be empty when set")]
    EmptyValue(&'static str),
}
