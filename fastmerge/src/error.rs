//! Error types and result definitions for merge operations.
//!
//! Every fatal condition of a merge is a [`MergeError`] carrying an [`ErrorKind`], a static
//! description, an optional dynamic detail naming the offending file or branch, an optional
//! source error, and the location where it was raised.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for merge operations using [`MergeError`] as the error type.
pub type MergeResult<T> = Result<T, MergeError>;

/// Categories of errors that can occur during a merge.
///
/// The first six kinds are the fatal merge conditions. The remaining kinds classify failures
/// of the surrounding plumbing.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
pub enum ErrorKind {
    // Merge Errors
    BadArgument,
    OpenError,
    CorruptMetadata,
    MismatchedInput,
    IndexBuildError,
    EmptyMerge,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Configuration & State Errors
    ConfigError,
    InvalidState,
}

/// Main error type for merge operations.
#[derive(Debug, Clone)]
pub struct MergeError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

impl MergeError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`MergeError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        MergeError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

impl PartialEq for MergeError {
    fn eq(&self, other: &MergeError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        write_detail(self.detail.as_deref(), f, 1)
    }
}

impl error::Error for MergeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    if let Some(detail) = detail {
        let indent_str = "  ".repeat(indent);
        if detail.trim().is_empty() {
            write!(f, "\n{indent_str}Detail: <empty>")?;
        } else {
            write!(f, "\n{indent_str}Detail:")?;
            for line in detail.lines() {
                if line.trim().is_empty() {
                    write!(f, "\n{indent_str}  ")?;
                } else {
                    write!(f, "\n{indent_str}  {line}")?;
                }
            }
        }
    }

    Ok(())
}

/// Creates a [`MergeError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for MergeError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> MergeError {
        MergeError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`MergeError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for MergeError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> MergeError {
        MergeError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`MergeError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for MergeError {
    #[track_caller]
    fn from(err: std::io::Error) -> MergeError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MergeError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`MergeError`] with the appropriate error kind.
impl From<serde_json::Error> for MergeError {
    #[track_caller]
    fn from(err: serde_json::Error) -> MergeError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        MergeError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`fastmerge_config::LoadConfigError`] to [`MergeError`] with [`ErrorKind::ConfigError`].
impl From<fastmerge_config::LoadConfigError> for MergeError {
    #[track_caller]
    fn from(err: fastmerge_config::LoadConfigError) -> MergeError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MergeError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Loading settings failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`fastmerge_config::shared::ValidationError`] to [`MergeError`] with
/// [`ErrorKind::ConfigError`].
impl From<fastmerge_config::shared::ValidationError> for MergeError {
    #[track_caller]
    fn from(err: fastmerge_config::shared::ValidationError) -> MergeError {
        let detail = err.to_string();
        let source = Arc::new(err);
        MergeError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Settings are invalid"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::{bail, merge_error};

    #[test]
    fn test_display_includes_kind_location_and_detail() {
        let err = merge_error!(
            ErrorKind::MismatchedInput,
            "Input is incompatible with the reference schema",
            "file b.fm\nbranch x"
        );
        let rendered = err.to_string();

        assert!(rendered.starts_with("[MismatchedInput] Input is incompatible"));
        assert!(rendered.contains(&format!("{}:", file!())));
        assert!(rendered.ends_with("\n  Detail:\n    file b.fm\n    branch x"));
    }

    #[test]
    fn test_empty_detail_is_marked() {
        let err = merge_error!(ErrorKind::OpenError, "Input could not be opened", "  ");

        assert!(err.to_string().ends_with("Detail: <empty>"));
    }

    #[test]
    fn test_io_errors_keep_their_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = MergeError::from(io);

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert_eq!(err.detail(), Some("gone"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_json_syntax_errors_are_deserialization_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = MergeError::from(json_err);

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }

    #[test]
    fn test_bail_returns_early() {
        fn fails(flag: bool) -> MergeResult<u32> {
            if flag {
                bail!(ErrorKind::EmptyMerge, "No input contributed any rows");
            }
            Ok(1)
        }

        assert_eq!(fails(false).unwrap(), 1);
        assert_eq!(fails(true).unwrap_err().kind(), ErrorKind::EmptyMerge);
    }

    #[test]
    fn test_errors_compare_by_kind() {
        let a = merge_error!(ErrorKind::OpenError, "a");
        let b = merge_error!(ErrorKind::OpenError, "b", "detail");
        let c = merge_error!(ErrorKind::BadArgument, "a");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
