//! Error types shared by every backend

use thiserror::Error;

/// Result type for all contract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced through the capability contract.
///
/// Backends wrap their underlying failures with enough context to diagnose
/// (operation, sheet, range) but never change the kind: a missing sheet is
/// `NotFound` no matter which backend noticed, and an operation a backend
/// cannot express is `Unsupported`, never a silent no-op.
#[derive(Debug, Error)]
pub enum Error {
    /// Sheet, table, or document not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not implemented by the active backend
    #[error("Operation not supported by the {backend} backend: {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// Malformed range, validation, or formatting input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying format library or automation interface failed
    #[error("Backend failure: {0}")]
    BackendFailure(String),

    /// An automation resource could not be obtained or released
    #[error("Resource failure: {0}")]
    ResourceFailure(String),
}

impl Error {
    /// Create a NotFound error
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Error::NotFound(what.into())
    }

    /// Create an Unsupported error for the given backend/operation pair
    pub fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        Error::Unsupported { backend, operation }
    }

    /// Create an InvalidArgument error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Wrap an underlying backend failure with operation context
    pub fn backend<E: std::fmt::Display>(operation: &str, err: E) -> Self {
        Error::BackendFailure(format!("{operation}: {err}"))
    }

    /// Wrap an automation resource failure with context
    pub fn resource<E: std::fmt::Display>(context: &str, err: E) -> Self {
        Error::ResourceFailure(format!("{context}: {err}"))
    }

    /// True if this is the typed "unsupported by this backend" error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unsupported("file", "CapturePicture");
        assert_eq!(
            err.to_string(),
            "Operation not supported by the file backend: CapturePicture"
        );

        let err = Error::not_found("sheet: Data");
        assert_eq!(err.to_string(), "Not found: sheet: Data");
    }

    #[test]
    fn test_backend_context() {
        let err = Error::backend("SetValue A1", "disk full");
        assert_eq!(err.to_string(), "Backend failure: SetValue A1: disk full");
        assert!(!err.is_unsupported());
    }
}
