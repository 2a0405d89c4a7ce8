//! Error types for the file backend

use thiserror::Error;

/// Errors that can occur while reading or writing the container
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Missing required part: {0}")]
    MissingPart(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Core(#[from] sheetlink_core::Error),
}

/// Result type for file backend operations
pub type FileResult<T> = std::result::Result<T, FileError>;

impl From<FileError> for sheetlink_core::Error {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Core(e) => e,
            FileError::Io(e) => sheetlink_core::Error::ResourceFailure(e.to_string()),
            other => sheetlink_core::Error::BackendFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_passes_through() {
        let err = FileError::Core(sheetlink_core::Error::not_found("sheet Missing"));
        let core: sheetlink_core::Error = err.into();
        assert!(matches!(core, sheetlink_core::Error::NotFound(_)));
    }

    #[test]
    fn test_io_becomes_resource_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let core: sheetlink_core::Error = FileError::Io(io).into();
        assert!(matches!(core, sheetlink_core::Error::ResourceFailure(_)));
    }
}
