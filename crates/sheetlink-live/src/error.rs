//! Error types for the live-session backend.

use thiserror::Error;

/// Errors from the bridge process and its transport.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to spawn bridge process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Bridge process not running")]
    NotRunning,

    #[error("Failed to send command to bridge: {0}")]
    SendFailed(String),

    #[error("Failed to read response from bridge: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Bridge returned error: {0}")]
    Bridge(String),

    #[error("Response id {got} does not match request id {sent}")]
    IdMismatch { sent: u64, got: u64 },

    #[error("Unexpected response data")]
    UnexpectedResponse,

    #[error("WINE not found. Install WINE and ensure 'wine' is in PATH.")]
    WineNotFound,

    #[error("Bridge executable not found at: {0}")]
    BridgeExeNotFound(String),

    #[error("No open document matches {0}")]
    NoMatch(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Failures keep their contract kind: a document the host does not have
/// open is `NotFound`, an error the host itself reported is
/// `BackendFailure`, and anything that broke before reaching the host
/// (spawn, pipes, JSON) is `ResourceFailure`.
impl From<BridgeError> for sheetlink_core::Error {
    fn from(err: BridgeError) -> Self {
        use sheetlink_core::Error;
        match err {
            BridgeError::NoMatch(what) => Error::NotFound(what),
            BridgeError::Bridge(message) => Error::BackendFailure(message),
            other => Error::ResourceFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_kind_mapping() {
        let err: sheetlink_core::Error = BridgeError::NoMatch("book.xlsx".to_string()).into();
        assert!(matches!(err, sheetlink_core::Error::NotFound(_)));

        let err: sheetlink_core::Error = BridgeError::Bridge("range failed".to_string()).into();
        assert!(matches!(err, sheetlink_core::Error::BackendFailure(_)));

        let err: sheetlink_core::Error = BridgeError::NotRunning.into();
        assert!(matches!(err, sheetlink_core::Error::ResourceFailure(_)));
    }
}
