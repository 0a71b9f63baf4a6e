//! Error types for the orchestration core.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error taxonomy.
///
/// `NotFound` and `Validation` propagate synchronously to the caller at
/// enqueue time. Adapter failures are classified separately in the device
/// layer and terminate individual jobs without crossing this boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown device, group, or job.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed command or payload, rejected before any store write.
    #[error("validation error: {0}")]
    Validation(String),

    /// Store unavailable or a store-level failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unexpected failure inside the orchestration core.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short classification label for logs and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Validation(_) => "validation",
            Error::Storage(_) => "storage",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("serialization: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(Error::NotFound("device x".into()).kind(), "not_found");
        assert_eq!(Error::Validation("bad payload".into()).kind(), "validation");
        assert_eq!(Error::Storage("down".into()).kind(), "storage");
        assert_eq!(Error::Internal("boom".into()).kind(), "internal");
    }

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("device dev-1 not found".into());
        assert_eq!(err.to_string(), "not found: device dev-1 not found");
    }
}
