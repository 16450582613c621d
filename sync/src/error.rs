//! Unified error handling for the sync runtime.

/// Runtime error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] favorites_engine::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for the runtime.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(SyncError::NotAuthenticated.to_string(), "Not authenticated");
        assert_eq!(
            SyncError::Remote("503 Service Unavailable".into()).to_string(),
            "Remote store error: 503 Service Unavailable"
        );

        let engine: SyncError = favorites_engine::Error::UnknownCategory("event".into()).into();
        assert_eq!(engine.to_string(), "Engine error: unknown category: event");
    }
}
