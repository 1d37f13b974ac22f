//! Error taxonomy for the collection pipeline
//!
//! Per-frame and per-exercise errors are absorbed by the recorder and
//! orchestrator; only storage and operator-input failures end a session.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("capture device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("preview unavailable: {reason}")]
    PreviewUnavailable { reason: String },

    #[error("frame read failed: {0}")]
    FrameRead(String),

    #[error("no face detected")]
    NoFaceDetected,

    #[error("malformed landmarks: {reason}")]
    MalformedLandmarks { reason: String },

    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize session record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operator input failed: {0}")]
    OperatorInput(String),

    #[error("invalid session record {}: {reason}", .path.display())]
    InvalidRecord { path: PathBuf, reason: String },
}

impl CollectError {
    /// Whether this error ends the whole session rather than a frame or exercise
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CollectError::StorageUnavailable { .. }
                | CollectError::Serialization(_)
                | CollectError::OperatorInput(_)
        )
    }

    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CollectError::StorageUnavailable { path: path.into(), source }
    }
}

pub type CollectResult<T> = Result<T, CollectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!CollectError::NoFaceDetected.is_fatal());
        assert!(!CollectError::DeviceUnavailable { reason: "busy".into() }.is_fatal());
        assert!(!CollectError::FrameRead("eof".into()).is_fatal());
        assert!(!CollectError::PreviewUnavailable { reason: "not a tty".into() }.is_fatal());
        assert!(CollectError::storage("/x", io::Error::other("denied")).is_fatal());
        assert!(CollectError::OperatorInput("stdin closed".into()).is_fatal());
    }

    #[test]
    fn test_storage_message_names_path() {
        let err = CollectError::storage(
            "/readonly/collected_data",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/readonly/collected_data"));
        assert!(msg.contains("permission denied"));
    }
}
