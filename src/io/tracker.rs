//! Landmark tracking - frame payload to detected faces

use crate::domain::types::FaceLandmarks;
use crate::infra::error::{CollectError, CollectResult};
use crate::io::capture::Frame;
use serde::Deserialize;

/// Facial landmark detection over a captured frame
pub trait LandmarkTracker {
    /// Detected faces in tracker order; `NoFaceDetected` when none is visible
    fn detect(&mut self, frame: &Frame) -> CollectResult<Vec<FaceLandmarks>>;
}

#[derive(Debug, Deserialize)]
struct FaceMeshFrame {
    #[serde(default)]
    faces: Option<Vec<FaceLandmarks>>,
}

/// Decodes face-mesh JSON frames emitted by the sidecar tracker
#[derive(Debug, Default)]
pub struct FaceMeshJsonTracker;

impl FaceMeshJsonTracker {
    pub fn new() -> Self {
        Self
    }
}

impl LandmarkTracker for FaceMeshJsonTracker {
    fn detect(&mut self, frame: &Frame) -> CollectResult<Vec<FaceLandmarks>> {
        let parsed: FaceMeshFrame = serde_json::from_str(&frame.payload).map_err(|e| {
            CollectError::MalformedLandmarks { reason: format!("frame {}: {}", frame.index, e) }
        })?;
        match parsed.faces {
            Some(faces) if !faces.is_empty() => Ok(faces),
            _ => Err(CollectError::NoFaceDetected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &str) -> Frame {
        Frame { index: 7, payload: payload.to_string() }
    }

    #[test]
    fn test_detect_faces() {
        let mut tracker = FaceMeshJsonTracker::new();
        let faces = tracker
            .detect(&frame(r#"{"frame":7,"faces":[[{"x":0.1,"y":0.2,"z":-0.01},{"x":0.3,"y":0.4}]]}"#))
            .unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].len(), 2);
        assert_eq!(faces[0][1].x, 0.3);
        assert_eq!(faces[0][1].z, 0.0);
    }

    #[test]
    fn test_missing_null_or_empty_faces_is_no_face() {
        let mut tracker = FaceMeshJsonTracker::new();
        for payload in [r#"{"frame":7}"#, r#"{"frame":7,"faces":null}"#, r#"{"frame":7,"faces":[]}"#] {
            assert!(matches!(tracker.detect(&frame(payload)), Err(CollectError::NoFaceDetected)));
        }
    }

    #[test]
    fn test_garbage_is_malformed() {
        let mut tracker = FaceMeshJsonTracker::new();
        let err = tracker.detect(&frame("not json")).unwrap_err();
        match err {
            CollectError::MalformedLandmarks { reason } => assert!(reason.starts_with("frame 7")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(tracker.detect(&frame(r#"{"faces":[[{"x":"left","y":0.2}]]}"#)).is_err());
    }
}
