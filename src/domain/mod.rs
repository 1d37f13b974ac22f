//! Domain models - data model and pure feature logic
//!
//! This module contains the canonical data types used throughout the system:
//! - `types` - Exercise catalog, landmarks, feature vectors, participants, samples
//! - `landmarks` - Face-mesh index contract of the external tracker
//! - `features` - Landmark set to feature vector extraction
//! - `session` - Session aggregate and the persisted record schema

pub mod features;
pub mod landmarks;
pub mod session;
pub mod types;

// Re-export commonly used types at module level
pub use features::{extract_features, ExtractError};
pub use session::{ExerciseRun, RecordingEnd, Session, SessionRecord};
pub use types::{Exercise, FaceLandmarks, FeatureVector, Landmark, ParticipantInfo, Sample};
