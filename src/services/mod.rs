//! Services - collection pipeline logic
//!
//! This module contains the pipeline services:
//! - `recorder` - Bounded capture loop for a single exercise
//! - `orchestrator` - Session state machine from consent to persistence

pub mod orchestrator;
pub mod recorder;

// Re-export commonly used types
pub use orchestrator::{Orchestrator, SessionState, SessionSummary};
pub use recorder::{ExerciseRecorder, ExerciseRecording};
