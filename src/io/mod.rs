//! IO modules - external collaborators of the pipeline
//!
//! This module contains all external IO operations:
//! - `capture` - Capture devices (face-mesh sidecar, replay file) and scoped acquisition
//! - `tracker` - Landmark tracker decoding frames into faces
//! - `preview` - Operator progress overlay and stop-key polling
//! - `operator` - Line-based operator prompts
//! - `writer` - Session record persistence
//! - `scripted` - Scripted collaborators for running sessions without hardware

pub mod capture;
pub mod operator;
pub mod preview;
pub mod scripted;
pub mod tracker;
pub mod writer;

// Re-export commonly used types
pub use capture::{CaptureDevice, Frame, OpenDevice, ReplayCamera, SidecarCamera};
pub use operator::{ConsoleOperator, Operator};
pub use preview::{OpenPreview, Overlay, PreviewSurface, TerminalPreview};
pub use scripted::{HeadlessPreview, ScriptedCamera, ScriptedOperator, ScriptedTracker};
pub use tracker::{FaceMeshJsonTracker, LandmarkTracker};
pub use writer::{read_record, SessionWriter};
