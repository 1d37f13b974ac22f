//! Scripted collaborators for driving sessions without a camera or terminal
//!
//! Used by tests and dry runs. Each collaborator hands out a shared probe so
//! callers can inspect acquire/release counts after the collaborator has been
//! moved into a recorder.

use crate::domain::landmarks::FaceLandmark;
use crate::domain::types::{Exercise, FaceLandmarks, Landmark};
use crate::infra::error::{CollectError, CollectResult};
use crate::io::capture::{CaptureDevice, Frame};
use crate::io::operator::Operator;
use crate::io::preview::{Overlay, PreviewSurface};
use crate::io::tracker::LandmarkTracker;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// What a scripted device yields for one read
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    Frame(String),
    ReadError(String),
}

/// Acquisition counters shared between a scripted collaborator and the test
#[derive(Debug, Default)]
pub struct ResourceProbe {
    opens: Cell<usize>,
    releases: Cell<usize>,
    uses: Cell<usize>,
}

impl ResourceProbe {
    pub fn opens(&self) -> usize {
        self.opens.get()
    }

    pub fn releases(&self) -> usize {
        self.releases.get()
    }

    /// Frames read (camera) or overlays rendered (preview)
    pub fn uses(&self) -> usize {
        self.uses.get()
    }

    fn bump(cell: &Cell<usize>) {
        cell.set(cell.get() + 1);
    }
}

/// Camera replaying the same script from the start on every open
pub struct ScriptedCamera {
    script: Vec<ScriptedStep>,
    cursor: Option<usize>,
    open_error: Option<String>,
    probe: Rc<ResourceProbe>,
}

impl ScriptedCamera {
    pub fn new(script: Vec<ScriptedStep>) -> Self {
        Self { script, cursor: None, open_error: None, probe: Rc::new(ResourceProbe::default()) }
    }

    /// One frame per entry, each carrying the given detected faces
    pub fn from_faces(frames: impl IntoIterator<Item = Vec<FaceLandmarks>>) -> Self {
        let script = frames
            .into_iter()
            .enumerate()
            .map(|(i, faces)| ScriptedStep::Frame(face_mesh_payload(i, &faces)))
            .collect();
        Self::new(script)
    }

    /// Camera that never opens
    pub fn unavailable(reason: &str) -> Self {
        let mut camera = Self::new(Vec::new());
        camera.open_error = Some(reason.to_string());
        camera
    }

    pub fn probe(&self) -> Rc<ResourceProbe> {
        Rc::clone(&self.probe)
    }
}

/// Full face-mesh landmark set with a plausible neutral face.
///
/// `smile` widens the mouth corners symmetrically (0.0 gives a closed,
/// zero-width mouth).
pub fn synthetic_face(smile: f64) -> FaceLandmarks {
    let mut face = vec![Landmark::new(0.5, 0.5); 468];
    let mut set = |mark: FaceLandmark, x: f64, y: f64| face[mark.index()] = Landmark::new(x, y);
    set(FaceLandmark::UpperLipCenter, 0.50, 0.70);
    set(FaceLandmark::LowerLipCenter, 0.50, 0.72);
    set(FaceLandmark::LeftMouthCorner, 0.50 - smile / 2.0, 0.71);
    set(FaceLandmark::RightMouthCorner, 0.50 + smile / 2.0, 0.71);
    set(FaceLandmark::LeftEyeTop, 0.40, 0.40);
    set(FaceLandmark::LeftEyeBottom, 0.40, 0.43);
    set(FaceLandmark::RightEyeTop, 0.60, 0.40);
    set(FaceLandmark::RightEyeBottom, 0.60, 0.43);
    set(FaceLandmark::NoseTip, 0.50, 0.55);
    set(FaceLandmark::Forehead, 0.50, 0.15);
    face
}

/// Sidecar-format frame line for a set of faces
pub fn face_mesh_payload(frame: usize, faces: &[FaceLandmarks]) -> String {
    serde_json::json!({ "frame": frame, "faces": faces }).to_string()
}

impl CaptureDevice for ScriptedCamera {
    fn name(&self) -> &str {
        "scripted"
    }

    fn open(&mut self) -> CollectResult<()> {
        ResourceProbe::bump(&self.probe.opens);
        if let Some(reason) = &self.open_error {
            return Err(CollectError::DeviceUnavailable { reason: reason.clone() });
        }
        self.cursor = Some(0);
        Ok(())
    }

    fn read_frame(&mut self) -> CollectResult<Option<Frame>> {
        let Some(cursor) = self.cursor else {
            return Err(CollectError::FrameRead("device not open".to_string()));
        };
        let Some(step) = self.script.get(cursor) else {
            return Ok(None);
        };
        self.cursor = Some(cursor + 1);
        ResourceProbe::bump(&self.probe.uses);
        match step {
            ScriptedStep::Frame(payload) => {
                Ok(Some(Frame { index: cursor as u64, payload: payload.clone() }))
            }
            ScriptedStep::ReadError(reason) => Err(CollectError::FrameRead(reason.clone())),
        }
    }

    fn release(&mut self) {
        ResourceProbe::bump(&self.probe.releases);
        self.cursor = None;
    }
}

/// What a scripted tracker reports for one frame
#[derive(Debug, Clone)]
pub enum TrackerStep {
    Faces(Vec<FaceLandmarks>),
    Malformed(String),
}

/// Tracker ignoring frame payloads and answering from a fixed script.
///
/// Once the script runs out every further frame reports `NoFaceDetected`.
pub struct ScriptedTracker {
    steps: VecDeque<TrackerStep>,
}

impl ScriptedTracker {
    pub fn new(steps: impl IntoIterator<Item = TrackerStep>) -> Self {
        Self { steps: steps.into_iter().collect() }
    }
}

impl LandmarkTracker for ScriptedTracker {
    fn detect(&mut self, frame: &Frame) -> CollectResult<Vec<FaceLandmarks>> {
        match self.steps.pop_front() {
            Some(TrackerStep::Faces(faces)) => Ok(faces),
            Some(TrackerStep::Malformed(reason)) => Err(CollectError::MalformedLandmarks {
                reason: format!("frame {}: {}", frame.index, reason),
            }),
            None => Err(CollectError::NoFaceDetected),
        }
    }
}

/// Preview that renders nowhere, optionally reporting a stop after N overlays
pub struct HeadlessPreview {
    stop_after: Option<usize>,
    fail_open: bool,
    rendered: usize,
    probe: Rc<ResourceProbe>,
}

impl HeadlessPreview {
    pub fn new() -> Self {
        Self { stop_after: None, fail_open: false, rendered: 0, probe: Rc::new(ResourceProbe::default()) }
    }

    /// Operator presses stop once `renders` overlays were shown in an exercise
    pub fn stopping_after(renders: usize) -> Self {
        Self { stop_after: Some(renders), ..Self::new() }
    }

    pub fn failing() -> Self {
        Self { fail_open: true, ..Self::new() }
    }

    pub fn probe(&self) -> Rc<ResourceProbe> {
        Rc::clone(&self.probe)
    }
}

impl Default for HeadlessPreview {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSurface for HeadlessPreview {
    fn open(&mut self, _exercise: Exercise, _budget: usize) -> CollectResult<()> {
        ResourceProbe::bump(&self.probe.opens);
        self.rendered = 0;
        if self.fail_open {
            return Err(CollectError::PreviewUnavailable { reason: "no display".to_string() });
        }
        Ok(())
    }

    fn render(&mut self, _overlay: &Overlay) {
        self.rendered += 1;
        ResourceProbe::bump(&self.probe.uses);
    }

    fn stop_requested(&mut self) -> bool {
        matches!(self.stop_after, Some(n) if self.rendered >= n)
    }

    fn close(&mut self) {
        ResourceProbe::bump(&self.probe.releases);
    }
}

/// Operator answering prompts from a fixed script; running out is an input error
pub struct ScriptedOperator {
    answers: VecDeque<String>,
    transcript: Rc<RefCell<Vec<String>>>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Everything shown to the operator, prompts and messages, in order
    pub fn transcript(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.transcript)
    }
}

impl Operator for ScriptedOperator {
    fn say(&mut self, message: &str) {
        self.transcript.borrow_mut().push(message.to_string());
    }

    fn ask(&mut self, prompt: &str) -> CollectResult<String> {
        self.transcript.borrow_mut().push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| CollectError::OperatorInput(format!("no scripted answer for '{}'", prompt)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_camera_replays_per_open() {
        let mut camera = ScriptedCamera::new(vec![
            ScriptedStep::Frame("a".into()),
            ScriptedStep::ReadError("usb reset".into()),
        ]);
        let probe = camera.probe();

        assert!(camera.read_frame().is_err());
        camera.open().unwrap();
        assert_eq!(camera.read_frame().unwrap().unwrap().payload, "a");
        assert!(matches!(camera.read_frame(), Err(CollectError::FrameRead(_))));
        assert!(camera.read_frame().unwrap().is_none());
        camera.release();

        camera.open().unwrap();
        assert_eq!(camera.read_frame().unwrap().unwrap().index, 0);
        camera.release();

        assert_eq!(probe.opens(), 2);
        assert_eq!(probe.releases(), 2);
        assert_eq!(probe.uses(), 3);
    }

    #[test]
    fn test_scripted_tracker_runs_dry() {
        let mut tracker = ScriptedTracker::new([
            TrackerStep::Faces(vec![synthetic_face(0.2)]),
            TrackerStep::Malformed("truncated".into()),
        ]);
        let frame = Frame { index: 3, payload: String::new() };

        assert_eq!(tracker.detect(&frame).unwrap().len(), 1);
        match tracker.detect(&frame) {
            Err(CollectError::MalformedLandmarks { reason }) => assert!(reason.contains("frame 3")),
            other => panic!("expected malformed landmarks, got {:?}", other.map(|f| f.len())),
        }
        assert!(matches!(tracker.detect(&frame), Err(CollectError::NoFaceDetected)));
    }

    #[test]
    fn test_failing_preview_is_not_a_capture_error() {
        let mut preview = HeadlessPreview::failing();
        let err = preview.open(Exercise::Smile, 10).unwrap_err();
        assert!(matches!(err, CollectError::PreviewUnavailable { .. }));
        assert!(err.to_string().starts_with("preview unavailable"));
    }

    #[test]
    fn test_scripted_operator_exhaustion() {
        let mut op = ScriptedOperator::new(["yes"]);
        let transcript = op.transcript();
        op.say("hello");
        assert_eq!(op.ask("Continue? ").unwrap(), "yes");
        assert!(op.ask("Again? ").is_err());
        assert_eq!(*transcript.borrow(), vec!["hello", "Continue? ", "Again? "]);
    }
}
