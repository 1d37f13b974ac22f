//! Exercise recorder - bounded real-time capture loop for one exercise
//!
//! Per frame: read, detect landmarks, extract features, append a sample.
//! Frames without a usable face are skipped and do not count against the
//! frame budget. The loop ends when the budget is reached, the operator
//! stops it, or the stream ends. Device and preview are released on every
//! exit path.

use crate::domain::features::{extract_features, ExtractError};
use crate::domain::session::{ExerciseRun, RecordingEnd};
use crate::domain::types::{Exercise, FeatureVector, Sample};
use crate::infra::error::CollectError;
use crate::io::capture::{CaptureDevice, Frame, OpenDevice};
use crate::io::preview::{OpenPreview, Overlay, PreviewSurface};
use crate::io::tracker::LandmarkTracker;
use chrono::Local;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Samples and statistics from one exercise attempt
#[derive(Debug, Clone)]
pub struct ExerciseRecording {
    pub run: ExerciseRun,
    pub samples: Vec<Sample>,
}

impl ExerciseRecording {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

pub struct ExerciseRecorder {
    device: Box<dyn CaptureDevice>,
    tracker: Box<dyn LandmarkTracker>,
    preview: Box<dyn PreviewSurface>,
    frame_budget: usize,
}

impl ExerciseRecorder {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        tracker: Box<dyn LandmarkTracker>,
        preview: Box<dyn PreviewSurface>,
        frame_budget: usize,
    ) -> Self {
        Self { device, tracker, preview, frame_budget: frame_budget.max(1) }
    }

    pub fn frame_budget(&self) -> usize {
        self.frame_budget
    }

    /// Record one exercise. Never fails: device problems yield fewer (or no) samples.
    pub fn record(&mut self, exercise: Exercise, participant_id: &str) -> ExerciseRecording {
        let started = Instant::now();
        info!(
            exercise = %exercise,
            participant_id = %participant_id,
            frame_budget = %self.frame_budget,
            device = %self.device.name(),
            "exercise_recording_started"
        );

        let recording = self.capture(exercise, participant_id);

        let run = &recording.run;
        info!(
            exercise = %exercise,
            samples = %run.samples,
            frames_read = %run.frames_read,
            skipped_no_face = %run.skipped_no_face,
            skipped_malformed = %run.skipped_malformed,
            end = %run.end.as_str(),
            elapsed_ms = %started.elapsed().as_millis(),
            "exercise_recording_finished"
        );
        recording
    }

    /// Capture loop; device and preview guards are dropped before returning
    fn capture(&mut self, exercise: Exercise, participant_id: &str) -> ExerciseRecording {
        let budget = self.frame_budget;
        let mut run = ExerciseRun::new(exercise);
        let mut samples: Vec<Sample> = Vec::with_capacity(budget);

        let mut device = match OpenDevice::open(self.device.as_mut()) {
            Ok(device) => device,
            Err(e) => {
                warn!(exercise = %exercise, error = %e, "capture_device_unavailable");
                run.end = RecordingEnd::DeviceUnavailable;
                return ExerciseRecording { run, samples };
            }
        };
        let mut preview = OpenPreview::open(self.preview.as_mut(), exercise, budget);

        run.end = loop {
            let frame = match device.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break RecordingEnd::StreamEnded,
                Err(e) => {
                    warn!(exercise = %exercise, error = %e, samples = %samples.len(), "frame_read_failed");
                    break RecordingEnd::FrameReadFailed;
                }
            };
            run.frames_read += 1;

            match frame_features(self.tracker.as_mut(), &frame) {
                Ok(features) => {
                    samples.push(Sample {
                        timestamp: Local::now(),
                        exercise,
                        participant_id: participant_id.to_string(),
                        features,
                        frame_count: samples.len(),
                    });
                    preview.render(&Overlay { exercise, collected: samples.len(), budget });
                }
                Err(FrameSkip::NoFace) => {
                    run.skipped_no_face += 1;
                    debug!(exercise = %exercise, frame = frame.index, "frame_skipped_no_face");
                }
                Err(FrameSkip::Malformed(reason)) => {
                    run.skipped_malformed += 1;
                    debug!(exercise = %exercise, frame = frame.index, reason = %reason, "frame_skipped_malformed");
                }
            }

            if samples.len() >= budget {
                break RecordingEnd::BudgetReached;
            }
            if preview.stop_requested() {
                break RecordingEnd::StoppedByOperator;
            }
        };

        run.samples = samples.len();
        ExerciseRecording { run, samples }
    }
}

/// Why a frame produced no sample
#[derive(Debug, PartialEq)]
enum FrameSkip {
    NoFace,
    Malformed(String),
}

fn frame_features(tracker: &mut dyn LandmarkTracker, frame: &Frame) -> Result<FeatureVector, FrameSkip> {
    let faces = match tracker.detect(frame) {
        Ok(faces) => faces,
        Err(CollectError::NoFaceDetected) => return Err(FrameSkip::NoFace),
        Err(e) => return Err(FrameSkip::Malformed(e.to_string())),
    };
    extract_features(&faces).map_err(|e| match e {
        ExtractError::NoFace => FrameSkip::NoFace,
        other => FrameSkip::Malformed(other.to_string()),
    })
}
