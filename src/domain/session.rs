//! Session model and the on-disk record consumed by the trainer

use crate::domain::types::{Exercise, ParticipantInfo, Sample};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Why an exercise recording loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingEnd {
    BudgetReached,
    StoppedByOperator,
    StreamEnded,
    FrameReadFailed,
    DeviceUnavailable,
}

impl RecordingEnd {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingEnd::BudgetReached => "budget_reached",
            RecordingEnd::StoppedByOperator => "stopped_by_operator",
            RecordingEnd::StreamEnded => "stream_ended",
            RecordingEnd::FrameReadFailed => "frame_read_failed",
            RecordingEnd::DeviceUnavailable => "device_unavailable",
        }
    }
}

/// Summary of one exercise attempt, kept even when it yielded no samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseRun {
    pub exercise: Exercise,
    pub samples: usize,
    pub frames_read: usize,
    pub skipped_no_face: usize,
    pub skipped_malformed: usize,
    pub end: RecordingEnd,
}

impl ExerciseRun {
    pub fn new(exercise: Exercise) -> Self {
        Self {
            exercise,
            samples: 0,
            frames_read: 0,
            skipped_no_face: 0,
            skipped_malformed: 0,
            end: RecordingEnd::StreamEnded,
        }
    }
}

/// One participant's run, built incrementally by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    participant: ParticipantInfo,
    exercises: Vec<Exercise>,
    runs: Vec<ExerciseRun>,
    samples: Vec<Sample>,
}

impl Session {
    pub fn new(participant: ParticipantInfo, exercises: Vec<Exercise>) -> Self {
        Self {
            participant,
            exercises,
            runs: Vec::with_capacity(Exercise::CATALOG.len()),
            samples: Vec::new(),
        }
    }

    /// Append one exercise's results, preserving arrival order
    pub fn add_run(&mut self, run: ExerciseRun, samples: Vec<Sample>) {
        self.runs.push(run);
        self.samples.extend(samples);
    }

    pub fn participant(&self) -> &ParticipantInfo {
        &self.participant
    }

    pub fn participant_id(&self) -> &str {
        &self.participant.participant_id
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn runs(&self) -> &[ExerciseRun] {
        &self.runs
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    /// Snapshot as a record, stamped with the given collection time
    pub fn to_record(&self, collection_date: DateTime<Local>, collector_version: &str) -> SessionRecord {
        SessionRecord {
            participant_info: self.participant.clone(),
            collection_metadata: CollectionMetadata {
                exercises: self.exercises.clone(),
                total_samples: self.samples.len(),
                collection_date,
                collector_version: Some(collector_version.to_string()),
                exercise_runs: self.runs.clone(),
            },
            samples: self.samples.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub exercises: Vec<Exercise>,
    pub total_samples: usize,
    pub collection_date: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_version: Option<String>,
    #[serde(default)]
    pub exercise_runs: Vec<ExerciseRun>,
}

/// Self-describing per-session record, the sole artifact handed to training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub participant_info: ParticipantInfo,
    pub collection_metadata: CollectionMetadata,
    pub samples: Vec<Sample>,
}

impl SessionRecord {
    /// Check cross-field invariants that serde alone cannot enforce
    pub fn validate(&self) -> Result<(), String> {
        if self.collection_metadata.total_samples != self.samples.len() {
            return Err(format!(
                "total_samples is {} but {} samples present",
                self.collection_metadata.total_samples,
                self.samples.len()
            ));
        }
        let pid = &self.participant_info.participant_id;
        if let Some(sample) = self.samples.iter().find(|s| &s.participant_id != pid) {
            return Err(format!(
                "sample {} of {} belongs to participant '{}'",
                sample.frame_count, sample.exercise, sample.participant_id
            ));
        }
        Ok(())
    }

    /// Sample count per exercise, in record exercise order
    pub fn samples_per_exercise(&self) -> Vec<(Exercise, usize)> {
        self.collection_metadata
            .exercises
            .iter()
            .map(|e| (*e, self.samples.iter().filter(|s| s.exercise == *e).count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FeatureVector;

    fn sample(exercise: Exercise, pid: &str, idx: usize) -> Sample {
        Sample {
            timestamp: Local::now(),
            exercise,
            participant_id: pid.to_string(),
            features: FeatureVector([idx as f64; 10]),
            frame_count: idx,
        }
    }

    #[test]
    fn test_session_preserves_arrival_order() {
        let info = ParticipantInfo::new(Some("p1"), "30", "M");
        let mut session = Session::new(info, Exercise::CATALOG.to_vec());

        let mut run = ExerciseRun::new(Exercise::Smile);
        run.samples = 2;
        session.add_run(run, vec![sample(Exercise::Smile, "p1", 0), sample(Exercise::Smile, "p1", 1)]);
        session.add_run(ExerciseRun::new(Exercise::Blink3Times), Vec::new());
        let mut run = ExerciseRun::new(Exercise::HeadRotation);
        run.samples = 1;
        session.add_run(run, vec![sample(Exercise::HeadRotation, "p1", 0)]);

        assert_eq!(session.runs().len(), 3);
        assert_eq!(session.total_samples(), 3);
        let order: Vec<(Exercise, usize)> =
            session.samples().iter().map(|s| (s.exercise, s.frame_count)).collect();
        assert_eq!(
            order,
            vec![(Exercise::Smile, 0), (Exercise::Smile, 1), (Exercise::HeadRotation, 0)]
        );
    }

    #[test]
    fn test_record_shape() {
        let info = ParticipantInfo::new(Some("p1"), "30", "M");
        let mut session = Session::new(info, Exercise::CATALOG.to_vec());
        session.add_run(ExerciseRun::new(Exercise::Smile), vec![sample(Exercise::Smile, "p1", 0)]);

        let record = session.to_record(Local::now(), "abc123");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["participant_info"]["participant_id"], "p1");
        assert_eq!(json["collection_metadata"]["total_samples"], 1);
        assert_eq!(json["collection_metadata"]["exercises"][1], "blink_3_times");
        assert_eq!(json["samples"][0]["exercise"], "smile");
        assert_eq!(json["samples"][0]["frame_count"], 0);
        assert_eq!(json["samples"][0]["features"].as_array().unwrap().len(), 10);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_mismatches() {
        let info = ParticipantInfo::new(Some("p1"), "30", "M");
        let mut session = Session::new(info, vec![Exercise::Smile]);
        session.add_run(ExerciseRun::new(Exercise::Smile), vec![sample(Exercise::Smile, "p2", 0)]);
        let record = session.to_record(Local::now(), "dev");
        assert!(record.validate().unwrap_err().contains("p2"));

        let mut record = record;
        record.samples[0].participant_id = "p1".to_string();
        record.collection_metadata.total_samples = 4;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_samples_per_exercise_includes_empty() {
        let info = ParticipantInfo::new(Some("p1"), "30", "M");
        let mut session = Session::new(info, vec![Exercise::Smile, Exercise::HeadNod]);
        session.add_run(ExerciseRun::new(Exercise::Smile), vec![sample(Exercise::Smile, "p1", 0)]);
        session.add_run(ExerciseRun::new(Exercise::HeadNod), Vec::new());
        let record = session.to_record(Local::now(), "dev");
        assert_eq!(
            record.samples_per_exercise(),
            vec![(Exercise::Smile, 1), (Exercise::HeadNod, 0)]
        );
    }
}
