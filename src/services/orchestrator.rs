//! Session orchestrator - consent, participant info, exercises, persistence
//!
//! State machine:
//! `AwaitConsent -> AwaitParticipantInfo -> RecordingExercise(0..n) -> Persisting -> Done`
//! with `Declined` as the terminal state when consent is refused. Each call to
//! `step` performs the current state's work and moves to the next state.
//! Exercise failures never abort the session; a storage failure leaves the
//! machine in `Persisting` with the session kept in memory so the write can
//! be retried.

use crate::domain::session::Session;
use crate::domain::types::{Exercise, ParticipantInfo};
use crate::infra::error::{CollectError, CollectResult};
use crate::io::operator::Operator;
use crate::io::writer::SessionWriter;
use crate::services::recorder::ExerciseRecorder;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const CONSENT_TEXT: &[&str] = &[
    "============================================================",
    "AI EMOTION - ETHICAL GUIDELINES",
    "============================================================",
    "1. Your privacy is protected - no images are stored",
    "2. Only facial landmark coordinates are saved",
    "3. You can stop an exercise at any time with the stop key",
    "4. Data will be used only for research purposes",
    "5. You have the right to withdraw your data",
    "============================================================",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitConsent,
    AwaitParticipantInfo,
    /// Index into the session's exercise list
    RecordingExercise(usize),
    Persisting,
    Done,
    Declined,
}

impl SessionState {
    /// Successor on the normal path for a session of `exercise_count` exercises
    pub fn next(self, exercise_count: usize) -> SessionState {
        match self {
            SessionState::AwaitConsent => SessionState::AwaitParticipantInfo,
            SessionState::AwaitParticipantInfo | SessionState::RecordingExercise(_) => {
                let next_index = match self {
                    SessionState::RecordingExercise(i) => i + 1,
                    _ => 0,
                };
                if next_index < exercise_count {
                    SessionState::RecordingExercise(next_index)
                } else {
                    SessionState::Persisting
                }
            }
            SessionState::Persisting => SessionState::Done,
            SessionState::Done => SessionState::Done,
            SessionState::Declined => SessionState::Declined,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Declined)
    }
}

/// Outcome reported to the operator once the machine reaches a terminal state
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub participant_id: Option<String>,
    pub total_samples: usize,
    pub per_exercise: Vec<(Exercise, usize)>,
    pub record_path: Option<PathBuf>,
    pub declined: bool,
}

pub struct Orchestrator {
    state: SessionState,
    exercises: Vec<Exercise>,
    recorder: ExerciseRecorder,
    operator: Box<dyn Operator>,
    writer: SessionWriter,
    stop_key: char,
    preset_participant_id: Option<String>,
    session: Option<Session>,
    record_path: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        exercises: Vec<Exercise>,
        recorder: ExerciseRecorder,
        operator: Box<dyn Operator>,
        writer: SessionWriter,
    ) -> Self {
        Self {
            state: SessionState::AwaitConsent,
            exercises,
            recorder,
            operator,
            writer,
            stop_key: 'q',
            preset_participant_id: None,
            session: None,
            record_path: None,
        }
    }

    /// Participant id supplied up front (e.g. on the command line); skips the id prompt
    pub fn with_participant_id(mut self, participant_id: Option<String>) -> Self {
        self.preset_participant_id = participant_id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_stop_key(mut self, stop_key: char) -> Self {
        self.stop_key = stop_key;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session built so far (available from the first exercise on)
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn record_path(&self) -> Option<&Path> {
        self.record_path.as_deref()
    }

    /// Point persistence at another directory, e.g. after a storage failure
    pub fn redirect_output(&mut self, output_dir: impl Into<PathBuf>) {
        self.writer.set_output_dir(output_dir);
    }

    /// Ask the operator where to retry a failed write. Returns the new output
    /// directory, or `None` when the operator gives up (blank answer).
    pub fn offer_storage_retry(&mut self, failure: &CollectError) -> CollectResult<Option<PathBuf>> {
        self.operator.say(&format!("Could not save session data: {}", failure));
        let answer = self
            .operator
            .ask("Enter another output directory to retry (or press Enter to discard): ")?;
        let answer = answer.trim();
        if answer.is_empty() {
            warn!(
                participant_id = %self.session.as_ref().map(|s| s.participant_id()).unwrap_or("-"),
                "session_discarded"
            );
            return Ok(None);
        }
        let dir = PathBuf::from(answer);
        info!(output_dir = %dir.display(), "session_persist_retry");
        self.redirect_output(&dir);
        Ok(Some(dir))
    }

    /// Drive the machine until a terminal state. On a storage error the state
    /// stays `Persisting`; calling `run` again retries the write.
    pub fn run(&mut self) -> CollectResult<SessionSummary> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        Ok(self.summary())
    }

    /// Perform the current state's work and transition
    pub fn step(&mut self) -> CollectResult<SessionState> {
        let count = self.exercises.len();
        let next = match self.state {
            SessionState::AwaitConsent => {
                if self.await_consent()? {
                    self.state.next(count)
                } else {
                    SessionState::Declined
                }
            }
            SessionState::AwaitParticipantInfo => {
                let info = self.collect_participant_info()?;
                info!(
                    participant_id = %info.participant_id,
                    exercises = %count,
                    "session_started"
                );
                self.session = Some(Session::new(info, self.exercises.clone()));
                self.state.next(count)
            }
            SessionState::RecordingExercise(index) => {
                self.record_exercise(index)?;
                self.state.next(count)
            }
            SessionState::Persisting => {
                self.persist()?;
                self.state.next(count)
            }
            terminal => terminal,
        };

        if next != self.state {
            self.enter(next);
        }
        Ok(self.state)
    }

    fn enter(&mut self, next: SessionState) {
        self.state = next;
        match next {
            SessionState::Done => self.report_done(),
            SessionState::Declined => {
                info!("session_declined");
                self.operator.say("Consent not given. No data was collected.");
            }
            _ => {}
        }
    }

    fn await_consent(&mut self) -> CollectResult<bool> {
        for line in CONSENT_TEXT {
            self.operator.say(line);
        }
        let answer = self.operator.ask("Press Enter to continue (or type 'n' to decline)... ")?;
        let declined = matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no");
        Ok(!declined)
    }

    fn collect_participant_info(&mut self) -> CollectResult<ParticipantInfo> {
        self.operator.say("");
        self.operator.say("PARTICIPANT INFORMATION");
        let participant_id = match self.preset_participant_id.clone() {
            Some(id) => {
                self.operator.say(&format!("Participant ID: {}", id));
                Some(id)
            }
            None => Some(
                self.operator.ask("Enter your participant ID (or press Enter to auto-generate): ")?,
            ),
        };
        let age = self.operator.ask("Enter your age: ")?;
        let gender = self.operator.ask("Enter your gender (M/F/O): ")?;
        Ok(ParticipantInfo::new(participant_id.as_deref(), &age, &gender))
    }

    fn record_exercise(&mut self, index: usize) -> CollectResult<()> {
        let Some(&exercise) = self.exercises.get(index) else {
            return Ok(());
        };
        let Some(session) = self.session.as_mut() else {
            return Err(CollectError::OperatorInput(
                "participant information missing before recording".to_string(),
            ));
        };

        self.operator.ask(&format!(
            "\nExercise {}/{}: {}. Press Enter to start...",
            index + 1,
            self.exercises.len(),
            exercise.title()
        ))?;
        self.operator.say(&format!("Recording... press '{}' to stop early", self.stop_key));

        let recording = self.recorder.record(exercise, session.participant_id());
        let collected = recording.sample_count();
        session.add_run(recording.run, recording.samples);

        if collected == 0 {
            self.operator.say(&format!("No samples collected for {}", exercise.title()));
        } else {
            self.operator.say(&format!("Collected {} samples for {}", collected, exercise.title()));
        }
        Ok(())
    }

    fn persist(&mut self) -> CollectResult<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(CollectError::OperatorInput("no session to persist".to_string()));
        };
        match self.writer.write(session) {
            Ok(path) => {
                self.operator.say(&format!("Data saved to: {}", path.display()));
                self.record_path = Some(path);
                Ok(())
            }
            Err(e) => {
                error!(
                    participant_id = %session.participant_id(),
                    output_dir = %self.writer.output_dir().display(),
                    error = %e,
                    "session_persist_failed"
                );
                Err(e)
            }
        }
    }

    fn report_done(&mut self) {
        let summary = self.summary();
        info!(
            participant_id = %summary.participant_id.as_deref().unwrap_or("-"),
            total_samples = %summary.total_samples,
            "session_complete"
        );
        self.operator.say("");
        self.operator.say("DATA COLLECTION COMPLETE!");
        self.operator.say(&format!("Total samples collected: {}", summary.total_samples));
        if let Some(pid) = &summary.participant_id {
            self.operator.say(&format!("Participant: {}", pid));
        }
    }

    pub fn summary(&self) -> SessionSummary {
        match &self.session {
            Some(session) => SessionSummary {
                participant_id: Some(session.participant_id().to_string()),
                total_samples: session.total_samples(),
                per_exercise: session.runs().iter().map(|r| (r.exercise, r.samples)).collect(),
                record_path: self.record_path.clone(),
                declined: false,
            },
            None => SessionSummary {
                participant_id: None,
                total_samples: 0,
                per_exercise: Vec::new(),
                record_path: None,
                declined: self.state == SessionState::Declined,
            },
        }
    }
}
