//! Emotion collector - labeled facial-movement sample collection
//!
//! Runs one operator-driven session: consent, participant info, a bounded
//! recording per exercise, then a single JSON record per session.
//!
//! Module structure:
//! - `domain/` - Data model, landmark map, feature extraction, session record
//! - `io/` - Capture devices, landmark tracker, preview, operator prompts, record storage
//! - `services/` - Exercise recorder and session orchestrator
//! - `infra/` - Config, errors, logging

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use emotion_collector::infra::logging::{self, GIT_HASH};
use emotion_collector::infra::{CaptureSource, CollectError, Config};
use emotion_collector::io::{
    read_record, CaptureDevice, ConsoleOperator, FaceMeshJsonTracker, ReplayCamera, SessionWriter,
    SidecarCamera, TerminalPreview,
};
use emotion_collector::services::{ExerciseRecorder, Orchestrator};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// Collects labeled facial landmark features for emotion model training
#[derive(Parser, Debug)]
#[command(name = "emotion-collector", version = GIT_HASH, about)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a collection session
    Collect(CollectArgs),
    /// Summarize a saved session record
    Inspect {
        /// Path to a session record (.json)
        record: PathBuf,
    },
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// Path to TOML configuration file (default: $CONFIG_FILE or config/collector.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Directory for session records
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Samples collected per exercise
    #[arg(long)]
    frame_budget: Option<usize>,

    /// Participant id (skips the id prompt)
    #[arg(long)]
    participant_id: Option<String>,

    /// Replay a recorded landmark stream instead of the live camera
    #[arg(long)]
    replay: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    let result = match cli.command {
        Command::Collect(args) => collect(args),
        Command::Inspect { record } => inspect(&record),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "emotion_collector_failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &CollectArgs) -> anyhow::Result<Config> {
    // An explicitly named file must load; the implicit one may fall back to defaults
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_from_path(&Config::resolve_config_path(None)),
    };

    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir);
    }
    if let Some(budget) = args.frame_budget {
        config = config.with_frame_budget(budget);
    }
    if let Some(path) = &args.replay {
        config = config.with_replay_file(path);
    }
    Ok(config)
}

fn capture_device(config: &Config) -> anyhow::Result<Box<dyn CaptureDevice>> {
    match config.capture_source() {
        CaptureSource::Sidecar => {
            Ok(Box::new(SidecarCamera::new(config.capture_command(), config.capture_args())))
        }
        CaptureSource::Replay => {
            let path = config
                .replay_file()
                .context("replay capture selected without a replay file")?;
            Ok(Box::new(ReplayCamera::new(path)))
        }
    }
}

fn collect(args: CollectArgs) -> anyhow::Result<()> {
    info!(version = %GIT_HASH, "emotion_collector_starting");

    let config = load_config(&args)?;
    info!(
        config_file = %config.config_file(),
        capture_source = ?config.capture_source(),
        frame_budget = %config.frame_budget(),
        output_dir = %config.output_dir().display(),
        exercises = %config.exercises().len(),
        "config_loaded"
    );

    let recorder = ExerciseRecorder::new(
        capture_device(&config)?,
        Box::new(FaceMeshJsonTracker::new()),
        Box::new(TerminalPreview::new(config.stop_key())),
        config.frame_budget(),
    );
    let writer = SessionWriter::new(config.output_dir(), GIT_HASH);
    let mut orchestrator = Orchestrator::new(
        config.exercises().to_vec(),
        recorder,
        Box::new(ConsoleOperator::stdio()),
        writer,
    )
    .with_participant_id(args.participant_id)
    .with_stop_key(config.stop_key());

    let summary = loop {
        match orchestrator.run() {
            Ok(summary) => break summary,
            Err(e @ CollectError::StorageUnavailable { .. }) => {
                if orchestrator.offer_storage_retry(&e)?.is_none() {
                    return Err(e).context("session record was not saved");
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    if let Some(path) = &summary.record_path {
        info!(
            participant_id = %summary.participant_id.as_deref().unwrap_or("-"),
            total_samples = %summary.total_samples,
            path = %path.display(),
            "emotion_collector_finished"
        );
    }
    Ok(())
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let record = read_record(path)?;
    let info = &record.participant_info;
    let meta = &record.collection_metadata;

    println!("Record:       {}", path.display());
    println!("Participant:  {} (age {}, gender {})", info.participant_id, info.age, info.gender);
    println!("Collected:    {}", meta.collection_date.format("%Y-%m-%d %H:%M:%S"));
    if let Some(version) = &meta.collector_version {
        println!("Collector:    {}", version);
    }
    println!("Samples:      {}", meta.total_samples);
    println!();
    for (exercise, count) in record.samples_per_exercise() {
        let run = meta.exercise_runs.iter().find(|r| r.exercise == exercise);
        match run {
            Some(run) => println!(
                "  {:<16} {:>5} samples  ({} frames read, {} no face, {} malformed, {})",
                exercise.as_str(),
                count,
                run.frames_read,
                run.skipped_no_face,
                run.skipped_malformed,
                run.end.as_str()
            ),
            None => println!("  {:<16} {:>5} samples", exercise.as_str(), count),
        }
    }
    Ok(())
}
