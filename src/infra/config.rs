//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/collector.toml

use crate::domain::types::Exercise;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// Face-mesh tracker child process streaming landmarks from the camera
    #[default]
    Sidecar,
    /// Previously captured landmark stream read from a file
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub source: CaptureSource,
    #[serde(default = "default_capture_command")]
    pub command: String,
    #[serde(default = "default_capture_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub device_index: u32,
    #[serde(default)]
    pub replay_file: Option<PathBuf>,
}

fn default_capture_command() -> String {
    "python3".to_string()
}

fn default_capture_args() -> Vec<String> {
    vec!["tools/face_mesh_stream.py".to_string(), "--device".to_string(), "0".to_string()]
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::default(),
            command: default_capture_command(),
            args: default_capture_args(),
            device_index: 0,
            replay_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_target_duration_secs")]
    pub target_duration_secs: u32,
    #[serde(default = "default_nominal_fps")]
    pub nominal_fps: u32,
    /// Overrides duration x fps when set
    #[serde(default)]
    pub frame_budget: Option<usize>,
    #[serde(default = "default_stop_key")]
    pub stop_key: char,
}

fn default_target_duration_secs() -> u32 {
    5
}

fn default_nominal_fps() -> u32 {
    30
}

fn default_stop_key() -> char {
    'q'
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: default_target_duration_secs(),
            nominal_fps: default_nominal_fps(),
            frame_budget: None,
            stop_key: default_stop_key(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("collected_data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { output_dir: default_output_dir() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionConfig {
    /// Subset or reordering of the catalog; empty means the full catalog
    #[serde(default)]
    pub exercises: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    capture_source: CaptureSource,
    capture_command: String,
    capture_args: Vec<String>,
    device_index: u32,
    replay_file: Option<PathBuf>,
    frame_budget: usize,
    stop_key: char,
    output_dir: PathBuf,
    exercises: Vec<Exercise>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_source: CaptureSource::Sidecar,
            capture_command: default_capture_command(),
            capture_args: default_capture_args(),
            device_index: 0,
            replay_file: None,
            frame_budget: 150,
            stop_key: 'q',
            output_dir: default_output_dir(),
            exercises: Exercise::CATALOG.to_vec(),
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from the CLI value or environment
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        if let Some(path) = cli_path {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Self::from_toml(toml_config, path.display().to_string())
    }

    fn from_toml(toml_config: TomlConfig, config_file: String) -> anyhow::Result<Self> {
        let recording = toml_config.recording;
        let frame_budget = match recording.frame_budget {
            Some(budget) => budget,
            None => (recording.target_duration_secs as usize) * (recording.nominal_fps as usize),
        };
        if frame_budget == 0 {
            bail!("frame budget must be at least 1 (config {})", config_file);
        }

        let exercises = if toml_config.session.exercises.is_empty() {
            Exercise::CATALOG.to_vec()
        } else {
            toml_config
                .session
                .exercises
                .iter()
                .map(|label| label.parse::<Exercise>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()
                .with_context(|| format!("Invalid [session] exercises in {}", config_file))?
        };

        if toml_config.capture.source == CaptureSource::Replay
            && toml_config.capture.replay_file.is_none()
        {
            bail!("capture source 'replay' needs capture.replay_file (config {})", config_file);
        }

        Ok(Self {
            capture_source: toml_config.capture.source,
            capture_command: toml_config.capture.command,
            capture_args: toml_config.capture.args,
            device_index: toml_config.capture.device_index,
            replay_file: toml_config.capture.replay_file,
            frame_budget,
            stop_key: recording.stop_key,
            output_dir: toml_config.storage.output_dir,
            exercises,
            config_file,
        })
    }

    /// Load configuration - tries TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn capture_source(&self) -> CaptureSource {
        self.capture_source
    }

    pub fn capture_command(&self) -> &str {
        &self.capture_command
    }

    /// Sidecar arguments; an empty list falls back to `--device <index>`
    pub fn capture_args(&self) -> Vec<String> {
        if self.capture_args.is_empty() {
            vec!["--device".to_string(), self.device_index.to_string()]
        } else {
            self.capture_args.clone()
        }
    }

    pub fn replay_file(&self) -> Option<&Path> {
        self.replay_file.as_deref()
    }

    pub fn frame_budget(&self) -> usize {
        self.frame_budget
    }

    pub fn stop_key(&self) -> char {
        self.stop_key
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    // Builder methods for CLI overrides
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_frame_budget(mut self, budget: usize) -> Self {
        self.frame_budget = budget.max(1);
        self
    }

    pub fn with_replay_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture_source = CaptureSource::Replay;
        self.replay_file = Some(path.into());
        self
    }
}
