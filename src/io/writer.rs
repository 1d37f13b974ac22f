//! Session record storage
//!
//! Each finished session becomes one pretty-printed JSON file named
//! `<participant>_<YYYYmmdd_HHMMSS>.json` under the output directory. The file
//! is written to a unique temporary file and linked into place, so readers
//! never see a partial record. Existing records are never overwritten; a
//! taken name gets a numeric suffix.

use crate::domain::session::{Session, SessionRecord};
use crate::infra::error::{CollectError, CollectResult};
use chrono::{DateTime, Local};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, info};

/// Upper bound on numeric suffixes tried for a taken file name
const MAX_NAME_ATTEMPTS: usize = 1000;

pub struct SessionWriter {
    output_dir: PathBuf,
    collector_version: String,
}

impl SessionWriter {
    pub fn new(output_dir: impl Into<PathBuf>, collector_version: &str) -> Self {
        let output_dir = output_dir.into();
        debug!(output_dir = %output_dir.display(), "session_writer_initialized");
        Self { output_dir, collector_version: collector_version.to_string() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn set_output_dir(&mut self, output_dir: impl Into<PathBuf>) {
        self.output_dir = output_dir.into();
    }

    /// Persist a finished session; returns the record path
    pub fn write(&self, session: &Session) -> CollectResult<PathBuf> {
        let written_at = Local::now();
        let record = session.to_record(written_at, &self.collector_version);
        let json = serde_json::to_string_pretty(&record)?;

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| CollectError::storage(&self.output_dir, e))?;

        let stem = record_stem(session.participant_id(), written_at);
        let path = self.persist_unique(&stem, json.as_bytes())?;

        info!(
            participant_id = %session.participant_id(),
            total_samples = %record.collection_metadata.total_samples,
            path = %path.display(),
            bytes = %json.len(),
            "session_persisted"
        );
        Ok(path)
    }

    /// Write `bytes` to a fresh temp file in the output directory, then link it
    /// to the first free `<stem>[_n].json` name. Never replaces an existing file.
    fn persist_unique(&self, stem: &str, bytes: &[u8]) -> CollectResult<PathBuf> {
        let mut tmp = Builder::new()
            .prefix(".record-")
            .suffix(".tmp")
            .tempfile_in(&self.output_dir)
            .map_err(|e| CollectError::storage(&self.output_dir, e))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CollectError::storage(tmp.path(), e))?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => format!("{}.json", stem),
                n => format!("{}_{}.json", stem, n),
            };
            let candidate = self.output_dir.join(name);
            match tmp.persist_noclobber(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), "record_name_taken");
                    tmp = e.file;
                }
                Err(e) => return Err(CollectError::storage(candidate, e.error)),
            }
        }
        Err(CollectError::storage(
            self.output_dir.join(format!("{}.json", stem)),
            std::io::Error::new(ErrorKind::AlreadyExists, "no free record name"),
        ))
    }
}

/// File stem for a record: filesystem-safe participant id plus timestamp
pub fn record_stem(participant_id: &str, at: DateTime<Local>) -> String {
    format!("{}_{}", sanitize_file_component(participant_id), at.format("%Y%m%d_%H%M%S"))
}

fn sanitize_file_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "participant".to_string()
    } else {
        cleaned
    }
}

/// Load and validate a record written by `SessionWriter`
pub fn read_record(path: impl AsRef<Path>) -> CollectResult<SessionRecord> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CollectError::storage(path, e))?;
    let record: SessionRecord = serde_json::from_str(&content).map_err(|e| {
        CollectError::InvalidRecord { path: path.to_path_buf(), reason: e.to_string() }
    })?;
    record
        .validate()
        .map_err(|reason| CollectError::InvalidRecord { path: path.to_path_buf(), reason })?;
    Ok(record)
}
