//! Capture devices - live landmark frame streams
//!
//! The face-mesh tracker owns the camera and runs as a sidecar process.
//! Protocol (stdout, one JSON object per line):
//! - first line: `{"status":"ready"}` or `{"status":"error","message":"..."}`
//! - then one line per camera frame: `{"frame": n, "faces": [[{"x":..,"y":..,"z":..}, ...]]}`
//!
//! Devices are acquired through `OpenDevice`, which releases them on drop.

use crate::infra::error::{CollectError, CollectResult};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

/// One raw frame as delivered by the capture device
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the device stream since open (0-based)
    pub index: u64,
    pub payload: String,
}

/// Live frame stream with explicit open/read/release
pub trait CaptureDevice {
    fn name(&self) -> &str;

    fn open(&mut self) -> CollectResult<()>;

    /// Next frame; `Ok(None)` at end of stream
    fn read_frame(&mut self) -> CollectResult<Option<Frame>>;

    /// Must be safe to call more than once and on a device that failed to open
    fn release(&mut self);
}

/// An opened device, released when dropped
pub struct OpenDevice<'a> {
    device: &'a mut dyn CaptureDevice,
}

impl<'a> OpenDevice<'a> {
    pub fn open(device: &'a mut dyn CaptureDevice) -> CollectResult<Self> {
        if let Err(e) = device.open() {
            device.release();
            return Err(e);
        }
        debug!(device = %device.name(), "capture_device_opened");
        Ok(Self { device })
    }

    #[inline]
    pub fn read_frame(&mut self) -> CollectResult<Option<Frame>> {
        self.device.read_frame()
    }
}

impl Drop for OpenDevice<'_> {
    fn drop(&mut self) {
        self.device.release();
        debug!(device = %self.device.name(), "capture_device_released");
    }
}

#[derive(Debug, Deserialize)]
struct Handshake {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Reads non-blank lines as frames, counting from zero
struct LineReader<R> {
    reader: R,
    next_index: u64,
    /// Bytes consumed from the start of the underlying stream
    offset: u64,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self::resume(reader, StreamPosition::default())
    }

    /// Continue a stream whose reader was positioned at `position.offset`
    fn resume(reader: R, position: StreamPosition) -> Self {
        Self { reader, next_index: position.next_index, offset: position.offset }
    }

    fn position(&self) -> StreamPosition {
        StreamPosition { offset: self.offset, next_index: self.next_index }
    }

    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self.reader.read_line(&mut line)?;
            if read == 0 {
                return Ok(None);
            }
            self.offset += read as u64;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
        Ok(self.next_line()?.map(|payload| {
            let frame = Frame { index: self.next_index, payload };
            self.next_index += 1;
            frame
        }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct StreamPosition {
    offset: u64,
    next_index: u64,
}

/// Face-mesh tracker child process streaming landmark frames from a camera
pub struct SidecarCamera {
    name: String,
    command: String,
    args: Vec<String>,
    child: Option<Child>,
    stream: Option<LineReader<BufReader<ChildStdout>>>,
}

impl SidecarCamera {
    pub fn new(command: &str, args: Vec<String>) -> Self {
        Self {
            name: format!("sidecar:{}", command),
            command: command.to_string(),
            args,
            child: None,
            stream: None,
        }
    }

    fn await_ready(stream: &mut LineReader<BufReader<ChildStdout>>) -> CollectResult<()> {
        let line = stream
            .next_line()
            .map_err(|e| CollectError::DeviceUnavailable { reason: e.to_string() })?
            .ok_or_else(|| CollectError::DeviceUnavailable {
                reason: "tracker exited before reporting ready".to_string(),
            })?;

        let handshake: Handshake = serde_json::from_str(&line).map_err(|e| {
            CollectError::DeviceUnavailable { reason: format!("bad handshake '{}': {}", line, e) }
        })?;

        match handshake.status.as_str() {
            "ready" => Ok(()),
            other => Err(CollectError::DeviceUnavailable {
                reason: handshake.message.unwrap_or_else(|| format!("tracker status '{}'", other)),
            }),
        }
    }
}

impl CaptureDevice for SidecarCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> CollectResult<()> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CollectError::DeviceUnavailable {
                reason: format!("failed to start '{}': {}", self.command, e),
            })?;

        let stdout = child.stdout.take();
        self.child = Some(child);
        let stdout = stdout.ok_or_else(|| CollectError::DeviceUnavailable {
            reason: "tracker stdout not captured".to_string(),
        })?;

        let mut stream = LineReader::new(BufReader::new(stdout));
        Self::await_ready(&mut stream)?;
        self.stream = Some(stream);

        info!(command = %self.command, args = ?self.args, "sidecar_camera_ready");
        Ok(())
    }

    fn read_frame(&mut self) -> CollectResult<Option<Frame>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CollectError::FrameRead("device not open".to_string()));
        };
        stream.next_frame().map_err(|e| CollectError::FrameRead(e.to_string()))
    }

    fn release(&mut self) {
        self.stream = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "sidecar_kill_failed");
            }
            match child.wait() {
                Ok(status) => debug!(status = %status, "sidecar_exited"),
                Err(e) => warn!(error = %e, "sidecar_wait_failed"),
            }
        }
    }
}

impl Drop for SidecarCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Landmark stream replayed from a file in the sidecar frame format.
///
/// The file is closed on release and reopened on the next open, which
/// continues where the previous exercise stopped: a stream recorded across a
/// whole session is re-extracted exercise by exercise, in order.
pub struct ReplayCamera {
    name: String,
    path: PathBuf,
    position: StreamPosition,
    stream: Option<LineReader<BufReader<File>>>,
}

impl ReplayCamera {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("replay:{}", path.display()),
            path,
            position: StreamPosition::default(),
            stream: None,
        }
    }
}

impl CaptureDevice for ReplayCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> CollectResult<()> {
        let unavailable = |e: std::io::Error| CollectError::DeviceUnavailable {
            reason: format!("cannot open replay file {}: {}", self.path.display(), e),
        };
        let mut file = File::open(&self.path).map_err(unavailable)?;
        file.seek(SeekFrom::Start(self.position.offset)).map_err(unavailable)?;
        debug!(path = %self.path.display(), offset = self.position.offset, "replay_resumed");
        self.stream = Some(LineReader::resume(BufReader::new(file), self.position));
        Ok(())
    }

    fn read_frame(&mut self) -> CollectResult<Option<Frame>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CollectError::FrameRead("device not open".to_string()));
        };
        loop {
            match stream.next_frame().map_err(|e| CollectError::FrameRead(e.to_string()))? {
                // Recorded streams may start with the sidecar handshake
                Some(frame) if frame.payload.contains("\"status\"") => continue,
                other => return Ok(other),
            }
        }
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.position = stream.position();
        }
    }
}
