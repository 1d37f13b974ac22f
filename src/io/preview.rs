//! Operator preview - progress overlay and stop-key polling during recording
//!
//! The terminal preview switches the terminal to raw mode while an exercise
//! records so a single keypress can stop it. `OpenPreview` restores the
//! terminal on every exit path.

use crate::domain::types::Exercise;
use crate::infra::error::{CollectError, CollectResult};
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// Progress shown to the operator after each collected sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub exercise: Exercise,
    pub collected: usize,
    pub budget: usize,
}

pub trait PreviewSurface {
    fn open(&mut self, exercise: Exercise, budget: usize) -> CollectResult<()>;

    fn render(&mut self, overlay: &Overlay);

    /// Non-blocking check for the operator's stop request
    fn stop_requested(&mut self) -> bool;

    /// Must be safe to call on a surface that failed to open
    fn close(&mut self);
}

/// A preview surface for the duration of one exercise, closed when dropped.
///
/// A surface that fails to open leaves recording headless: nothing is
/// rendered and no stop request is ever reported.
pub struct OpenPreview<'a> {
    surface: &'a mut dyn PreviewSurface,
    active: bool,
}

impl<'a> OpenPreview<'a> {
    pub fn open(surface: &'a mut dyn PreviewSurface, exercise: Exercise, budget: usize) -> Self {
        let active = match surface.open(exercise, budget) {
            Ok(()) => true,
            Err(e) => {
                warn!(exercise = %exercise, error = %e, "preview_unavailable_recording_headless");
                surface.close();
                false
            }
        };
        Self { surface, active }
    }

    #[inline]
    pub fn render(&mut self, overlay: &Overlay) {
        if self.active {
            self.surface.render(overlay);
        }
    }

    #[inline]
    pub fn stop_requested(&mut self) -> bool {
        self.active && self.surface.stop_requested()
    }
}

impl Drop for OpenPreview<'_> {
    fn drop(&mut self) {
        self.surface.close();
    }
}

/// Status line on the controlling terminal; stop with the configured key, Esc or Ctrl+C
pub struct TerminalPreview {
    stop_key: char,
    raw_mode: bool,
}

impl TerminalPreview {
    pub fn new(stop_key: char) -> Self {
        Self { stop_key: stop_key.to_ascii_lowercase(), raw_mode: false }
    }

    fn is_stop_key(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Esc => true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => true,
            KeyCode::Char(c) => c.to_ascii_lowercase() == self.stop_key,
            _ => false,
        }
    }
}

impl PreviewSurface for TerminalPreview {
    fn open(&mut self, exercise: Exercise, budget: usize) -> CollectResult<()> {
        enable_raw_mode().map_err(|e| CollectError::PreviewUnavailable {
            reason: format!("terminal raw mode: {}", e),
        })?;
        self.raw_mode = true;

        let mut stdout = io::stdout();
        let _ = queue!(
            stdout,
            Print(format!(
                "Recording {} ({} frames). Press '{}' to stop early.\r\n",
                exercise.title(),
                budget,
                self.stop_key
            ))
        );
        let _ = stdout.flush();
        Ok(())
    }

    fn render(&mut self, overlay: &Overlay) {
        let mut stdout = io::stdout();
        let line = format!(
            "Exercise: {}  Frames: {}/{}",
            overlay.exercise, overlay.collected, overlay.budget
        );
        let written = queue!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line));
        if let Err(e) = written.and_then(|()| stdout.flush()) {
            debug!(error = %e, "preview_render_failed");
        }
    }

    fn stop_requested(&mut self) -> bool {
        // Drain everything pending so a held key does not leak into the next prompt
        let mut stop = false;
        while let Ok(true) = event::poll(Duration::ZERO) {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if self.is_stop_key(key.code, key.modifiers) {
                        stop = true;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(error = %e, "preview_event_read_failed");
                    break;
                }
            }
        }
        stop
    }

    fn close(&mut self) {
        if self.raw_mode {
            if let Err(e) = disable_raw_mode() {
                warn!(error = %e, "terminal_restore_failed");
            }
            self.raw_mode = false;
            let mut stdout = io::stdout();
            let _ = writeln!(stdout);
            let _ = stdout.flush();
        }
    }
}

impl Drop for TerminalPreview {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_keys() {
        let preview = TerminalPreview::new('Q');
        assert!(preview.is_stop_key(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(preview.is_stop_key(KeyCode::Char('Q'), KeyModifiers::SHIFT));
        assert!(preview.is_stop_key(KeyCode::Esc, KeyModifiers::NONE));
        assert!(preview.is_stop_key(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!preview.is_stop_key(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!preview.is_stop_key(KeyCode::Enter, KeyModifiers::NONE));
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut preview = TerminalPreview::new('q');
        preview.close();
        assert!(!preview.raw_mode);
    }
}
