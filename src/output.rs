//! Diagnostic output.
//!
//! The engine never prints on its own. Non-fatal diagnostics, such as a construct that has
//! no handler, go to an [`OutputSink`] supplied by the caller.

// ============================================================================
// OUTPUT SINKS: OutputSink trait and implementations
// ============================================================================

use std::io::Write;

use serde::{Deserialize, Serialize};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::config::ColorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warning => "warning",
        }
    }

    fn color(self) -> Color {
        match self {
            Level::Info => Color::Cyan,
            Level::Warning => Color::Yellow,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait OutputSink {
    fn emit(&mut self, level: Level, text: &str);
}

/// Discards everything.
pub struct NullSink;

impl OutputSink for NullSink {
    fn emit(&mut self, _level: Level, _text: &str) {}
}

/// OutputBuffer: collects `level: text` lines for tests or programmatic capture.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.buffer.lines()
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, level: Level, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(level.as_str());
        self.buffer.push_str(": ");
        self.buffer.push_str(text);
    }
}

/// StderrSink: writes diagnostics to stderr, the level colored.
pub struct StderrSink {
    stream: StandardStream,
}

impl StderrSink {
    pub fn new(color: ColorMode) -> Self {
        Self {
            stream: StandardStream::stderr(color.into()),
        }
    }
}

impl Default for StderrSink {
    fn default() -> Self {
        Self::new(ColorMode::Auto)
    }
}

impl OutputSink for StderrSink {
    fn emit(&mut self, level: Level, text: &str) {
        // Diagnostics are best effort; a closed stderr is not worth failing an expansion.
        let _ = self
            .stream
            .set_color(ColorSpec::new().set_fg(Some(level.color())).set_bold(true));
        let _ = write!(self.stream, "{}", level);
        let _ = self.stream.reset();
        let _ = writeln!(self.stream, ": {}", text);
    }
}

impl From<ColorMode> for ColorChoice {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Auto => ColorChoice::Auto,
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
        }
    }
}
