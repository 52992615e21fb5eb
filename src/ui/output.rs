//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Every line a command prints goes through a [`Terminal`]. In production
//! the terminal writes to the process streams; in tests it captures both
//! streams into buffers so dispatch can be asserted on without spawning a
//! process. Highlighting is only applied when stderr is a TTY and
//! `NO_COLOR` is unset.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use anstyle::{AnsiColor, Reset, Style};

const ERROR_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));

/// Where one of the terminal's streams ends up.
#[derive(Debug)]
enum Sink {
    Stdout,
    Stderr,
    Captured(Vec<u8>),
}

impl Sink {
    fn text(&self) -> String {
        match self {
            Sink::Captured(buf) => String::from_utf8_lossy(buf).into_owned(),
            Sink::Stdout | Sink::Stderr => String::new(),
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::Captured(captured) => captured.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Captured(_) => Ok(()),
        }
    }
}

/// Output streams for one invocation.
#[derive(Debug)]
pub struct Terminal {
    out: Sink,
    err: Sink,
    color: bool,
}

impl Terminal {
    /// Terminal bound to the process stdout/stderr.
    pub fn stdio() -> Self {
        let color = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self {
            out: Sink::Stdout,
            err: Sink::Stderr,
            color: false,
        }
        .with_color(color)
    }

    /// Terminal that records everything written to it.
    pub fn captured() -> Self {
        Self {
            out: Sink::Captured(Vec::new()),
            err: Sink::Captured(Vec::new()),
            color: false,
        }
    }

    /// Turn highlighting escapes on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Whether highlighting escapes are emitted.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Everything written to stdout so far (captured terminals only).
    pub fn stdout_text(&self) -> String {
        self.out.text()
    }

    /// Everything written to stderr so far (captured terminals only).
    pub fn stderr_text(&self) -> String {
        self.err.text()
    }

    /// Print a line to stdout.
    pub fn line(&mut self, message: impl Display) {
        let _ = writeln!(self.out, "{}", message);
    }

    /// Print raw text to stdout, without a trailing newline.
    pub fn print(&mut self, text: impl Display) {
        let _ = write!(self.out, "{}", text);
        let _ = self.out.flush();
    }

    /// Print raw text to stderr, without a trailing newline.
    pub fn eprint(&mut self, text: impl Display) {
        let _ = write!(self.err, "{}", text);
        let _ = self.err.flush();
    }

    /// Render `text` in the error color when color is enabled.
    pub fn highlight(&self, text: &str) -> String {
        if self.color {
            format!("{ERROR_COLOR}{text}{Reset}")
        } else {
            text.to_string()
        }
    }
}
