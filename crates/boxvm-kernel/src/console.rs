//! Host console.
//!
//! Guest `print` and `input` go through a [`Console`]. [`StdConsole`] talks
//! to the process's stdin/stdout; [`BufferConsole`] captures output and
//! replays scripted input lines for headless runs and tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

/// Prefix applied to every line a guest prints.
pub const OUTPUT_PREFIX: &str = "[VM Output]: ";

/// Line-oriented text channel between the guest and the host.
pub trait Console: Send {
    /// Emit one line of guest output.
    fn write_line(&mut self, text: &str) -> io::Result<()>;

    /// Show `prompt` and read one line, without its trailing newline.
    ///
    /// Returns an empty string at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// Console backed by the process's stdin and stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{OUTPUT_PREFIX}{text}")
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        {
            let mut out = io::stdout().lock();
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(strip_newline(line))
    }
}

/// In-memory console.
///
/// Clones share the same buffers, so a host can keep one handle and give the
/// other to the kernel.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    output: Arc<Mutex<Vec<String>>>,
    input: Arc<Mutex<VecDeque<String>>>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue lines returned by successive `read_line` calls.
    pub fn with_input<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut input) = self.input.lock() {
            input.extend(lines.into_iter().map(Into::into));
        }
        self
    }

    /// Lines written so far, prefix included.
    pub fn lines(&self) -> Vec<String> {
        self.output.lock().map(|out| out.clone()).unwrap_or_default()
    }
}

impl Console for BufferConsole {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.output
            .lock()
            .map_err(|_| io::Error::other("console output buffer poisoned"))?
            .push(format!("{OUTPUT_PREFIX}{text}"));
        Ok(())
    }

    fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
        let line = self
            .input
            .lock()
            .map_err(|_| io::Error::other("console input buffer poisoned"))?
            .pop_front()
            .unwrap_or_default();
        Ok(strip_newline(line))
    }
}

fn strip_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}
