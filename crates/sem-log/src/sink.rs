//! Console + text-file tee.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use sem_types::LogResult;

/// Writes every line to an append-only text file and, optionally, a console.
///
/// The file is opened, written and closed on each call, so no handle is held
/// between lines and external readers can tail it.
#[derive(Debug)]
pub struct TeeSink<W: Write> {
    path: PathBuf,
    console: W,
    echo: bool,
}

impl<W: Write> TeeSink<W> {
    pub fn new(path: impl Into<PathBuf>, console: W, echo: bool) -> Self {
        Self {
            path: path.into(),
            console,
            echo,
        }
    }

    /// Append `text` plus a trailing newline to both outputs.
    pub fn emit(&mut self, text: &str) -> LogResult<()> {
        self.append_file(text)?;
        self.echo_console(text)
    }

    /// Append `text` to the text file only.
    pub fn append_file(&mut self, text: &str) -> LogResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{text}")?;
        file.flush()?;
        Ok(())
    }

    /// Write `text` to the console, if echoing is enabled.
    pub fn echo_console(&mut self, text: &str) -> LogResult<()> {
        if self.echo {
            writeln!(self.console, "{text}")?;
            self.console.flush()?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn console(&self) -> &W {
        &self.console
    }

    pub fn into_console(self) -> W {
        self.console
    }
}
