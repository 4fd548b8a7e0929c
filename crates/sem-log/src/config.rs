//! Logger configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use sem_types::{config_error, FormatPolicy, LogResult};

/// Settings shared by every [`MetricLog`](crate::MetricLog) built from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Directory holding the `.csv`/`.out`/`.cpt` files. Created on demand.
    pub base_dir: PathBuf,

    /// How many trailing components of the program path go into the stem.
    pub program_segments: usize,

    /// Length of the random lowercase tag that keeps stems unique.
    pub tag_len: usize,

    /// `chrono` strftime pattern for the stem timestamp.
    pub timestamp_format: String,

    /// Stamp stems in UTC instead of local time.
    pub utc: bool,

    /// Echo report lines to the console as well as the `.out` file.
    pub echo_console: bool,

    pub formats: FormatPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./logs"),
            program_segments: 3,
            tag_len: 3,
            timestamp_format: "%m-%d-%H:%M".to_string(),
            utc: false,
            echo_console: true,
            formats: FormatPolicy::default(),
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> LogResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LogResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> LogResult<()> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(config_error!("base_dir must not be empty"));
        }
        if self.timestamp_format.trim().is_empty() {
            return Err(config_error!("timestamp_format must not be empty"));
        }
        Ok(())
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn with_formats(mut self, formats: FormatPolicy) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_tag_len(mut self, len: usize) -> Self {
        self.tag_len = len;
        self
    }

    pub fn with_utc(mut self, utc: bool) -> Self {
        self.utc = utc;
        self
    }

    pub fn with_echo_console(mut self, echo: bool) -> Self {
        self.echo_console = echo;
        self
    }
}
