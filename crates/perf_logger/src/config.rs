//! File logger configuration.
//!
//! Scripts usually keep logger settings next to the script itself:
//!
//! ```json
//! {
//!   "file_name": "backup",
//!   "directory": "/var/log/scripts",
//!   "include_date": true,
//!   "metadata": { "script": "Backup" }
//! }
//! ```
//!
//! Every field is optional; missing fields fall back to the defaults of
//! [`LogFileInfo`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PerfLoggerError, PerfResult};
use crate::loggers::{LogFileInfo, DEFAULT_FILE_NAME};

/// Settings for a [`PerformanceFileLogger`](crate::PerformanceFileLogger).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggerConfig {
    /// Log file name without extension
    pub file_name: String,
    /// Directory holding the log file; `None` uses the default location
    pub directory: Option<PathBuf>,
    /// Append the current UTC date to the file name
    pub include_date: bool,
    /// Labels attached to every report
    pub metadata: IndexMap<String, String>,
}

impl Default for FileLoggerConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_FILE_NAME.to_string(),
            directory: None,
            include_date: false,
            metadata: IndexMap::new(),
        }
    }
}

impl FileLoggerConfig {
    /// Load configuration from a JSON file.
    ///
    /// Unlike the log file itself, a missing config file is an error: the
    /// caller asked for that specific file.
    pub fn load(path: impl AsRef<Path>) -> PerfResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PerfLoggerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            PerfLoggerError::Serialization(source) => PerfLoggerError::Config {
                path: path.to_path_buf(),
                message: source.to_string(),
            },
            other => other,
        })
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> PerfResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        if config.file_name.trim().is_empty() {
            tracing::warn!(target: "perf_logger", "empty log file name in configuration, using default");
            return Ok(Self {
                file_name: DEFAULT_FILE_NAME.to_string(),
                ..config
            });
        }
        Ok(config)
    }

    /// Resolved file location.
    pub fn file_info(&self) -> LogFileInfo {
        match &self.directory {
            Some(directory) => LogFileInfo::new(self.file_name.clone(), directory.clone()),
            None => LogFileInfo::new(self.file_name.clone(), LogFileInfo::default().directory()),
        }
    }
}
