//! JSON file sink.
//!
//! Each report appends one [`LogEntry`] to a JSON array stored on disk:
//!
//! ```text
//! [
//!   {"Metadata": {"key": "value"}, "Data": [{"ClassName": ..., ...}]},
//!   {"Data": [...]}
//! ]
//! ```
//!
//! The whole file is read, extended and rewritten on every report so the
//! array stays valid. There is no file locking; concurrent writers to the
//! same file race and the last rewrite wins. Earlier entries are re-emitted
//! from their parsed form, so an explicit empty `"Metadata": {}` is dropped
//! and whitespace is compacted on the next report.
//!
//! A leading UTF-8 byte order mark is ignored when reading and not written
//! back.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::PerformanceLogger;
use crate::config::FileLoggerConfig;
use crate::data::PerformanceData;
use crate::error::{PerfLoggerError, PerfResult};

/// File name used when none is configured.
pub const DEFAULT_FILE_NAME: &str = "performance_log";

/// Extension appended to every log file.
pub const LOG_EXTENSION: &str = "json";

const DEFAULT_DIRECTORY: &str = "ScriptPerformanceLogs";

/// One reported batch as persisted in the log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    /// Caller-supplied labels for the batch
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
    /// Measurements in start order
    pub data: Vec<PerformanceData>,
}

/// Base name and directory of a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileInfo {
    file_name: String,
    directory: PathBuf,
}

impl LogFileInfo {
    /// `file_name` is given without extension.
    pub fn new(file_name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            directory: directory.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Default for LogFileInfo {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_NAME, std::env::temp_dir().join(DEFAULT_DIRECTORY))
    }
}

/// Sink that appends each report to a JSON array file.
///
/// # Example
///
/// ```no_run
/// use perf_logger::{LogFileInfo, PerformanceCollector, PerformanceFileLogger};
///
/// let mut file_logger = PerformanceFileLogger::with_file_info(LogFileInfo::new("backup", "/var/log/scripts"))
///     .with_include_date(true);
/// file_logger.add_metadata("script", "Backup").add_metadata("host", "node-1");
///
/// let mut collector = PerformanceCollector::new().with_logger(file_logger);
/// collector.measure("Backup", "Run", |_| {
///     // ... script body ...
/// });
/// collector.finish().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PerformanceFileLogger {
    log_file_info: LogFileInfo,
    include_date: bool,
    metadata: IndexMap<String, String>,
}

impl PerformanceFileLogger {
    /// Create a logger writing to the default location.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logger writing to the given file.
    pub fn with_file_info(log_file_info: LogFileInfo) -> Self {
        Self {
            log_file_info,
            ..Self::default()
        }
    }

    /// Build a logger from loaded configuration.
    pub fn from_config(config: FileLoggerConfig) -> Self {
        let mut logger = Self::with_file_info(config.file_info()).with_include_date(config.include_date);
        for (key, value) in config.metadata {
            logger.add_metadata(key, value);
        }
        logger
    }

    /// Append the current UTC date to the file name.
    pub fn with_include_date(mut self, include_date: bool) -> Self {
        self.include_date = include_date;
        self
    }

    pub fn set_include_date(&mut self, include_date: bool) {
        self.include_date = include_date;
    }

    pub fn include_date(&self) -> bool {
        self.include_date
    }

    pub fn log_file_info(&self) -> &LogFileInfo {
        &self.log_file_info
    }

    /// Attach a label to every subsequent report; an existing key is overwritten.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    /// Path the next report will write to.
    pub fn file_path(&self) -> PathBuf {
        self.file_path_for(Utc::now().date_naive())
    }

    /// Path for a report made on `date`.
    pub fn file_path_for(&self, date: NaiveDate) -> PathBuf {
        let stem = if self.include_date {
            format!("{}-{}", self.log_file_info.file_name, date.format("%Y-%m-%d"))
        } else {
            self.log_file_info.file_name.clone()
        };
        self.log_file_info
            .directory
            .join(format!("{}.{}", stem, LOG_EXTENSION))
    }

    /// Entries currently stored in the target file.
    ///
    /// A missing or blank file yields no entries.
    pub fn read_entries(&self) -> PerfResult<Vec<LogEntry>> {
        read_entries(&self.file_path())
    }

    fn append(&self, path: &Path, entry: LogEntry) -> PerfResult<usize> {
        let mut entries = read_entries(path)?;
        entries.push(entry);

        let directory = path.parent().unwrap_or(self.log_file_info.directory.as_path());
        fs::create_dir_all(directory).map_err(|e| PerfLoggerError::filesystem(directory, e))?;

        let json = serde_json::to_string(&entries)?;
        write_replacing(path, &json)?;
        Ok(entries.len())
    }
}

impl PerformanceLogger for PerformanceFileLogger {
    fn report(&mut self, data: &[PerformanceData]) -> PerfResult<()> {
        let path = self.file_path();
        let entry = LogEntry {
            metadata: self.metadata.clone(),
            data: data.to_vec(),
        };

        let count = self.append(&path, entry)?;
        tracing::debug!(
            target: "perf_logger",
            path = %path.display(),
            records = data.len(),
            entries = count,
            "performance log updated"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn read_entries(path: &Path) -> PerfResult<Vec<LogEntry>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PerfLoggerError::filesystem(path, e)),
    };

    let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    // Invalid UTF-8 is reported by serde_json as a syntax error.
    serde_json::from_slice(content).map_err(|source| PerfLoggerError::Deserialization {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temp file, then rename over the target so a failed
/// write leaves the previous log intact.
fn write_replacing(path: &Path, content: &str) -> PerfResult<()> {
    let temp_path = path.with_extension(format!("{}.tmp", LOG_EXTENSION));
    fs::write(&temp_path, content).map_err(|e| PerfLoggerError::filesystem(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        PerfLoggerError::filesystem(path, e)
    })
}
