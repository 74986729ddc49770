//! Script Performance Logger
//!
//! Collects method-level execution timings during a script run and writes
//! them to a JSON log when the run ends:
//!
//! - [`PerformanceCollector`] tracks nested start/stop pairs as a tree
//! - [`PerformanceLogger`] is the sink capability called once per run
//! - [`PerformanceFileLogger`] appends each run to a JSON array file
//! - [`MemoryLogger`] and [`TracingLogger`] cover tests and console output
//!
//! # Example
//!
//! ```rust
//! use perf_logger::{LogFileInfo, PerformanceCollector, PerformanceFileLogger};
//!
//! let dir = std::env::temp_dir().join("perf_logger_doc");
//! let mut file_logger = PerformanceFileLogger::with_file_info(LogFileInfo::new("run", &dir));
//! file_logger.add_metadata("script", "Nightly");
//!
//! let mut collector = PerformanceCollector::new().with_logger(file_logger);
//! {
//!     let mut run = collector.enter("Nightly", "Run");
//!     let _load = run.enter("Nightly", "LoadElements");
//!     // ... script body ...
//! }
//!
//! // Reports to every logger; dropping the collector would do the same.
//! collector.finish().unwrap();
//! # std::fs::remove_dir_all(&dir).ok();
//! ```
//!
//! # Modules
//!
//! - [`collector`] - Invocation tree and report dispatch
//! - [`data`] - Measurement records and run results
//! - [`loggers`] - Sink trait and the file, memory and tracing sinks
//! - [`config`] - File logger configuration
//! - [`clock`] - Time sources
//! - [`timefmt`] - Duration and instant text formats

pub mod clock;
pub mod collector;
pub mod config;
pub mod data;
mod error;
pub mod loggers;
pub mod timefmt;
#[cfg(test)]
mod trace_capture;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::{InvocationGuard, PerformanceCollector};
pub use config::FileLoggerConfig;
pub use data::{MethodInvocation, PerformanceData, RunResult};
pub use error::{PerfLoggerError, PerfResult};
pub use loggers::{
    LogEntry, LogFileInfo, MemoryLogger, PerformanceFileLogger, PerformanceLogger, TracingLogger,
};
