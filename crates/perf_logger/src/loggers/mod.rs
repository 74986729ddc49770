//! Sinks that receive collected measurements.
//!
//! A [`PerformanceCollector`](crate::PerformanceCollector) calls
//! [`PerformanceLogger::report`] on each registered sink exactly once, when
//! the collector is finished or dropped.

mod file;
mod memory;
mod tracing_sink;

pub use file::{LogEntry, LogFileInfo, PerformanceFileLogger, DEFAULT_FILE_NAME, LOG_EXTENSION};
pub use memory::MemoryLogger;
pub use tracing_sink::TracingLogger;

use crate::data::PerformanceData;
use crate::error::PerfResult;

/// Output sink for performance measurements.
pub trait PerformanceLogger: Send {
    /// Receive every measurement of a run, in start order.
    fn report(&mut self, data: &[PerformanceData]) -> PerfResult<()>;

    /// Short label used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<L: PerformanceLogger + ?Sized> PerformanceLogger for Box<L> {
    fn report(&mut self, data: &[PerformanceData]) -> PerfResult<()> {
        (**self).report(data)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
