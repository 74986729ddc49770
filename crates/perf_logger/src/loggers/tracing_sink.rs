//! Sink that forwards measurements to `tracing`.

use super::PerformanceLogger;
use crate::data::PerformanceData;
use crate::error::PerfResult;
use crate::timefmt;

/// Emits one `info` event per measurement under the `perf_logger` target.
///
/// Useful when the host already installs a subscriber and a log file per
/// run is overkill.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    label: Option<String>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with a run label.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl PerformanceLogger for TracingLogger {
    fn report(&mut self, data: &[PerformanceData]) -> PerfResult<()> {
        let label = self.label.as_deref().unwrap_or("");
        for record in data {
            tracing::info!(
                target: "perf_logger",
                run = label,
                class = %record.class_name(),
                method = %record.method_name(),
                start = %timefmt::display_instant(&record.start_time()),
                elapsed_ms = record.execution_time().as_secs_f64() * 1000.0,
                "method timing"
            );
        }
        tracing::debug!(target: "perf_logger", run = label, records = data.len(), "run reported");
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
