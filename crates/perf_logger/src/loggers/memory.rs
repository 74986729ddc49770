//! In-memory sink.

use std::sync::{Arc, Mutex};

use super::PerformanceLogger;
use crate::data::PerformanceData;
use crate::error::PerfResult;

/// Keeps every reported batch in memory.
///
/// Clones share storage: register one clone with a collector and inspect
/// the batches through another after the collector is finished.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    reports: Arc<Mutex<Vec<Vec<PerformanceData>>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches received so far, oldest first.
    pub fn reports(&self) -> Vec<Vec<PerformanceData>> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().map(|reports| reports.len()).unwrap_or(0)
    }

    pub fn last_report(&self) -> Option<Vec<PerformanceData>> {
        self.reports
            .lock()
            .ok()
            .and_then(|reports| reports.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.clear();
        }
    }
}

impl PerformanceLogger for MemoryLogger {
    fn report(&mut self, data: &[PerformanceData]) -> PerfResult<()> {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(data.to_vec());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
