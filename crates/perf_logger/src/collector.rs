//! Invocation tracking and report dispatch.
//!
//! The collector keeps a stack of open invocations. Starting pushes a new
//! entry; stopping pops it, stamps its execution time and moves it into its
//! parent's children (or into the root list). Completed nodes are never
//! referenced from anywhere else, so the tree needs no back-pointers.
//!
//! # Example
//!
//! ```rust
//! use perf_logger::{MemoryLogger, PerformanceCollector};
//!
//! let sink = MemoryLogger::new();
//! let mut collector = PerformanceCollector::new().with_logger(sink.clone());
//!
//! collector.start("Script", "Run");
//! collector.measure("Script", "LoadElements", |_| {
//!     // ... work ...
//! });
//! collector.stop().unwrap();
//!
//! collector.finish().unwrap();
//! assert_eq!(sink.report_count(), 1);
//! assert_eq!(sink.reports()[0].len(), 2);
//! ```

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::data::{flatten_all, MethodInvocation, PerformanceData, RunResult};
use crate::error::{PerfLoggerError, PerfResult};
use crate::loggers::PerformanceLogger;

// =============================================================================
// Open Invocation
// =============================================================================

/// An invocation that has started but not stopped.
#[derive(Debug)]
struct OpenInvocation {
    class_name: String,
    method_name: String,
    start_time: DateTime<Utc>,
    children: Vec<MethodInvocation>,
}

impl OpenInvocation {
    fn into_invocation(self, now: DateTime<Utc>) -> MethodInvocation {
        // A wall clock stepping backwards must not yield a negative time.
        let elapsed = (now - self.start_time).to_std().unwrap_or(Duration::ZERO);
        MethodInvocation {
            data: PerformanceData::new(self.class_name, self.method_name, self.start_time, elapsed),
            children: self.children,
        }
    }
}

// =============================================================================
// Performance Collector
// =============================================================================

/// Records nested timed invocations for one run and reports them once.
///
/// Reporting happens in [`finish`](Self::finish) or, if that was never
/// called, when the collector is dropped. Either way each registered logger
/// receives the flattened measurements exactly once.
pub struct PerformanceCollector {
    clock: Box<dyn Clock>,
    open: Vec<OpenInvocation>,
    completed: Vec<MethodInvocation>,
    loggers: Vec<Box<dyn PerformanceLogger>>,
    reported: bool,
}

impl fmt::Debug for PerformanceCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceCollector")
            .field("open", &self.open)
            .field("completed", &self.completed)
            .field(
                "loggers",
                &self.loggers.iter().map(|l| l.name().to_string()).collect::<Vec<_>>(),
            )
            .field("reported", &self.reported)
            .finish()
    }
}

impl Default for PerformanceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceCollector {
    /// Create a collector timed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Create a collector with a custom time source.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            open: Vec::new(),
            completed: Vec::new(),
            loggers: Vec::new(),
            reported: false,
        }
    }

    /// Register a logger, builder style.
    pub fn with_logger(mut self, logger: impl PerformanceLogger + 'static) -> Self {
        self.add_logger(logger);
        self
    }

    /// Register a logger to receive the run's measurements.
    pub fn add_logger(&mut self, logger: impl PerformanceLogger + 'static) {
        self.loggers.push(Box::new(logger));
    }

    pub fn logger_count(&self) -> usize {
        self.loggers.len()
    }

    /// Open a new invocation under the current one.
    pub fn start(&mut self, class_name: impl Into<String>, method_name: impl Into<String>) {
        let invocation = OpenInvocation {
            class_name: class_name.into(),
            method_name: method_name.into(),
            start_time: crate::timefmt::truncate_instant(self.clock.now()),
            children: Vec::new(),
        };

        tracing::trace!(
            target: "perf_logger",
            class = %invocation.class_name,
            method = %invocation.method_name,
            depth = self.open.len(),
            "invocation started"
        );
        self.open.push(invocation);
    }

    /// Close the current invocation and return its measurement.
    ///
    /// # Errors
    ///
    /// Returns [`PerfLoggerError::InvalidOperation`] when nothing is open,
    /// which means start and stop calls are mismatched.
    pub fn stop(&mut self) -> PerfResult<PerformanceData> {
        let Some(open) = self.open.pop() else {
            tracing::error!(target: "perf_logger", "stop called without a matching start");
            return Err(PerfLoggerError::InvalidOperation(
                "stop called with no open invocation".to_string(),
            ));
        };

        let invocation = open.into_invocation(self.clock.now());
        let data = invocation.data.clone();

        tracing::trace!(
            target: "perf_logger",
            name = %data.qualified_name(),
            elapsed_ms = data.execution_time().as_secs_f64() * 1000.0,
            "invocation stopped"
        );

        match self.open.last_mut() {
            Some(parent) => parent.children.push(invocation),
            None => self.completed.push(invocation),
        }
        Ok(data)
    }

    /// Start an invocation that stops when the returned guard is dropped.
    ///
    /// The guard dereferences to the collector, so nested invocations can be
    /// opened through it.
    pub fn enter(
        &mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> InvocationGuard<'_> {
        let depth = self.open.len();
        self.start(class_name, method_name);
        InvocationGuard {
            collector: self,
            depth,
            closed: false,
        }
    }

    /// Time a closure as one invocation.
    ///
    /// Invocations the closure leaves open are closed along with this one.
    pub fn measure<T>(
        &mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let depth = self.open.len();
        self.start(class_name, method_name);
        let value = f(self);
        if let Err(e) = self.close_to(depth) {
            tracing::error!(target: "perf_logger", error = %e, "measured closure unbalanced the invocation stack");
        }
        value
    }

    /// Close open invocations until `depth` remain.
    fn close_to(&mut self, depth: usize) -> PerfResult<Option<PerformanceData>> {
        if self.open.len() <= depth {
            return Err(PerfLoggerError::InvalidOperation(format!(
                "expected more than {} open invocations, found {}",
                depth,
                self.open.len()
            )));
        }
        if self.open.len() > depth + 1 {
            tracing::warn!(
                target: "perf_logger",
                unclosed = self.open.len() - depth - 1,
                "closing nested invocations left open"
            );
        }
        let mut last = None;
        while self.open.len() > depth {
            last = Some(self.stop()?);
        }
        Ok(last)
    }

    /// Number of currently open invocations.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Whether nothing has been started yet.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty() && self.completed.is_empty()
    }

    /// Completed root-level invocations.
    pub fn invocations(&self) -> &[MethodInvocation] {
        &self.completed
    }

    /// Completed measurements, depth-first in start order.
    pub fn performance_data(&self) -> Vec<PerformanceData> {
        flatten_all(&self.completed)
    }

    /// Snapshot of the completed invocations as a [`RunResult`].
    pub fn to_result(&self) -> RunResult {
        RunResult::with_invocations(self.completed.clone())
    }

    /// Close anything still open and report to every logger.
    ///
    /// Every logger is called even if an earlier one fails. A single failure
    /// is returned as is; several are wrapped in
    /// [`PerfLoggerError::AggregateReport`].
    pub fn finish(mut self) -> PerfResult<()> {
        self.report_once()
    }

    fn report_once(&mut self) -> PerfResult<()> {
        if self.reported {
            return Ok(());
        }
        self.reported = true;

        if !self.open.is_empty() {
            tracing::warn!(
                target: "perf_logger",
                open = self.open.len(),
                "closing invocations left open at teardown"
            );
            while !self.open.is_empty() {
                let _ = self.stop();
            }
        }

        let data = self.performance_data();
        let mut failures = Vec::new();
        for logger in &mut self.loggers {
            if let Err(e) = logger.report(&data) {
                tracing::error!(
                    target: "perf_logger",
                    logger = logger.name(),
                    error = %e,
                    "performance logger failed"
                );
                failures.push(e);
            }
        }

        tracing::debug!(
            target: "perf_logger",
            records = data.len(),
            loggers = self.loggers.len(),
            failed = failures.len(),
            "performance data reported"
        );

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(PerfLoggerError::AggregateReport(failures)),
        }
    }
}

impl Drop for PerformanceCollector {
    fn drop(&mut self) {
        if let Err(e) = self.report_once() {
            tracing::error!(target: "perf_logger", error = %e, "performance report failed on drop");
        }
    }
}

// =============================================================================
// Invocation Guard
// =============================================================================

/// RAII guard that stops its invocation when dropped.
pub struct InvocationGuard<'a> {
    collector: &'a mut PerformanceCollector,
    depth: usize,
    closed: bool,
}

impl InvocationGuard<'_> {
    /// Stop the invocation now and return its measurement.
    pub fn close(mut self) -> PerfResult<PerformanceData> {
        self.closed = true;
        self.collector
            .close_to(self.depth)?
            .ok_or_else(|| PerfLoggerError::InvalidOperation("invocation already closed".to_string()))
    }
}

impl Deref for InvocationGuard<'_> {
    type Target = PerformanceCollector;

    fn deref(&self) -> &Self::Target {
        self.collector
    }
}

impl DerefMut for InvocationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.collector
    }
}

impl Drop for InvocationGuard<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.collector.close_to(self.depth) {
            tracing::error!(target: "perf_logger", error = %e, "invocation guard found its invocation already stopped");
        }
    }
}
