//! Measurement records and the invocation tree.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PerfResult;
use crate::timefmt::{self, instant_serde, timespan_serde};

// =============================================================================
// Performance Data
// =============================================================================

/// A single timed measurement.
///
/// Start time and execution time are kept at tick (100 ns) precision so a
/// record read back from a log file compares equal to the one written. The
/// fields are only set through [`new`](Self::new) and deserialization, which
/// both keep that precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PerformanceData {
    /// Type or module that owns the measured method
    class_name: String,
    /// Name of the measured method or region
    method_name: String,
    /// When the invocation started
    #[serde(with = "instant_serde")]
    start_time: DateTime<Utc>,
    /// How long the invocation ran
    #[serde(with = "timespan_serde")]
    execution_time: Duration,
}

impl PerformanceData {
    /// Create a completed measurement.
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        start_time: DateTime<Utc>,
        execution_time: Duration,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            start_time: timefmt::truncate_instant(start_time),
            execution_time: timefmt::truncate_duration(execution_time),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// When the invocation started, in UTC.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// `Class.Method` label used in log output.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }

    /// When the invocation finished.
    pub fn end_time(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.execution_time)
            .ok()
            .and_then(|elapsed| self.start_time.checked_add_signed(elapsed))
            .unwrap_or(self.start_time)
    }
}

// =============================================================================
// Method Invocation
// =============================================================================

/// One node of the call hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MethodInvocation {
    /// Measurement for this call
    pub data: PerformanceData,
    /// Calls made while this one was open, in start order
    #[serde(default)]
    pub children: Vec<MethodInvocation>,
}

impl MethodInvocation {
    /// Create a leaf invocation.
    pub fn new(data: PerformanceData) -> Self {
        Self {
            data,
            children: Vec::new(),
        }
    }

    /// Attach a child invocation.
    pub fn with_child(mut self, child: MethodInvocation) -> Self {
        self.children.push(child);
        self
    }

    /// Total invocation count including all descendants.
    pub fn total_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.total_count()).sum::<usize>()
    }

    /// Depth-first, parent-before-children sequence of measurements.
    pub fn flatten(&self) -> Vec<PerformanceData> {
        let mut out = Vec::with_capacity(self.total_count());
        self.flatten_into(&mut out);
        out
    }

    pub(crate) fn flatten_into(&self, out: &mut Vec<PerformanceData>) {
        out.push(self.data.clone());
        for child in &self.children {
            child.flatten_into(out);
        }
    }

    /// Time spent in this call excluding its children.
    pub fn self_time(&self) -> Duration {
        let children_time: Duration = self.children.iter().map(|c| c.data.execution_time).sum();
        self.data.execution_time.saturating_sub(children_time)
    }
}

/// Flatten a forest of invocations in start order.
pub fn flatten_all(invocations: &[MethodInvocation]) -> Vec<PerformanceData> {
    let total = invocations.iter().map(|i| i.total_count()).sum();
    let mut out = Vec::with_capacity(total);
    for invocation in invocations {
        invocation.flatten_into(&mut out);
    }
    out
}

// =============================================================================
// Run Result
// =============================================================================

/// Everything measured in one run, plus free-form properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunResult {
    /// Root-level invocations
    pub method_invocations: Vec<MethodInvocation>,
    /// Arbitrary run properties
    pub properties: IndexMap<String, String>,
}

impl RunResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a result over existing root invocations.
    pub fn with_invocations(method_invocations: Vec<MethodInvocation>) -> Self {
        Self {
            method_invocations,
            properties: IndexMap::new(),
        }
    }

    /// Set a property, replacing any previous value. Properties serialize in
    /// the order they were first added.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// All measurements in start order.
    pub fn flatten(&self) -> Vec<PerformanceData> {
        flatten_all(&self.method_invocations)
    }

    /// Serialize to a compact JSON string.
    pub fn serialize(&self) -> PerfResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
