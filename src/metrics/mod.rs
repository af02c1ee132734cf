//! Operation metrics for the contact service.
//!
//! Per-operation counters: calls, failures by error kind and total
//! duration. Counters are lock-free and shared between clones.

use crate::error::ErrorKind;
use serde::Serialize;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A contact service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CreateContact,
    GetContact,
    UpdateContact,
    DeleteContact,
    ListContacts,
    Search,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::CreateContact,
        Operation::GetContact,
        Operation::UpdateContact,
        Operation::DeleteContact,
        Operation::ListContacts,
        Operation::Search,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::CreateContact => "create_contact",
            Operation::GetContact => "get_contact",
            Operation::UpdateContact => "update_contact",
            Operation::DeleteContact => "delete_contact",
            Operation::ListContacts => "list_contacts",
            Operation::Search => "search",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct OperationCounters {
    calls: AtomicU64,
    validation_errors: AtomicU64,
    not_found_errors: AtomicU64,
    internal_errors: AtomicU64,
    duration_total_ms: AtomicU64,
}

impl OperationCounters {
    fn errors(&self, kind: ErrorKind) -> &AtomicU64 {
        match kind {
            ErrorKind::Validation => &self.validation_errors,
            ErrorKind::NotFound => &self.not_found_errors,
            ErrorKind::Internal => &self.internal_errors,
        }
    }

    fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.validation_errors.store(0, Ordering::Relaxed);
        self.not_found_errors.store(0, Ordering::Relaxed);
        self.internal_errors.store(0, Ordering::Relaxed);
        self.duration_total_ms.store(0, Ordering::Relaxed);
    }
}

/// Metrics collector for contact service operations.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    operations: Arc<[OperationCounters; 6]>,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, operation: Operation) -> &OperationCounters {
        &self.operations[operation.index()]
    }

    /// Record one finished call. `failure` is the error kind it failed with.
    pub fn record(&self, operation: Operation, duration: Duration, failure: Option<ErrorKind>) {
        let counters = self.counters(operation);
        counters.calls.fetch_add(1, Ordering::Relaxed);
        counters
            .duration_total_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        if let Some(kind) = failure {
            counters.errors(kind).fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total calls of `operation`.
    pub fn calls(&self, operation: Operation) -> u64 {
        self.counters(operation).calls.load(Ordering::Relaxed)
    }

    /// Calls of `operation` that failed with `kind`.
    pub fn errors(&self, operation: Operation, kind: ErrorKind) -> u64 {
        self.counters(operation).errors(kind).load(Ordering::Relaxed)
    }

    /// Total time spent in `operation`, in milliseconds.
    pub fn duration_total_ms(&self, operation: Operation) -> u64 {
        self.counters(operation)
            .duration_total_ms
            .load(Ordering::Relaxed)
    }

    /// Average duration of `operation` in milliseconds.
    pub fn duration_avg_ms(&self, operation: Operation) -> f64 {
        let total = self.duration_total_ms(operation);
        let count = self.calls(operation);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.operations.iter().for_each(OperationCounters::reset);
    }

    /// Get a summary of all metrics.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            operations: Operation::ALL
                .iter()
                .map(|&operation| OperationSummary {
                    operation,
                    calls: self.calls(operation),
                    validation_errors: self.errors(operation, ErrorKind::Validation),
                    not_found_errors: self.errors(operation, ErrorKind::NotFound),
                    internal_errors: self.errors(operation, ErrorKind::Internal),
                    duration_total_ms: self.duration_total_ms(operation),
                    duration_avg_ms: self.duration_avg_ms(operation),
                })
                .collect(),
        }
    }
}

/// Snapshot of one operation's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub operation: Operation,
    pub calls: u64,
    pub validation_errors: u64,
    pub not_found_errors: u64,
    pub internal_errors: u64,
    pub duration_total_ms: u64,
    pub duration_avg_ms: f64,
}

/// A snapshot of metrics values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub operations: Vec<OperationSummary>,
}

impl MetricsSummary {
    /// The snapshot for one operation.
    pub fn operation(&self, operation: Operation) -> Option<&OperationSummary> {
        self.operations.iter().find(|s| s.operation == operation)
    }

    /// Render in the Prometheus text exposition format.
    pub fn to_prometheus(&self) -> String {
        let mut out = String::new();
        out.push_str("# TYPE phonebook_operation_calls_total counter\n");
        for s in &self.operations {
            let _ = writeln!(
                out,
                "phonebook_operation_calls_total{{operation=\"{}\"}} {}",
                s.operation.as_str(),
                s.calls
            );
        }
        out.push_str("# TYPE phonebook_operation_errors_total counter\n");
        for s in &self.operations {
            for (kind, count) in [
                (ErrorKind::Validation, s.validation_errors),
                (ErrorKind::NotFound, s.not_found_errors),
                (ErrorKind::Internal, s.internal_errors),
            ] {
                let _ = writeln!(
                    out,
                    "phonebook_operation_errors_total{{operation=\"{}\",kind=\"{}\"}} {}",
                    s.operation.as_str(),
                    kind,
                    count
                );
            }
        }
        out.push_str("# TYPE phonebook_operation_duration_ms_total counter\n");
        for s in &self.operations {
            let _ = writeln!(
                out,
                "phonebook_operation_duration_ms_total{{operation=\"{}\"}} {}",
                s.operation.as_str(),
                s.duration_total_ms
            );
        }
        out
    }
}

/// Helper for timing one service operation.
pub struct OperationTimer {
    start: Instant,
    operation: Operation,
    metrics: Metrics,
}

impl OperationTimer {
    /// Start timing `operation`.
    pub fn new(metrics: Metrics, operation: Operation) -> Self {
        Self {
            start: Instant::now(),
            operation,
            metrics,
        }
    }

    /// Complete the timing and record a success.
    pub fn complete(self) {
        self.metrics
            .record(self.operation, self.start.elapsed(), None);
    }

    /// Complete the timing and record a failure of `kind`.
    pub fn complete_with_error(self, kind: ErrorKind) {
        self.metrics
            .record(self.operation, self.start.elapsed(), Some(kind));
    }
}
