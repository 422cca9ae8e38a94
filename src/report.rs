//! The channel failed operations are reported through.

use tracing::error;

use crate::Error;

/// A failed operation together with the fixed context the façade attaches to it.
#[derive(Debug)]
pub struct Report {
    context: &'static str,
    cause: Error,
}

impl Report {
    /// Creates a new report.
    pub fn new(context: &'static str, cause: Error) -> Self {
        Self { context, cause }
    }

    /// Human readable description of the operation that failed.
    pub fn context(&self) -> &'static str {
        self.context
    }

    /// The error the operation failed with.
    pub fn cause(&self) -> &Error {
        &self.cause
    }

    /// Consumes the report, returning the error the operation failed with.
    pub fn into_cause(self) -> Error {
        self.cause
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.cause)
    }
}

impl std::error::Error for Report {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Receives the failures of façade operations, the host's error channel.
///
/// Reporting must not fail or panic, the façade carries on with a default value after
/// handing over a report.
pub trait ErrorReporter: Send + Sync {
    /// Handle a failed operation.
    fn report(&self, report: Report);
}

/// Reports failures as `tracing` events at the `ERROR` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: Report) {
        error!(
            context = report.context(),
            cause = %report.cause(),
            absence = report.cause().is_absence(),
            "operation failed"
        );
    }
}

impl<F> ErrorReporter for F
where
    F: Fn(Report) + Send + Sync,
{
    fn report(&self, report: Report) {
        self(report)
    }
}
