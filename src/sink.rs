use crate::error::Error;

/// Observer notified whenever a statement fails.
///
/// Invoked synchronously, before the failure is returned to the caller or
/// the process is terminated. It cannot alter control flow. Connection
/// failures are logged by the handle and never reach the sink.
pub trait DiagnosticSink: Send + Sync {
    fn on_query_failure(&self, error: &Error);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Error) + Send + Sync,
{
    fn on_query_failure(&self, error: &Error) {
        self(error)
    }
}

/// Default sink: logs each failure once through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn on_query_failure(&self, error: &Error) {
        tracing::error!(sql = error.sql(), code = error.code(), "{error}");
    }
}
