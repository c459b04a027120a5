use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

/// Opaque handle for a span opened by [`SpanObserver::begin_span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanId(pub u64);

/// Outcome reported when a span closes.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanStatus {
    Ok,
    Error { message: String },
}

impl SpanStatus {
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }
}

/// Injected telemetry hook.
///
/// The core opens a span around each send dispatch, each participant
/// receive, each graph step, and one enclosing span per top-level run.
/// When an instrumented unit fails, the span is closed with an error
/// status carrying the failure's description before the error propagates.
/// The observer is a side channel only; swapping it never changes core
/// behavior.
pub trait SpanObserver: Send + Sync {
    fn begin_span(&self, name: &str, attributes: &[(&str, String)]) -> SpanId;

    fn end_span(&self, span: SpanId, status: SpanStatus, attributes: &[(&str, String)]);
}

/// Observer that drops everything. The default backend.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SpanObserver for NoopObserver {
    fn begin_span(&self, _name: &str, _attributes: &[(&str, String)]) -> SpanId {
        SpanId(0)
    }

    fn end_span(&self, _span: SpanId, _status: SpanStatus, _attributes: &[(&str, String)]) {}
}

/// Observer that emits structured `tracing` events for span boundaries.
#[derive(Debug, Default)]
pub struct LogObserver {
    next_id: AtomicU64,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpanObserver for LogObserver {
    fn begin_span(&self, name: &str, attributes: &[(&str, String)]) -> SpanId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(span = id, name = %name, attrs = ?attributes, "span begin");
        SpanId(id)
    }

    fn end_span(&self, span: SpanId, status: SpanStatus, attributes: &[(&str, String)]) {
        match status {
            SpanStatus::Ok => debug!(span = span.0, attrs = ?attributes, "span end"),
            SpanStatus::Error { message } => {
                debug!(span = span.0, error = %message, attrs = ?attributes, "span end with error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_observer_ids_are_distinct() {
        let observer = LogObserver::new();
        let a = observer.begin_span("first", &[]);
        let b = observer.begin_span("second", &[("key", "value".into())]);
        assert_ne!(a, b);
        observer.end_span(a, SpanStatus::Ok, &[]);
        observer.end_span(b, SpanStatus::error("boom"), &[]);
    }

    #[test]
    fn test_error_status_carries_message() {
        let status = SpanStatus::error("unmapped label");
        assert_eq!(
            status,
            SpanStatus::Error {
                message: "unmapped label".into()
            }
        );
    }
}
