//! Span-per-operation wrapper
//!
//! [`with_span`] opens a span, hands a handle to the wrapped operation, maps the
//! operation's error onto the span and closes the span exactly once. The span is
//! closed by a drop guard, so it also closes when the operation panics or the
//! request future is dropped mid-flight.

use super::exporter::SpanKind;
use super::tracer::{AgentSpan, AgentTracer};
use std::future::Future;

/// Closes its span when dropped
///
/// Dropping an unfinished guard during a panic records the panic on the span
/// before closing it.
#[derive(Debug)]
pub struct SpanGuard {
    span: AgentSpan,
}

impl SpanGuard {
    pub fn new(span: AgentSpan) -> Self {
        Self { span }
    }

    pub fn span(&self) -> &AgentSpan {
        &self.span
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        if !self.span.is_recording() {
            return;
        }
        if std::thread::panicking() {
            self.span
                .record_exception_parts("panic", "operation panicked", "panic while span was open");
        }
        self.span.end();
    }
}

/// Run `operation` inside a span named `name`
///
/// On `Ok` the span status is OK. On `Err` the error is recorded on the span as
/// an exception with ERROR status and returned unchanged.
pub async fn with_span<F, Fut, T, E>(
    tracer: &AgentTracer,
    name: &str,
    kind: SpanKind,
    operation: F,
) -> Result<T, E>
where
    F: FnOnce(AgentSpan) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    let guard = SpanGuard::new(tracer.start_span(name, kind));

    let result = operation(guard.span().clone()).await;
    match &result {
        Ok(_) => guard.span().set_success(),
        Err(error) => guard.span().record_exception(error),
    }

    drop(guard);
    result
}
