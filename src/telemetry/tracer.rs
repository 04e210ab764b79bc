//! Tracer and span handles for agent-run operations
//!
//! [`AgentTracer`] hands out [`AgentSpan`]s, queues them once they end, and
//! exports the queue on [`AgentTracer::flush`]. A disabled tracer hands out
//! inert spans whose every operation is a no-op.

use super::exporter::{
    AttributeValue, NoOpExporter, SpanData, SpanEvent, SpanExporter, SpanKind, SpanStatus,
};
use super::genai::{attrs, events};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub use opentelemetry::KeyValue;

/// Generate a random 128-bit trace ID as hex string
fn generate_trace_id() -> String {
    format!("{:032x}", fastrand::u128(..))
}

/// Generate a random 64-bit span ID as hex string
fn generate_span_id() -> String {
    format!("{:016x}", fastrand::u64(..))
}

/// Current time in nanoseconds since Unix epoch
fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Creates spans and exports them once they end
///
/// Cloning is cheap; clones share the pending queue and the exporter.
#[derive(Debug, Clone)]
pub struct AgentTracer {
    enabled: bool,
    exporter: Arc<dyn SpanExporter>,
    pending_spans: Arc<Mutex<Vec<SpanData>>>,
}

impl AgentTracer {
    /// Create an enabled tracer exporting to `exporter`
    pub fn new(exporter: Arc<dyn SpanExporter>) -> Self {
        Self {
            enabled: true,
            exporter,
            pending_spans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tracer whose spans record nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            exporter: Arc::new(NoOpExporter),
            pending_spans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open a new root span
    pub fn start_span(&self, name: &str, kind: SpanKind) -> AgentSpan {
        if !self.enabled {
            return AgentSpan::noop();
        }

        let data = SpanData {
            trace_id: generate_trace_id(),
            span_id: generate_span_id(),
            parent_span_id: None,
            name: name.to_string(),
            kind,
            start_time_unix_nano: now_nanos(),
            end_time_unix_nano: 0,
            attributes: HashMap::new(),
            status: SpanStatus::Unset,
            events: Vec::new(),
        };

        AgentSpan {
            inner: Some(Arc::new(Mutex::new(SpanState {
                data,
                ended: false,
                pending_spans: Arc::clone(&self.pending_spans),
            }))),
        }
    }

    /// Number of ended spans waiting for export
    pub fn pending_count(&self) -> usize {
        self.pending_spans.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Export all ended spans
    pub async fn flush(&self) -> Result<(), super::exporter::ExportError> {
        let spans = match self.pending_spans.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return Ok(()),
        };

        if !spans.is_empty() {
            tracing::debug!("Exporting {} spans", spans.len());
            self.exporter.export(spans).await?;
        }

        Ok(())
    }

    /// Flush pending spans, then shut the exporter down
    pub async fn shutdown(&self) -> Result<(), super::exporter::ExportError> {
        let flushed = self.flush().await;
        self.exporter.shutdown().await?;
        flushed
    }

    pub fn is_healthy(&self) -> bool {
        self.exporter.is_healthy()
    }
}

struct SpanState {
    data: SpanData,
    ended: bool,
    pending_spans: Arc<Mutex<Vec<SpanData>>>,
}

/// Handle to an open span
///
/// Clones refer to the same span. Recording after [`AgentSpan::end`] is ignored
/// and `end` itself is idempotent, so a span is queued for export exactly once.
#[derive(Clone, Default)]
pub struct AgentSpan {
    inner: Option<Arc<Mutex<SpanState>>>,
}

impl fmt::Debug for AgentSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span_id() {
            Some(id) => f.debug_struct("AgentSpan").field("span_id", &id).finish(),
            None => f.write_str("AgentSpan(noop)"),
        }
    }
}

impl AgentSpan {
    /// Span that records nothing
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Whether this span records anything
    pub fn is_recording(&self) -> bool {
        self.with_state(|state| !state.ended).unwrap_or(false)
    }

    pub fn trace_id(&self) -> Option<String> {
        self.with_state(|state| state.data.trace_id.clone())
    }

    pub fn span_id(&self) -> Option<String> {
        self.with_state(|state| state.data.span_id.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SpanState) -> R) -> Option<R> {
        let inner = self.inner.as_ref()?;
        let mut state = inner.lock().ok()?;
        Some(f(&mut state))
    }

    fn with_open_state(&self, f: impl FnOnce(&mut SpanState)) {
        self.with_state(|state| {
            if !state.ended {
                f(state);
            }
        });
    }

    /// Set an attribute on the span
    pub fn set_attribute(&self, key: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        self.with_open_state(|state| {
            state.data.attributes.insert(key.to_string(), value);
        });
    }

    /// Add a timestamped event to the span
    pub fn add_event(&self, name: &str, attributes: Vec<KeyValue>) {
        let event_attrs: HashMap<String, AttributeValue> = attributes
            .into_iter()
            .map(|kv| (kv.key.to_string(), AttributeValue::from(&kv.value)))
            .collect();

        self.with_open_state(|state| {
            state.data.events.push(SpanEvent {
                name: name.to_string(),
                time_unix_nano: now_nanos(),
                attributes: event_attrs,
            });
        });
    }

    /// Record an error as an `exception` event and mark the span ERROR
    ///
    /// `exception.stacktrace` carries the `Debug` rendering of the error.
    pub fn record_exception<E>(&self, error: &E)
    where
        E: std::error::Error + 'static,
    {
        self.record_exception_parts(
            error_type_name(error),
            &error.to_string(),
            &format!("{:?}", error),
        );
    }

    /// Record an exception from its parts and mark the span ERROR
    pub fn record_exception_parts(&self, kind: &str, message: &str, detail: &str) {
        self.add_event(
            events::EXCEPTION,
            vec![
                KeyValue::new(attrs::EXCEPTION_TYPE, kind.to_string()),
                KeyValue::new(attrs::EXCEPTION_MESSAGE, message.to_string()),
                KeyValue::new(attrs::EXCEPTION_STACKTRACE, detail.to_string()),
            ],
        );
        self.set_error(message);
    }

    /// Mark the span as failed
    pub fn set_error(&self, message: &str) {
        let message = message.to_string();
        self.with_open_state(|state| {
            state.data.status = SpanStatus::Error { message };
        });
    }

    /// Mark the span as successful
    ///
    /// An ERROR status already recorded is kept.
    pub fn set_success(&self) {
        self.with_open_state(|state| {
            if !matches!(state.data.status, SpanStatus::Error { .. }) {
                state.data.status = SpanStatus::Ok;
            }
        });
    }

    /// End the span and queue it for export
    ///
    /// Returns `true` only for the call that actually ended the span.
    pub fn end(&self) -> bool {
        self.with_state(|state| {
            if state.ended {
                return false;
            }
            state.ended = true;
            state.data.end_time_unix_nano = now_nanos();
            if let Ok(mut pending) = state.pending_spans.lock() {
                pending.push(state.data.clone());
            }
            true
        })
        .unwrap_or(false)
    }
}

/// `exception.type` for an error: the variant name for [`crate::QuipError`],
/// otherwise the Rust type name
fn error_type_name<E>(error: &E) -> &'static str
where
    E: std::error::Error + 'static,
{
    let error: &(dyn std::error::Error + 'static) = error;
    match error.downcast_ref::<crate::QuipError>() {
        Some(quip) => quip.kind(),
        None => std::any::type_name::<E>(),
    }
}
