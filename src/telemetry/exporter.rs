//! Span exporter traits and implementations
//!
//! Finished spans are handed to a [`SpanExporter`] in batches. Exporters for an
//! OTLP/HTTP collector, the console, tests (in-memory) and a disabled pipeline
//! (no-op) live here, together with the OTLP JSON encoding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error during span export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The collector rejected our credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error during export
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Rate limited by the backend
    #[error("Rate limited")]
    RateLimited,

    /// Export timeout
    #[error("Export timeout after {0:?}")]
    Timeout(Duration),

    /// Backend returned an error
    #[error("Backend error: {status_code} - {message}")]
    Backend { status_code: u16, message: String },

    /// Exporter could not be constructed
    #[error("Exporter initialization failed: {0}")]
    Init(String),
}

impl ExportError {
    /// Whether a later attempt could succeed
    fn is_transient(&self) -> bool {
        match self {
            ExportError::Network(_) | ExportError::RateLimited | ExportError::Timeout(_) => true,
            ExportError::Backend { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Data for a single finished span
#[derive(Debug, Clone)]
pub struct SpanData {
    /// Trace ID (128-bit hex string)
    pub trace_id: String,
    /// Span ID (64-bit hex string)
    pub span_id: String,
    /// Parent span ID, if any
    pub parent_span_id: Option<String>,
    /// Operation name, e.g. `joke-request`
    pub name: String,
    pub kind: SpanKind,
    /// Start time in nanoseconds since Unix epoch
    pub start_time_unix_nano: u64,
    /// End time in nanoseconds since Unix epoch
    pub end_time_unix_nano: u64,
    pub attributes: HashMap<String, AttributeValue>,
    pub status: SpanStatus,
    /// Events in the order they were recorded
    pub events: Vec<SpanEvent>,
}

impl SpanData {
    /// Attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// First event with the given name
    pub fn event(&self, name: &str) -> Option<&SpanEvent> {
        self.events.iter().find(|e| e.name == name)
    }
}

/// Kind of span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Internal operation
    Internal,
    /// Server handling a request
    Server,
    /// Client making a request
    Client,
    /// Producer sending a message
    Producer,
    /// Consumer receiving a message
    Consumer,
}

/// Status of a span
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    Unset,
    Ok,
    Error { message: String },
}

/// Value of a span or event attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    StringArray(Vec<String>),
}

impl AttributeValue {
    /// String content, if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Int(i) => write!(f, "{}", i),
            AttributeValue::Float(x) => write!(f, "{}", x),
            AttributeValue::StringArray(a) => write!(f, "[{}]", a.join(", ")),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<u64> for AttributeValue {
    fn from(i: u64) -> Self {
        AttributeValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<&opentelemetry::Value> for AttributeValue {
    fn from(value: &opentelemetry::Value) -> Self {
        match value {
            opentelemetry::Value::String(s) => AttributeValue::String(s.as_str().to_string()),
            opentelemetry::Value::Bool(b) => AttributeValue::Bool(*b),
            opentelemetry::Value::I64(i) => AttributeValue::Int(*i),
            opentelemetry::Value::F64(f) => AttributeValue::Float(*f),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

/// Event that occurred during a span
#[derive(Debug, Clone)]
pub struct SpanEvent {
    pub name: String,
    /// Time of the event in nanoseconds since Unix epoch
    pub time_unix_nano: u64,
    pub attributes: HashMap<String, AttributeValue>,
}

impl SpanEvent {
    /// Attribute value by key
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Trait for exporting spans to observability backends
///
/// # Example
///
/// ```ignore
/// use quip::telemetry::exporter::{ExportError, SpanData, SpanExporter};
///
/// #[derive(Debug)]
/// struct MyExporter;
///
/// #[async_trait::async_trait]
/// impl SpanExporter for MyExporter {
///     async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
///         // Send spans to backend
///         Ok(())
///     }
///
///     async fn shutdown(&self) -> Result<(), ExportError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait SpanExporter: Send + Sync + std::fmt::Debug {
    /// Export a batch of spans to the backend
    ///
    /// Implementations must not panic on export failure.
    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError>;

    /// Flush and release resources
    async fn shutdown(&self) -> Result<(), ExportError>;

    /// Whether the exporter is ready to accept spans
    fn is_healthy(&self) -> bool {
        true
    }
}

/// No-op exporter that discards all spans
///
/// Used when telemetry is disabled.
#[derive(Debug, Clone, Default)]
pub struct NoOpExporter;

#[async_trait]
impl SpanExporter for NoOpExporter {
    async fn export(&self, _spans: Vec<SpanData>) -> Result<(), ExportError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Exporter that keeps every exported span in memory
///
/// Clones share the same storage, so a test can keep one handle and give the
/// other to the tracer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
}

impl InMemoryExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all spans exported so far
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Exported spans with the given name
    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.spans()
            .into_iter()
            .filter(|s| s.name == name)
            .collect()
    }

    /// Drop everything collected so far
    pub fn reset(&self) {
        if let Ok(mut spans) = self.spans.lock() {
            spans.clear();
        }
    }
}

#[async_trait]
impl SpanExporter for InMemoryExporter {
    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
        let mut stored = self
            .spans
            .lock()
            .map_err(|e| ExportError::Backend {
                status_code: 0,
                message: format!("span store poisoned: {}", e),
            })?;
        stored.extend(spans);
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Exporter that writes each finished span to the log
#[derive(Debug, Clone, Default)]
pub struct ConsoleExporter;

#[async_trait]
impl SpanExporter for ConsoleExporter {
    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
        for span in spans {
            let duration_ms =
                span.end_time_unix_nano.saturating_sub(span.start_time_unix_nano) / 1_000_000;
            let attributes = span
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            let events = span
                .events
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(",");
            tracing::info!(
                target: "quip::spans",
                trace_id = %span.trace_id,
                span_id = %span.span_id,
                status = ?span.status,
                duration_ms,
                events = %events,
                "span {} {}",
                span.name,
                attributes
            );
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Exporter that forwards every batch to several exporters
///
/// A failure of one exporter does not stop the others; the first error is returned.
#[derive(Debug, Clone)]
pub struct FanoutExporter {
    exporters: Vec<Arc<dyn SpanExporter>>,
}

impl FanoutExporter {
    pub fn new(exporters: Vec<Arc<dyn SpanExporter>>) -> Self {
        Self { exporters }
    }
}

#[async_trait]
impl SpanExporter for FanoutExporter {
    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
        let mut first_error = None;
        for exporter in &self.exporters {
            if let Err(e) = exporter.export(spans.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        let mut first_error = None;
        for exporter in &self.exporters {
            if let Err(e) = exporter.shutdown().await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn is_healthy(&self) -> bool {
        self.exporters.iter().all(|e| e.is_healthy())
    }
}

// ============================================================================
// OTLP JSON encoding
// ============================================================================

/// OTLP/JSON encoding of finished spans
///
/// Field names and value shapes follow
/// <https://opentelemetry.io/docs/specs/otlp/#json-protobuf-encoding>:
/// camelCase keys, 64-bit integers and nanosecond timestamps as strings.
pub mod otlp {
    use super::{AttributeValue, ExportError, SpanData, SpanKind, SpanStatus};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Instrumentation scope and SDK name reported with every batch
    pub const SCOPE_NAME: &str = "quip";

    /// OTLP `AnyValue` for an attribute
    pub fn any_value(value: &AttributeValue) -> Value {
        match value {
            AttributeValue::String(s) => json!({ "stringValue": s }),
            AttributeValue::Bool(b) => json!({ "boolValue": b }),
            AttributeValue::Int(i) => json!({ "intValue": i.to_string() }),
            AttributeValue::Float(f) => json!({ "doubleValue": f }),
            AttributeValue::StringArray(items) => json!({
                "arrayValue": {
                    "values": items.iter().map(|s| json!({ "stringValue": s })).collect::<Vec<_>>()
                }
            }),
        }
    }

    /// OTLP `SpanKind` enum value
    pub fn kind_code(kind: &SpanKind) -> u32 {
        match kind {
            SpanKind::Internal => 1,
            SpanKind::Server => 2,
            SpanKind::Client => 3,
            SpanKind::Producer => 4,
            SpanKind::Consumer => 5,
        }
    }

    /// OTLP `Status`; only ERROR carries a message
    pub fn status(status: &SpanStatus) -> Value {
        match status {
            SpanStatus::Unset => json!({ "code": 0 }),
            SpanStatus::Ok => json!({ "code": 1 }),
            SpanStatus::Error { message } => json!({ "code": 2, "message": message }),
        }
    }

    /// Attributes sorted by key
    fn key_values(attributes: &HashMap<String, AttributeValue>) -> Vec<Value> {
        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| json!({ "key": key, "value": any_value(&attributes[key]) }))
            .collect()
    }

    fn span(data: &SpanData) -> Value {
        let mut span = json!({
            "traceId": data.trace_id,
            "spanId": data.span_id,
            "name": data.name,
            "kind": kind_code(&data.kind),
            "startTimeUnixNano": data.start_time_unix_nano.to_string(),
            "endTimeUnixNano": data.end_time_unix_nano.to_string(),
            "attributes": key_values(&data.attributes),
            "status": status(&data.status),
        });
        if let Some(parent) = &data.parent_span_id {
            span["parentSpanId"] = json!(parent);
        }
        if !data.events.is_empty() {
            span["events"] = data
                .events
                .iter()
                .map(|event| {
                    json!({
                        "name": event.name,
                        "timeUnixNano": event.time_unix_nano.to_string(),
                        "attributes": key_values(&event.attributes),
                    })
                })
                .collect();
        }
        span
    }

    /// Serialize spans to an `ExportTraceServiceRequest` body
    pub fn serialize_spans(
        spans: &[SpanData],
        service_name: &str,
        service_version: &str,
    ) -> Result<Vec<u8>, ExportError> {
        let resource: Vec<Value> = [
            ("service.name", service_name),
            ("service.version", service_version),
            ("telemetry.sdk.name", SCOPE_NAME),
            ("telemetry.sdk.language", "rust"),
        ]
        .into_iter()
        .map(|(key, value)| json!({ "key": key, "value": { "stringValue": value } }))
        .collect();

        let request = json!({
            "resourceSpans": [{
                "resource": { "attributes": resource },
                "scopeSpans": [{
                    "scope": { "name": SCOPE_NAME, "version": env!("CARGO_PKG_VERSION") },
                    "spans": spans.iter().map(span).collect::<Vec<_>>(),
                }],
            }],
        });

        serde_json::to_vec(&request).map_err(|e| ExportError::Serialization(e.to_string()))
    }
}

// ============================================================================
// OTLP/HTTP Exporter
// ============================================================================

/// Number of retries after the first failed export attempt
const OTLP_MAX_RETRIES: u32 = 2;

/// Exporter that posts OTLP JSON to `<endpoint>/v1/traces`
#[derive(Debug)]
pub struct OtlpHttpExporter {
    /// Full traces URL
    endpoint: String,
    headers: HashMap<String, String>,
    service_name: String,
    service_version: String,
    client: reqwest::Client,
    healthy: Arc<AtomicBool>,
    timeout: Duration,
}

impl OtlpHttpExporter {
    /// Create an exporter for the given collector base URL
    pub fn new(
        endpoint: &str,
        headers: HashMap<String, String>,
        service_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ExportError> {
        let base = url::Url::parse(endpoint)
            .map_err(|e| ExportError::Init(format!("invalid OTLP endpoint '{}': {}", endpoint, e)))?;
        let endpoint = traces_url(base.as_str());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::Init(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            headers,
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            client,
            healthy: Arc::new(AtomicBool::new(true)),
            timeout,
        })
    }

    /// URL spans are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Export spans with retry logic
    async fn export_with_retry(
        &self,
        spans: Vec<SpanData>,
        max_retries: u32,
    ) -> Result<(), ExportError> {
        let body = otlp::serialize_spans(&spans, &self.service_name, &self.service_version)?;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                // Exponential backoff: 100ms, 200ms, ...
                let delay = Duration::from_millis(100 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
            }

            match self.try_export(body.clone()).await {
                Ok(()) => {
                    self.healthy.store(true, Ordering::Relaxed);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("OTLP export attempt {} failed: {}", attempt + 1, e);
                    let transient = e.is_transient();
                    last_error = Some(e);
                    if !transient {
                        break;
                    }
                }
            }
        }

        self.healthy.store(false, Ordering::Relaxed);
        Err(last_error.unwrap_or_else(|| ExportError::Network("Unknown error".to_string())))
    }

    /// Try to export a serialized batch once
    async fn try_export(&self, body: Vec<u8>) -> Result<(), ExportError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExportError::Timeout(self.timeout)
            } else {
                ExportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let response_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read response".to_string());
        tracing::debug!("OTLP response: status={}, body={}", status, response_text);

        match status.as_u16() {
            401 | 403 => Err(ExportError::Auth(response_text)),
            429 => Err(ExportError::RateLimited),
            code => Err(ExportError::Backend {
                status_code: code,
                message: response_text,
            }),
        }
    }
}

/// Append `/v1/traces` to a collector base URL unless it is already there
fn traces_url(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/v1/traces") {
        trimmed.to_string()
    } else {
        format!("{}/v1/traces", trimmed)
    }
}

#[async_trait]
impl SpanExporter for OtlpHttpExporter {
    async fn export(&self, spans: Vec<SpanData>) -> Result<(), ExportError> {
        if spans.is_empty() {
            return Ok(());
        }
        self.export_with_retry(spans, OTLP_MAX_RETRIES).await
    }

    async fn shutdown(&self) -> Result<(), ExportError> {
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}
