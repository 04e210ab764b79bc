//! Tracing and logging for agent-run operations
//!
//! Every conversational turn is wrapped in a span carrying GenAI attributes
//! (thread, agent, run, token usage) and message events. Spans are built with
//! [`AgentTracer`], closed by [`with_span`], and shipped by a [`SpanExporter`].
//!
//! ```no_run
//! use quip::config::TelemetryConfig;
//! use quip::telemetry::{with_span, AgentTracer, SpanKind};
//! use quip::QuipError;
//!
//! # async fn run() -> Result<(), QuipError> {
//! let tracer = AgentTracer::init(&TelemetryConfig::default())?;
//! let answer = with_span(&tracer, "joke-request", SpanKind::Server, |span| async move {
//!     span.set_attribute("gen_ai.thread.id", "thread_abc");
//!     Ok::<_, QuipError>(42)
//! })
//! .await?;
//! tracer.flush().await.ok();
//! # Ok(())
//! # }
//! ```
//!
//! When telemetry is disabled the tracer hands out no-op spans, so callers never
//! branch on whether tracing is on.

pub mod exporter;
pub mod genai;
pub mod logging;
pub mod scope;
pub mod tracer;

pub use exporter::{
    AttributeValue, ConsoleExporter, ExportError, FanoutExporter, InMemoryExporter, NoOpExporter,
    OtlpHttpExporter, SpanData, SpanEvent, SpanExporter, SpanKind, SpanStatus,
};
pub use logging::init_logging;
pub use scope::{with_span, SpanGuard};
pub use tracer::{AgentSpan, AgentTracer, KeyValue};

use crate::config::TelemetryConfig;
use crate::QuipError;
use std::sync::Arc;
use std::time::Duration;

impl From<ExportError> for QuipError {
    fn from(error: ExportError) -> Self {
        QuipError::telemetry_error(error.to_string())
    }
}

impl AgentTracer {
    /// Build a tracer from configuration
    ///
    /// Disabled telemetry yields [`AgentTracer::disabled`]. An error means the
    /// exporter could not be built; callers fall back to a disabled tracer.
    pub fn init(config: &TelemetryConfig) -> Result<Self, QuipError> {
        if !config.enabled {
            tracing::debug!("Telemetry disabled, spans will not be exported");
            return Ok(Self::disabled());
        }

        let mut exporters: Vec<Arc<dyn SpanExporter>> = Vec::new();

        if let Some(endpoint) = &config.otlp_endpoint {
            let exporter = OtlpHttpExporter::new(
                endpoint,
                config.otlp_headers.clone(),
                config.service_name.clone(),
                Duration::from_millis(config.export_timeout_ms),
            )?;
            tracing::info!(endpoint = %exporter.endpoint(), "OTLP span export enabled");
            exporters.push(Arc::new(exporter));
        }

        if config.console_export {
            tracing::info!("Console span export enabled");
            exporters.push(Arc::new(ConsoleExporter));
        }

        let exporter: Arc<dyn SpanExporter> = match exporters.len() {
            0 => {
                return Err(QuipError::telemetry_error(
                    "telemetry enabled without an OTLP endpoint or console export",
                ))
            }
            1 => exporters.remove(0),
            _ => Arc::new(FanoutExporter::new(exporters)),
        };

        Ok(Self::new(exporter))
    }

    /// Flush pending spans every `interval` until the returned task is aborted
    pub fn spawn_flush_task(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let tracer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = tracer.flush().await {
                    tracing::warn!("Failed to export spans: {}", e);
                }
            }
        })
    }
}
