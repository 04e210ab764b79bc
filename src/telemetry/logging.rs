//! Log subscriber setup

use crate::config::{LogFormat, LoggingConfig};
use crate::QuipError;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

/// Build the log filter: `RUST_LOG` when set, otherwise the configured filter
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, QuipError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| {
            QuipError::telemetry_error(format!("Failed to create tracing filter: {}", e))
        })?;

    let filter = ["hyper=warn", "h2=warn", "reqwest=warn"]
        .into_iter()
        .filter_map(|d| d.parse().ok())
        .fold(filter, |f, directive| f.add_directive(directive));
    Ok(filter)
}

/// Install the global log subscriber
///
/// A second call leaves the first subscriber in place and only logs a warning.
pub fn init_logging(config: &LoggingConfig) -> Result<(), QuipError> {
    let filter = build_filter(config)?;

    let format_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .json()
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(format_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        tracing::warn!("Log subscriber already installed: {}", e);
        return Ok(());
    }

    info!(format = ?config.format, "Logging initialized");
    Ok(())
}
