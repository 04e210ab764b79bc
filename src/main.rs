//! quip-server entry point

use anyhow::Context;
use clap::Parser;
use quip::agent::AgentRunOrchestrator;
use quip::config::QuipConfig;
use quip::remote::HttpAgentsClient;
use quip::server::{self, AppState};
use quip::telemetry::{init_logging, AgentTracer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "quip-server")]
#[command(about = "Joke service backed by a remote agent, with traced turns")]
#[command(version)]
struct Cli {
    /// Configuration file (.toml, .yaml, .yml or .json); environment variables override it
    #[arg(short, long, env = "QUIP_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<QuipConfig> {
    let mut config = match &cli.config {
        Some(path) => QuipConfig::from_file(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?
            .merge_with_env()?,
        None => QuipConfig::from_env()?,
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config.logging)?;

    let tracer = match AgentTracer::init(&config.telemetry) {
        Ok(tracer) => tracer,
        Err(e) => {
            warn!("Telemetry initialization failed, continuing without tracing: {}", e);
            AgentTracer::disabled()
        }
    };
    let flush_task = tracer.is_enabled().then(|| {
        tracer.spawn_flush_task(Duration::from_millis(config.telemetry.flush_interval_ms))
    });

    let client = Arc::new(HttpAgentsClient::new(&config.agents)?);
    let orchestrator = AgentRunOrchestrator::new(client, config.agents.clone());
    let state = AppState::new(orchestrator, tracer.clone(), config.telemetry.service_name.clone());

    info!(
        endpoint = %config.agents.endpoint,
        joke_agent = %config.agents.joke_agent_id,
        feedback_agent = %config.agents.feedback_agent(),
        telemetry = tracer.is_enabled(),
        "Starting quip-server"
    );

    let served = server::serve(&config.server, state, shutdown_signal()).await;

    if let Some(task) = flush_task {
        task.abort();
    }
    if let Err(e) = tracer.shutdown().await {
        warn!("Failed to export remaining spans: {}", e);
    }

    served?;
    Ok(())
}
