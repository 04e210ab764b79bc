//! Tell jokes through a remote agent platform, with every turn traced.
//!
//! Quip is a small HTTP front end. Each request becomes one conversational turn
//! against a remote agent: create (or reuse) a thread, inject a prompt, start a
//! run, poll it to a terminal state and pull the newest assistant reply out of
//! the thread. Every turn is wrapped in a span that carries GenAI semantic
//! convention attributes and events.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use quip::agent::AgentRunOrchestrator;
//! use quip::config::QuipConfig;
//! use quip::remote::HttpAgentsClient;
//! use quip::telemetry::AgentTracer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuipConfig::from_env()?;
//!     let client = Arc::new(HttpAgentsClient::new(&config.agents)?);
//!     let orchestrator = AgentRunOrchestrator::new(client, config.agents.clone());
//!     let tracer = AgentTracer::disabled();
//!
//!     let outcome = quip::telemetry::with_span(
//!         &tracer,
//!         "joke-request",
//!         quip::telemetry::SpanKind::Server,
//!         |span| async move { orchestrator.new_joke(&span).await },
//!     )
//!     .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`agent`] - Thread, run and reply building blocks plus the turn orchestrator
//! - [`remote`] - The agents platform boundary (`AgentsClient`) and its HTTP client
//! - [`telemetry`] - Spans, exporters, GenAI attribute names and logging setup
//! - [`server`] - axum routes for `/joke`, `/feedback` and `/health`
//! - [`config`] - File and environment configuration
//! - [`types`] - Threads, messages, runs and usage counters
//! - [`error`] - The crate error type

pub mod agent;
pub mod config;
pub mod error;
pub mod remote;
pub mod server;
pub mod telemetry;
pub mod types;

pub use error::QuipError;
pub use types::*;

pub type Result<T> = std::result::Result<T, QuipError>;
