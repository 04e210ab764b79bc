//! Conversational turns against remote agents.
//!
//! A turn is a strictly sequential chain of remote calls:
//!
//! 1. [`ConversationThread`] creates a thread or appends to one
//! 2. [`RunExecutor`] starts a run and waits for its terminal status
//! 3. [`ReplyExtractor`] reads the newest assistant reply
//!
//! [`AgentRunOrchestrator`] composes them into the "new joke" and "feedback"
//! turns and records telemetry on the span it is handed. A run that ends in
//! `failed` is reported as [`TurnOutcome::RunFailed`], not as an error.

pub mod orchestrator;
pub mod reply;
pub mod run;
pub mod thread;

pub use orchestrator::{AgentRunOrchestrator, TurnOutcome, JOKE_SYSTEM_PROMPT};
pub use reply::{ReplyExtractor, REPLY_PAGE_SIZE};
pub use run::RunExecutor;
pub use thread::ConversationThread;
