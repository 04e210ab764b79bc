//! The agents platform boundary
//!
//! [`AgentsClient`] is the only way the rest of the crate talks to the remote
//! platform. Production uses [`HttpAgentsClient`]; tests substitute their own
//! implementation. One client is built at startup and shared by every request,
//! so implementations must be safe for concurrent use.

pub mod http;

pub use http::HttpAgentsClient;

use crate::config::PollConfig;
use crate::types::{
    AgentDescriptor, ListOrder, MessagePage, MessageRole, Run, ThreadHandle, ThreadMessage,
};
use crate::{QuipError, Result};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::debug;

/// Operations of the remote agents platform
#[async_trait]
pub trait AgentsClient: Send + Sync {
    /// Look up an agent by identifier
    async fn get_agent(&self, agent_id: &str) -> Result<AgentDescriptor>;

    /// Create an empty thread
    async fn create_thread(&self) -> Result<ThreadHandle>;

    /// Append one message to a thread
    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage>;

    /// Start a run of `agent_id` against `thread_id`
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// One page of a thread's messages
    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
        limit: usize,
    ) -> Result<MessagePage>;

    /// Start a run and wait until it reaches a terminal status
    ///
    /// A `failed` run is returned like any other terminal run, not as an error.
    async fn create_and_poll_run(&self, thread_id: &str, agent_id: &str) -> Result<Run>;
}

/// Delay before the next status check
///
/// Grows by `backoff_multiplier` and is capped at `max_interval`.
pub fn next_poll_delay(current: Duration, poll: &PollConfig) -> Duration {
    let next_ms = current.as_millis() as f64 * poll.backoff_multiplier;
    Duration::from_millis(next_ms as u64)
        .max(current)
        .min(poll.max_interval.max(poll.interval))
}

/// Poll `run` with [`AgentsClient::get_run`] until its status is terminal
///
/// Fails with [`QuipError::TimeoutError`] once `poll.timeout` has elapsed.
pub async fn poll_until_terminal<C>(
    client: &C,
    thread_id: &str,
    mut run: Run,
    poll: &PollConfig,
) -> Result<Run>
where
    C: AgentsClient + ?Sized,
{
    let started = Instant::now();
    let mut delay = poll.interval;
    let mut checks = 0u32;

    while !run.status.is_terminal() {
        let elapsed = started.elapsed();
        if elapsed >= poll.timeout {
            return Err(QuipError::timeout_error(poll.timeout.as_millis() as u64));
        }

        tokio::time::sleep(delay.min(poll.timeout - elapsed)).await;
        run = client.get_run(thread_id, &run.id).await?;
        checks += 1;
        debug!(
            run_id = %run.id,
            status = %run.status,
            checks,
            "Polled run status"
        );
        delay = next_poll_delay(delay, poll);
    }

    Ok(run)
}
