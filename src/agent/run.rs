//! Agent runs against a thread.

use crate::remote::AgentsClient;
use crate::types::Run;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

/// Starts a run and waits for its terminal status
#[derive(Clone)]
pub struct RunExecutor {
    client: Arc<dyn AgentsClient>,
}

impl RunExecutor {
    pub fn new(client: Arc<dyn AgentsClient>) -> Self {
        Self { client }
    }

    /// Run `agent_id` against `thread_id` until the run reaches a terminal status
    ///
    /// A `failed` run is an ordinary return value; only transport faults while
    /// starting or polling are errors.
    pub async fn start_and_await(&self, thread_id: &str, agent_id: &str) -> Result<Run> {
        let run = self.client.create_and_poll_run(thread_id, agent_id).await?;
        debug!(
            thread_id,
            run_id = %run.id,
            status = %run.status,
            input_tokens = ?run.input_tokens(),
            output_tokens = ?run.output_tokens(),
            "Run finished"
        );
        Ok(run)
    }
}
