//! Remote dialogue contexts.

use crate::remote::AgentsClient;
use crate::types::{MessageRole, ThreadHandle, ThreadMessage};
use crate::Result;
use std::sync::Arc;

/// Creates threads and appends messages to them
///
/// Keeps no local state; every call is one remote round trip.
#[derive(Clone)]
pub struct ConversationThread {
    client: Arc<dyn AgentsClient>,
}

impl ConversationThread {
    pub fn new(client: Arc<dyn AgentsClient>) -> Self {
        Self { client }
    }

    /// Ask the platform for a new, empty thread
    pub async fn create(&self) -> Result<ThreadHandle> {
        self.client.create_thread().await
    }

    /// Append one message to an existing thread
    ///
    /// Fails with `InvalidThread` when the platform does not know `thread_id`.
    pub async fn append_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        text: &str,
    ) -> Result<ThreadMessage> {
        self.client.create_message(thread_id, role, text).await
    }
}
