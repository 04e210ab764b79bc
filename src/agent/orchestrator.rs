//! The two conversational turns: a fresh joke, and feedback on an existing thread.
//!
//! Both turns inject a message, run an agent to a terminal status, then read
//! the newest assistant reply. Along the way they record GenAI attributes and
//! message events on the span they are given.

use super::{ConversationThread, ReplyExtractor, RunExecutor};
use crate::config::AgentsConfig;
use crate::remote::AgentsClient;
use crate::telemetry::genai::{self, attrs, events};
use crate::telemetry::AgentSpan;
use crate::types::{MessageRole, Run};
use crate::{QuipError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Instruction injected at the start of every new thread
pub const JOKE_SYSTEM_PROMPT: &str = "You are a good-natured comedian. Reply with exactly one short, \
family-friendly joke and nothing else. The user will answer each joke with a reaction such as \
'like' or 'dislike'; use that reaction to tune the style of the next joke.";

/// Message injected for a feedback turn
pub fn feedback_message(reaction: &str) -> String {
    format!(
        "My reaction to your previous joke: {}. Keeping that in mind, tell me a new joke.",
        reaction
    )
}

/// Result of one conversational turn
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The agent replied
    Reply { text: String, thread_id: String },
    /// The run ended in the `failed` status
    RunFailed {
        thread_id: String,
        run_id: String,
        /// Error detail reported by the platform
        details: Value,
    },
}

impl TurnOutcome {
    pub fn thread_id(&self) -> &str {
        match self {
            TurnOutcome::Reply { thread_id, .. } | TurnOutcome::RunFailed { thread_id, .. } => {
                thread_id
            }
        }
    }
}

/// Drives conversational turns against the agents platform
#[derive(Clone)]
pub struct AgentRunOrchestrator {
    client: Arc<dyn AgentsClient>,
    config: AgentsConfig,
    threads: ConversationThread,
    runs: RunExecutor,
    replies: ReplyExtractor,
}

impl AgentRunOrchestrator {
    pub fn new(client: Arc<dyn AgentsClient>, config: AgentsConfig) -> Self {
        Self {
            threads: ConversationThread::new(Arc::clone(&client)),
            runs: RunExecutor::new(Arc::clone(&client)),
            replies: ReplyExtractor::new(Arc::clone(&client)),
            client,
            config,
        }
    }

    /// Start a new thread and ask the joke agent for a joke
    pub async fn new_joke(&self, span: &AgentSpan) -> Result<TurnOutcome> {
        let agent = self.client.get_agent(&self.config.joke_agent_id).await?;
        let thread = self.threads.create().await?;

        self.threads
            .append_message(&thread.id, MessageRole::System, JOKE_SYSTEM_PROMPT)
            .await?;

        record_turn_start(span, &thread.id, &agent.id);
        span.add_event(
            events::SYSTEM_MESSAGE,
            genai::message_event_attributes(JOKE_SYSTEM_PROMPT, MessageRole::System, &thread.id),
        );

        let run = self.runs.start_and_await(&thread.id, &agent.id).await?;
        self.finish_turn(span, &thread.id, run).await
    }

    /// Tell the agent how the caller reacted, and ask for another joke on the same thread
    ///
    /// Both arguments are required; an empty one fails with `InvalidInput`
    /// before any remote call.
    pub async fn feedback(
        &self,
        span: &AgentSpan,
        reaction: &str,
        thread_id: &str,
    ) -> Result<TurnOutcome> {
        if reaction.trim().is_empty() {
            return Err(QuipError::invalid_input("reaction is required"));
        }
        if thread_id.trim().is_empty() {
            return Err(QuipError::invalid_input("threadId is required"));
        }

        let message = feedback_message(reaction);
        self.threads
            .append_message(thread_id, MessageRole::User, &message)
            .await?;

        let agent = self.client.get_agent(self.config.feedback_agent()).await?;

        record_turn_start(span, thread_id, &agent.id);
        span.add_event(
            events::USER_MESSAGE,
            genai::message_event_attributes(&message, MessageRole::User, thread_id),
        );

        let run = self.runs.start_and_await(thread_id, &agent.id).await?;
        self.finish_turn(span, thread_id, run).await
    }

    /// Record run attributes, then either report the failure or fetch the reply
    async fn finish_turn(&self, span: &AgentSpan, thread_id: &str, run: Run) -> Result<TurnOutcome> {
        record_run(span, thread_id, &run);

        if run.is_failed() {
            let details = run.last_error.clone().unwrap_or(Value::Null);
            warn!(
                thread_id,
                run_id = %run.id,
                details = %details,
                "Agent run failed"
            );
            return Ok(TurnOutcome::RunFailed {
                thread_id: thread_id.to_string(),
                run_id: run.id,
                details,
            });
        }

        let text = self.replies.latest_assistant_text(thread_id).await?;
        span.add_event(
            events::CHOICE,
            genai::choice_event_attributes(&text, thread_id, &run.id),
        );

        info!(thread_id, run_id = %run.id, "Agent replied");
        Ok(TurnOutcome::Reply {
            text,
            thread_id: thread_id.to_string(),
        })
    }
}

fn record_turn_start(span: &AgentSpan, thread_id: &str, agent_id: &str) {
    span.set_attribute(attrs::SYSTEM, genai::SYSTEM_VALUE);
    span.set_attribute(attrs::PROVIDER_NAME, genai::PROVIDER_VALUE);
    span.set_attribute(attrs::THREAD_ID, thread_id);
    span.set_attribute(attrs::AGENT_ID, agent_id);
}

fn record_run(span: &AgentSpan, thread_id: &str, run: &Run) {
    span.set_attribute(attrs::RUN_ID, run.id.as_str());
    span.set_attribute(attrs::RESPONSE_ID, genai::response_id(thread_id, &run.id));
    if let Some(tokens) = run.input_tokens() {
        span.set_attribute(attrs::USAGE_INPUT_TOKENS, tokens);
    }
    if let Some(tokens) = run.output_tokens() {
        span.set_attribute(attrs::USAGE_OUTPUT_TOKENS, tokens);
    }
}
