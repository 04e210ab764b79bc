//! GenAI attribute and event names recorded on agent-run spans
//!
//! Names follow the OpenTelemetry GenAI conventions as used by agent platform
//! tracing: <https://opentelemetry.io/docs/specs/semconv/gen-ai/>. Downstream
//! dashboards key on these exact strings.

use opentelemetry::KeyValue;

use crate::types::MessageRole;

/// Span attribute keys
pub mod attrs {
    pub const SYSTEM: &str = "gen_ai.system";
    pub const PROVIDER_NAME: &str = "gen_ai.provider.name";
    pub const THREAD_ID: &str = "gen_ai.thread.id";
    pub const AGENT_ID: &str = "gen_ai.agent.id";
    pub const RUN_ID: &str = "gen_ai.thread.run.id";
    /// `<threadId>/<runId>`
    pub const RESPONSE_ID: &str = "gen_ai.response.id";
    pub const USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
    pub const USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
    /// JSON payload carried by message events
    pub const EVENT_CONTENT: &str = "gen_ai.event.content";

    pub const EXCEPTION_TYPE: &str = "exception.type";
    pub const EXCEPTION_MESSAGE: &str = "exception.message";
    pub const EXCEPTION_STACKTRACE: &str = "exception.stacktrace";
}

/// Span event names
pub mod events {
    /// Instruction message injected by this service
    pub const SYSTEM_MESSAGE: &str = "gen_ai.system.message";
    /// Message injected on behalf of the caller
    pub const USER_MESSAGE: &str = "gen_ai.user.message";
    /// Reply returned by the agent
    pub const CHOICE: &str = "gen_ai.choice";
    pub const EXCEPTION: &str = "exception";
}

/// `gen_ai.system` value for the agents platform
pub const SYSTEM_VALUE: &str = "az.ai.agents";

/// `gen_ai.provider.name` value for the agents platform
pub const PROVIDER_VALUE: &str = "azure.ai.agents";

/// Composite response id: `<threadId>/<runId>`
pub fn response_id(thread_id: &str, run_id: &str) -> String {
    format!("{}/{}", thread_id, run_id)
}

/// JSON payload `{"message": .., "role": ..}` carried by message events
pub fn message_payload(message: &str, role: MessageRole) -> String {
    serde_json::json!({
        "message": message,
        "role": role.as_str(),
    })
    .to_string()
}

/// Attributes of a `gen_ai.system.message` / `gen_ai.user.message` event
pub fn message_event_attributes(
    message: &str,
    role: MessageRole,
    thread_id: &str,
) -> Vec<KeyValue> {
    vec![
        KeyValue::new(attrs::EVENT_CONTENT, message_payload(message, role)),
        KeyValue::new(attrs::THREAD_ID, thread_id.to_string()),
    ]
}

/// Attributes of a `gen_ai.choice` event
pub fn choice_event_attributes(message: &str, thread_id: &str, run_id: &str) -> Vec<KeyValue> {
    vec![
        KeyValue::new(
            attrs::EVENT_CONTENT,
            message_payload(message, MessageRole::Assistant),
        ),
        KeyValue::new(attrs::THREAD_ID, thread_id.to_string()),
        KeyValue::new(attrs::RUN_ID, run_id.to_string()),
        KeyValue::new(attrs::RESPONSE_ID, response_id(thread_id, run_id)),
    ]
}
