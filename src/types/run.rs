//! Run records returned by the agents platform.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this crate does not know about; treated as still running
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether no further transition will occur
    ///
    /// `requires_action` counts as terminal: this service registers no tools, so
    /// nothing would ever move such a run forward.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed
                | Self::Failed
                | Self::Cancelled
                | Self::Expired
                | Self::Incomplete
                | Self::RequiresAction
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token usage counters of a run
///
/// Platform SDKs disagree on field names. Input tokens are read from the first
/// present of `inputTokens`, `input_tokens`, `promptTokens`, `prompt_tokens`;
/// output tokens from `outputTokens`, `output_tokens`, `completionTokens`,
/// `completion_tokens`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawUsage")]
pub struct RunUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct RawUsage {
    #[serde(default, rename = "inputTokens")]
    input_tokens_camel: Option<u64>,
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default, rename = "promptTokens")]
    prompt_tokens_camel: Option<u64>,
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default, rename = "outputTokens")]
    output_tokens_camel: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default, rename = "completionTokens")]
    completion_tokens_camel: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
}

impl From<RawUsage> for RunUsage {
    fn from(raw: RawUsage) -> Self {
        Self {
            input_tokens: raw
                .input_tokens_camel
                .or(raw.input_tokens)
                .or(raw.prompt_tokens_camel)
                .or(raw.prompt_tokens),
            output_tokens: raw
                .output_tokens_camel
                .or(raw.output_tokens)
                .or(raw.completion_tokens_camel)
                .or(raw.completion_tokens),
        }
    }
}

/// One execution of an agent against a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Run identifier
    pub id: String,
    /// Thread the run executes against
    #[serde(default, alias = "threadId")]
    pub thread_id: Option<String>,
    /// Agent executing the run
    #[serde(default, alias = "assistantId", alias = "agent_id", alias = "agentId")]
    pub assistant_id: Option<String>,
    /// Current status
    pub status: RunStatus,
    /// Token usage, reported once the run finishes
    #[serde(default)]
    pub usage: Option<RunUsage>,
    /// Error detail reported by the platform when the run failed
    #[serde(default, alias = "lastError")]
    pub last_error: Option<serde_json::Value>,
}

impl Run {
    /// Whether the run reached the `failed` status
    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }

    /// Input token count, if reported
    pub fn input_tokens(&self) -> Option<u64> {
        self.usage.and_then(|u| u.input_tokens)
    }

    /// Output token count, if reported
    pub fn output_tokens(&self) -> Option<u64> {
        self.usage.and_then(|u| u.output_tokens)
    }
}
