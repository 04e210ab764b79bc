//! Message types for remote threads.

use serde::{Deserialize, Serialize};

use super::content::ContentBlock;

/// Role of a message in a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the end user
    User,
    /// Message produced by the agent
    Assistant,
    /// Instructions injected by this service
    System,
    /// A role this crate does not know about
    #[serde(other)]
    Unknown,
}

impl MessageRole {
    /// Wire spelling of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the message was produced by the agent
    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant)
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a thread's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Message identifier
    pub id: String,
    /// Thread the message belongs to
    #[serde(default, alias = "threadId")]
    pub thread_id: Option<String>,
    /// Author role
    pub role: MessageRole,
    /// Ordered content blocks
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Creation time in unix seconds
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<i64>,
    /// Run that produced the message, for assistant messages
    #[serde(default, alias = "runId")]
    pub run_id: Option<String>,
}

impl ThreadMessage {
    /// Create a message with a single text block
    pub fn text(id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            role,
            content: vec![ContentBlock::text(text)],
            created_at: None,
            run_id: None,
        }
    }

    /// First text block of the message, in block order
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}

/// Ordering of a message listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    /// Oldest first
    Asc,
    /// Newest first
    Desc,
}

impl ListOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One page of a thread's messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    /// Messages in the requested order
    pub data: Vec<ThreadMessage>,
    /// Whether more messages exist past this page
    #[serde(default, alias = "hasMore")]
    pub has_more: bool,
}
