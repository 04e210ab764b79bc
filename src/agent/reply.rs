//! Reply extraction from a thread's history.

use crate::remote::AgentsClient;
use crate::types::{ListOrder, ThreadMessage};
use crate::{QuipError, Result};
use std::sync::Arc;

/// Number of newest messages scanned for a reply
pub const REPLY_PAGE_SIZE: usize = 20;

/// Finds the newest assistant-authored text in a thread
#[derive(Clone)]
pub struct ReplyExtractor {
    client: Arc<dyn AgentsClient>,
}

impl ReplyExtractor {
    pub fn new(client: Arc<dyn AgentsClient>) -> Self {
        Self { client }
    }

    /// Text of the newest assistant message within the last [`REPLY_PAGE_SIZE`] messages
    ///
    /// Only one page is scanned. No match within it is `NoAssistantReply`.
    pub async fn latest_assistant_text(&self, thread_id: &str) -> Result<String> {
        let page = self
            .client
            .list_messages(thread_id, ListOrder::Desc, REPLY_PAGE_SIZE)
            .await?;

        first_assistant_text(&page.data)
            .map(str::to_string)
            .ok_or_else(|| QuipError::no_assistant_reply(thread_id))
    }
}

/// First text block of the first assistant message, in the given order
///
/// An assistant message without text ends the scan; older messages are not
/// consulted.
pub fn first_assistant_text(messages: &[ThreadMessage]) -> Option<&str> {
    messages
        .iter()
        .take(REPLY_PAGE_SIZE)
        .find(|m| m.role.is_assistant())
        .and_then(ThreadMessage::first_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentBlock, MessageRole};

    #[test]
    fn test_no_assistant_in_page() {
        let messages: Vec<ThreadMessage> = (0..REPLY_PAGE_SIZE)
            .map(|i| ThreadMessage::text(format!("m{}", i), MessageRole::User, "hi"))
            .collect();
        assert_eq!(first_assistant_text(&messages), None);
    }

    #[test]
    fn test_third_newest_assistant_first_block_wins() {
        let mut reply = ThreadMessage::text("m3", MessageRole::Assistant, "first block");
        reply.content.push(ContentBlock::text("second block"));

        let messages = vec![
            ThreadMessage::text("m1", MessageRole::User, "newest"),
            ThreadMessage::text("m2", MessageRole::System, "prompt"),
            reply,
            ThreadMessage::text("m4", MessageRole::Assistant, "older reply"),
        ];

        assert_eq!(first_assistant_text(&messages), Some("first block"));
    }

    #[test]
    fn test_assistant_without_text_does_not_fall_through() {
        let mut image_only = ThreadMessage::text("m1", MessageRole::Assistant, "");
        image_only.content = vec![ContentBlock::Unsupported];

        let messages = vec![
            image_only,
            ThreadMessage::text("m2", MessageRole::Assistant, "older reply"),
        ];

        assert_eq!(first_assistant_text(&messages), None);
    }
}
