//! Content block types for thread messages.

use serde::{Deserialize, Serialize};

/// A block of content within a thread message
///
/// The platform tags each block with its kind. Only text is interpreted; every
/// other kind (image files, attachments, ...) is kept as `Unsupported` so that a
/// message mixing kinds still parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text { text: TextContent },
    /// Any block kind this crate does not read
    #[serde(other)]
    Unsupported,
}

/// Text payload of a [`ContentBlock::Text`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// The text itself
    pub value: String,
    /// Citations and file references attached to the text
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

impl ContentBlock {
    /// Create a new text content block
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::Text {
            text: TextContent {
                value: text.into(),
                annotations: Vec::new(),
            },
        }
    }

    /// Text value of this block, if it is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(&text.value),
            Self::Unsupported => None,
        }
    }
}
