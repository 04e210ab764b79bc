//! Agent and thread handles.

use serde::{Deserialize, Serialize};

/// A configured remote conversational agent
///
/// Resolved once per operation from the configured identifier and never cached
/// across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Opaque agent identifier
    pub id: String,
    /// Display name, when the platform reports one
    #[serde(default)]
    pub name: Option<String>,
    /// Model deployment backing the agent
    #[serde(default)]
    pub model: Option<String>,
}

impl AgentDescriptor {
    /// Descriptor carrying only an identifier
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            model: None,
        }
    }
}

/// Handle to a remote dialogue context
///
/// The thread lives on the platform; this crate only keeps its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHandle {
    /// Opaque thread identifier
    pub id: String,
    /// Creation time in unix seconds, if reported
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<i64>,
}

impl ThreadHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
        }
    }
}
