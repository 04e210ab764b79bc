//! Error handling for quip
//!
//! A single categorized error type covers every failure a conversational turn can
//! hit. The categories line up with how the HTTP layer reports them:
//!
//! - **Input Validation** - missing or malformed caller input, reported as 400
//! - **Remote Platform** - transport, auth and rejection errors from the agents platform
//! - **Conversation** - unknown threads and runs that produced no assistant reply
//! - **Configuration / Telemetry** - startup problems
//!
//! A run that reaches the `failed` status is *not* an error: it is a normal
//! outcome returned by [`crate::agent::RunExecutor`] and turned into a response by
//! the orchestrator.
//!
//! # Error Classification
//!
//! ```rust
//! use quip::error::QuipError;
//!
//! # fn handle_error(error: QuipError) {
//! if error.is_client_error() {
//!     eprintln!("Bad request: {}", error);
//! } else if error.is_retryable() {
//!     eprintln!("Remote platform hiccup, caller may try again: {}", error);
//! }
//! # }
//! ```

use thiserror::Error;

/// Main error type for quip
#[derive(Error, Debug, Clone)]
pub enum QuipError {
    /// Caller input is missing or invalid
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The agents platform could not be reached or refused our credential
    #[error("Remote platform unavailable: {message}")]
    RemoteUnavailable { message: String },

    /// The agents platform answered with an error status
    #[error("Remote platform rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// The thread identifier is unknown to the agents platform
    #[error("Invalid thread: {thread_id}")]
    InvalidThread { thread_id: String },

    /// No assistant-authored text was found in the scanned page of messages
    #[error("No assistant reply found in thread {thread_id}")]
    NoAssistantReply { thread_id: String },

    /// Configuration errors (missing endpoint, agent id, ...)
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    /// Timeout errors
    #[error("Timeout error: operation timed out after {timeout_ms}ms")]
    TimeoutError { timeout_ms: u64 },

    /// Telemetry or logging could not be initialized
    #[error("Telemetry error: {message}")]
    TelemetryError { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl QuipError {
    /// Create an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a RemoteUnavailable error
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Create a RemoteRejected error
    pub fn remote_rejected(status: u16, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Create an InvalidThread error
    pub fn invalid_thread(thread_id: impl Into<String>) -> Self {
        Self::InvalidThread {
            thread_id: thread_id.into(),
        }
    }

    /// Create a NoAssistantReply error
    pub fn no_assistant_reply(thread_id: impl Into<String>) -> Self {
        Self::NoAssistantReply {
            thread_id: thread_id.into(),
        }
    }

    /// Create a ConfigurationError
    pub fn configuration_error(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a TimeoutError
    pub fn timeout_error(timeout_ms: u64) -> Self {
        Self::TimeoutError { timeout_ms }
    }

    /// Create a TelemetryError
    pub fn telemetry_error(message: impl Into<String>) -> Self {
        Self::TelemetryError {
            message: message.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Check if this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(self, QuipError::InvalidInput { .. })
    }

    /// Check if retrying the same request later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            QuipError::RemoteUnavailable { .. } | QuipError::TimeoutError { .. } => true,
            QuipError::RemoteRejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable name of the variant, used as `exception.type` on spans
    pub fn kind(&self) -> &'static str {
        match self {
            QuipError::InvalidInput { .. } => "InvalidInput",
            QuipError::RemoteUnavailable { .. } => "RemoteUnavailable",
            QuipError::RemoteRejected { .. } => "RemoteRejected",
            QuipError::InvalidThread { .. } => "InvalidThread",
            QuipError::NoAssistantReply { .. } => "NoAssistantReply",
            QuipError::ConfigurationError { .. } => "ConfigurationError",
            QuipError::SerializationError { .. } => "SerializationError",
            QuipError::TimeoutError { .. } => "TimeoutError",
            QuipError::TelemetryError { .. } => "TelemetryError",
            QuipError::InternalError { .. } => "InternalError",
        }
    }
}

impl From<reqwest::Error> for QuipError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            QuipError::serialization_error(format!("Failed to decode response: {}", error))
        } else {
            QuipError::remote_unavailable(error.to_string())
        }
    }
}

impl From<serde_json::Error> for QuipError {
    fn from(error: serde_json::Error) -> Self {
        QuipError::serialization_error(format!("JSON serialization failed: {}", error))
    }
}

impl From<crate::config::ConfigError> for QuipError {
    fn from(error: crate::config::ConfigError) -> Self {
        QuipError::configuration_error(error.to_string())
    }
}
