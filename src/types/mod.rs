//! Core type definitions for quip.
//!
//! These mirror the entities the agents platform hands back: agents, threads,
//! messages and runs. Remote JSON enters the crate only through these types, so
//! field-naming differences between platform SDKs are resolved here once.

pub mod agent;
pub mod content;
pub mod messages;
pub mod run;

// Re-export commonly used types
pub use agent::*;
pub use content::*;
pub use messages::*;
pub use run::*;

/// Opaque identifier of a remote conversation thread
pub type ThreadId = String;

/// Opaque identifier of a remote agent
pub type AgentId = String;
