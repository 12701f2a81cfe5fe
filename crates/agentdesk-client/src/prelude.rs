//! Common imports for typical client usage.
//!
//! This module intentionally exports the most frequently used client/runtime
//! types so application code needs fewer import lines.
pub use crate::{
    AbortHandle, AgentClient, AgentDetail, BackendConfig, ChatEvent, ChatSession, ChatStream,
    ClientError, DocumentItem, RunBuilder, RunFailure, SessionState,
};
