//! Client library for an agent backend: agent catalog, markdown documents,
//! and streamed chat runs with cooperative cancellation.
//!
//! # Streaming a chat run
//!
//! ```no_run
//! use agentdesk_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let client = AgentClient::from_env()?;
//!
//! let mut run = client
//!     .chat("default")
//!     .prompt("Summarize this week's campaign numbers")
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = run.next_event().await {
//!     if let ChatEvent::Delta { text, .. } = event {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Agent catalog types.
pub mod agents;
/// Client entry point and builder.
pub mod client;
/// Backend endpoint configuration.
pub mod config;
/// Document types and filename/title derivation.
pub mod documents;
/// `{status, result}` response envelope and its normalization.
pub mod envelope;
/// Public error types used by the client API.
pub mod errors;
/// Markdown rendering seam.
pub mod markdown;
/// Process-wide tracing bootstrap.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Run builder, streaming handle, and cancellation handle.
pub mod run;
/// Chat session controller.
pub mod session;
/// Normalized public stream events.
pub mod stream;
/// Transport seam for streamed agent invocation.
pub mod transport;

pub use agents::AgentDetail;
pub use client::{AgentClient, AgentClientBuilder};
pub use config::BackendConfig;
pub use documents::DocumentItem;
pub use envelope::Envelope;
pub use errors::{ApiError, ClientError, RunFailure};
pub use markdown::{MarkdownError, MarkdownRenderer, PulldownMarkdownRenderer};
pub use run::{AbortHandle, ChatStream, RunBuilder};
pub use session::{CANCELLED_MARKER, ChatSession, SessionState};
pub use stream::ChatEvent;
pub use transport::{ChatRequest, ChatTransport, HttpChatTransport, TextChunkStream};
