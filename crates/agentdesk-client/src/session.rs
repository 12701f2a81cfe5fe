use tracing::debug;

use crate::client::AgentClient;
use crate::errors::{ClientError, RunFailure};
use crate::run::{AbortHandle, ChatStream};
use crate::stream::ChatEvent;

/// Marker appended to the transcript when the user cancels a run.
pub const CANCELLED_MARKER: &str = "\n\n[Cancelled]";

/// Lifecycle state of a chat session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to accept a prompt.
    Idle,
    /// A run is in flight; submissions are rejected.
    Streaming,
    /// The last run finished normally.
    Completed,
    /// The last run was cancelled by the user.
    Cancelled,
    /// The last run failed.
    Failed,
}

impl SessionState {
    /// Whether the session can accept a new prompt.
    ///
    /// Every state except `Streaming` is idle-equivalent.
    pub fn accepts_input(self) -> bool {
        !matches!(self, SessionState::Streaming)
    }
}

/// Controller for one chat conversation.
///
/// Owns the transcript, the state machine, and the cancellation handle for
/// the in-flight run. At most one run is live at a time: `submit` rejects
/// while a run is streaming, so a controller never holds two connections.
pub struct ChatSession {
    client: AgentClient,
    agent_name: String,
    state: SessionState,
    transcript: String,
    stream: Option<ChatStream>,
    abort: Option<AbortHandle>,
}

impl ChatSession {
    /// Creates an idle session bound to `agent_name`.
    pub fn new(client: AgentClient, agent_name: impl Into<String>) -> Self {
        Self {
            client,
            agent_name: agent_name.into(),
            state: SessionState::Idle,
            transcript: String::new(),
            stream: None,
            abort: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The accumulated reply text, including any terminal marker.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Switches the agent targeted by the next submission.
    pub fn select_agent(&mut self, agent_name: impl Into<String>) {
        self.agent_name = agent_name.into();
    }

    /// Handle that cancels the in-flight run from another task.
    ///
    /// `None` when no run is active. An abort observed through the event
    /// stream is applied the same way as a direct `cancel`.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.abort.clone()
    }

    /// Starts a run for `prompt`.
    ///
    /// Rejected while a run is streaming, and for an empty prompt or unset
    /// agent; rejection performs no network call and leaves the transcript
    /// and state untouched.
    pub async fn submit(&mut self, prompt: &str) -> Result<(), ClientError> {
        if self.state == SessionState::Streaming {
            return Err(ClientError::Validation(
                "a run is already streaming".into(),
            ));
        }
        if self.agent_name.trim().is_empty() {
            return Err(ClientError::Validation(
                "agent name must not be empty".into(),
            ));
        }
        if prompt.trim().is_empty() {
            return Err(ClientError::Validation("prompt must not be empty".into()));
        }

        self.transcript.clear();
        let stream = self
            .client
            .chat(&self.agent_name)
            .prompt(prompt)
            .start_stream()
            .await?;
        debug!(agent = %self.agent_name, run_id = %stream.run_id(), "chat run submitted");
        self.abort = Some(stream.abort_handle());
        self.stream = Some(stream);
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Waits for the next event from the in-flight run and applies it to the
    /// transcript and state.
    ///
    /// Returns `None` when no run is active or its channel has closed.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let event = match self.stream.as_mut() {
            Some(stream) => stream.next_event().await,
            None => return None,
        };
        match event {
            Some(event) => {
                self.apply(&event);
                Some(event)
            }
            None => {
                self.stream = None;
                None
            }
        }
    }

    /// Cancels the in-flight run, if any.
    ///
    /// The session leaves the streaming state immediately rather than waiting
    /// for the run task to settle; late events from the dying run are
    /// discarded along with its stream.
    pub fn cancel(&mut self) {
        if self.state != SessionState::Streaming {
            return;
        }
        if let Some(abort) = self.abort.take() {
            abort.abort();
        }
        self.stream = None;
        self.transcript.push_str(CANCELLED_MARKER);
        self.state = SessionState::Cancelled;
        debug!(agent = %self.agent_name, "chat run cancelled");
    }

    fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::Started { .. } => {}
            ChatEvent::Delta { text, .. } => {
                if self.state == SessionState::Streaming {
                    self.transcript.push_str(text);
                }
            }
            ChatEvent::Completed { .. } => {
                if self.state == SessionState::Streaming {
                    self.state = SessionState::Completed;
                }
                self.retire_run();
            }
            ChatEvent::Failed { failure, .. } => {
                if self.state == SessionState::Streaming {
                    if failure.is_cancelled() {
                        // The abort raced the run task; same outcome as a
                        // direct cancel.
                        self.transcript.push_str(CANCELLED_MARKER);
                        self.state = SessionState::Cancelled;
                    } else {
                        self.transcript.push_str(&error_marker(failure));
                        self.state = SessionState::Failed;
                    }
                }
                self.retire_run();
            }
        }
    }

    fn retire_run(&mut self) {
        self.stream = None;
        self.abort = None;
    }
}

fn error_marker(failure: &RunFailure) -> String {
    format!("\n\n[Error: {failure}]")
}
