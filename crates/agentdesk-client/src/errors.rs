/// Errors returned by the envelope-wrapped backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Backend answered with a non-2xx HTTP status.
    ///
    /// The response body text is kept; the agent-update endpoint reports
    /// validation problems there.
    #[error("http error (status {status}): {body}")]
    Http { status: u16, body: String },
    /// The response envelope carried a non-`success` status.
    #[error("backend returned status `{status}`")]
    Envelope { status: String },
    /// The `result` payload could not be decoded into the expected shape.
    #[error("unexpected result payload: {message}")]
    Parse { message: String },
    /// The request never produced a readable response.
    #[error("network error: {message}")]
    Network { message: String },
}

impl ApiError {
    pub(crate) fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Terminal failure for a chat run, sent through `ChatEvent::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum RunFailure {
    /// The invocation request was refused with a non-2xx status.
    #[error("agent invocation failed with status {status}")]
    Http { status: u16 },
    /// Network/stream I/O failed mid-run.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The response bytes were not valid UTF-8 text.
    #[error("decode failure: {message}")]
    Decode { message: String },
    /// The run was cancelled by the caller.
    #[error("run cancelled")]
    Cancelled,
}

impl RunFailure {
    /// Whether this failure is a caller-initiated cancellation.
    ///
    /// Cancellation is rendered as an annotation, not an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to the builder or session API.
    #[error("validation error: {0}")]
    Validation(String),
    /// An envelope endpoint failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Terminal failure returned from a started chat run.
    #[error(transparent)]
    RunFailed(#[from] RunFailure),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}
