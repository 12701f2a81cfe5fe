use crate::errors::RunFailure;

/// Normalized stream events yielded by `ChatStream`.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// First event for every run.
    Started { run_id: uuid::Uuid, agent: String },
    /// Incremental decoded text fragment.
    ///
    /// Fragments are opaque substrings of the overall reply; their boundaries
    /// carry no structural meaning (never assume complete lines or JSON).
    Delta {
        run_id: uuid::Uuid,
        seq: u64,
        text: String,
    },
    /// Terminal success event with the concatenated reply.
    Completed { run_id: uuid::Uuid, reply: String },
    /// Terminal failure event; `RunFailure::Cancelled` marks a caller abort.
    Failed {
        run_id: uuid::Uuid,
        failure: RunFailure,
    },
}
