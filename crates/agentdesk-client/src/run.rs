use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::errors::{ClientError, RunFailure};
use crate::stream::ChatEvent;
use crate::transport::{ChatRequest, ChatTransport};

/// Handle used to request cancellation of a streaming run.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is cooperative and becomes visible as a terminal
    /// `ChatEvent::Failed` with `RunFailure::Cancelled`. It has no effect on
    /// a run that already finished.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for configuring and starting one streamed agent invocation.
///
/// Obtained from `AgentClient::chat`; provide the prompt and options, then
/// either consume events with `start_stream` or collect the final reply.
pub struct RunBuilder {
    transport: Arc<dyn ChatTransport>,
    agent_name: String,
    prompt: String,
    timeout: Option<Duration>,
    stream_buffer_capacity: usize,
}

const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 128;

impl RunBuilder {
    pub(crate) fn new(transport: Arc<dyn ChatTransport>, agent_name: impl Into<String>) -> Self {
        Self {
            transport,
            agent_name: agent_name.into(),
            prompt: String::new(),
            timeout: None,
            stream_buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
        }
    }

    /// Sets the prompt sent to the agent.
    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = text.into();
        self
    }

    /// Sets an optional per-run timeout.
    ///
    /// The backend contract defines none; without one a hung connection
    /// blocks until `AbortHandle::abort` is invoked.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the bounded event buffer size used between the run task and the
    /// consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    /// Validates the request and starts the streaming run.
    ///
    /// The returned `ChatStream` yields `Started`, ordered `Delta`s, and a
    /// terminal `Completed`/`Failed` event.
    pub async fn start_stream(self) -> Result<ChatStream, ClientError> {
        self.validate()?;
        let request = ChatRequest {
            run_id: uuid::Uuid::new_v4(),
            agent_name: self.agent_name,
            prompt: self.prompt,
            timeout: self.timeout,
        };

        let (tx, rx) = mpsc::channel(self.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        let abort_handle = AbortHandle { tx: abort_tx };
        let run_id = request.run_id;
        let agent = request.agent_name.clone();
        tokio::spawn(run_task(self.transport, request, tx, final_tx, abort_rx));

        Ok(ChatStream {
            run_id,
            agent,
            rx,
            final_rx,
            abort_handle,
            saw_terminal: false,
        })
    }

    /// Runs to completion and returns the full reply text.
    pub async fn collect_reply(self) -> Result<String, ClientError> {
        let stream = self.start_stream().await?;
        stream.finish().await
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.agent_name.trim().is_empty() {
            return Err(ClientError::Validation(
                "agent name must not be empty".into(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(ClientError::Validation("prompt must not be empty".into()));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Streaming handle returned by `RunBuilder::start_stream`.
///
/// Use `next_event()` to consume events as they arrive and `finish()` to
/// obtain the final reply after the terminal event.
pub struct ChatStream {
    run_id: uuid::Uuid,
    agent: String,
    rx: mpsc::Receiver<ChatEvent>,
    final_rx: oneshot::Receiver<Result<String, ClientError>>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl ChatStream {
    /// Returns the run id for this stream.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns the agent this run targets.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the stream channel is closed.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let event = self.rx.recv().await;
        if let Some(ChatEvent::Completed { .. } | ChatEvent::Failed { .. }) = &event {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains the stream (if needed) and returns the terminal reply.
    ///
    /// This is safe to call after consuming events manually with
    /// `next_event()`.
    pub async fn finish(mut self) -> Result<String, ClientError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(ChatEvent::Completed { .. } | ChatEvent::Failed { .. }) => {
                    self.saw_terminal = true;
                }
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::protocol_msg(format!(
                "run task ended without a final result (agent={})",
                self.agent
            ))),
        }
    }
}

async fn run_task(
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    tx: mpsc::Sender<ChatEvent>,
    final_tx: oneshot::Sender<Result<String, ClientError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let run_id = request.run_id;
    let agent = request.agent_name.clone();

    if !send_event(
        &tx,
        ChatEvent::Started {
            run_id,
            agent: agent.clone(),
        },
    )
    .await
    {
        let _ = final_tx.send(Err(ClientError::protocol_msg(
            "chat stream receiver dropped before Started",
        )));
        return;
    }

    // The abort branch is listed first and the select is biased: a cancel
    // that is ready at the same time as a fragment always wins, and the
    // fragment is discarded with the stream.
    let mut chunks = tokio::select! {
        biased;
        _ = aborted(&mut abort_rx) => {
            finish_run(&tx, final_tx, run_id, RunFailure::Cancelled).await;
            return;
        }
        opened = transport.open(&request) => match opened {
            Ok(chunks) => chunks,
            Err(failure) => {
                finish_run(&tx, final_tx, run_id, failure).await;
                return;
            }
        },
    };

    let mut seq = 0_u64;
    let mut reply = String::new();
    loop {
        tokio::select! {
            biased;
            _ = aborted(&mut abort_rx) => {
                finish_run(&tx, final_tx, run_id, RunFailure::Cancelled).await;
                return;
            }
            next = chunks.next() => match next {
                Some(Ok(text)) => {
                    if text.is_empty() {
                        continue;
                    }
                    debug!(run_id = %run_id, agent = %agent, seq, len = text.len(), "agent output fragment");
                    reply.push_str(&text);
                    let sent = send_event(&tx, ChatEvent::Delta { run_id, seq, text }).await;
                    seq = seq.saturating_add(1);
                    if !sent {
                        let _ = final_tx.send(Err(ClientError::protocol_msg(
                            "chat stream receiver dropped during output",
                        )));
                        return;
                    }
                }
                Some(Err(failure)) => {
                    finish_run(&tx, final_tx, run_id, failure).await;
                    return;
                }
                None => {
                    let sent = send_event(
                        &tx,
                        ChatEvent::Completed {
                            run_id,
                            reply: reply.clone(),
                        },
                    )
                    .await;
                    let _ = final_tx.send(if sent {
                        Ok(reply)
                    } else {
                        Err(ClientError::protocol_msg(
                            "chat stream receiver dropped before completion",
                        ))
                    });
                    return;
                }
            },
        }
    }
}

async fn finish_run(
    tx: &mpsc::Sender<ChatEvent>,
    final_tx: oneshot::Sender<Result<String, ClientError>>,
    run_id: uuid::Uuid,
    failure: RunFailure,
) {
    let _ = send_event(
        tx,
        ChatEvent::Failed {
            run_id,
            failure: failure.clone(),
        },
    )
    .await;
    let _ = final_tx.send(Err(ClientError::RunFailed(failure)));
}

/// Resolves once cancellation has been requested; never resolves otherwise.
async fn aborted(abort_rx: &mut watch::Receiver<bool>) {
    loop {
        if *abort_rx.borrow() {
            return;
        }
        if abort_rx.changed().await.is_err() {
            // Every abort handle is gone; cancellation can no longer happen.
            futures::future::pending::<()>().await;
        }
    }
}

async fn send_event(tx: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    tx.send(event).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TextChunkStream;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTransport {
        calls: Arc<AtomicUsize>,
        behavior: FakeBehavior,
    }

    enum FakeBehavior {
        Chunks(Vec<Result<String, RunFailure>>),
        ImmediateError(RunFailure),
        PendingStream,
        PendingOpen,
    }

    #[async_trait::async_trait]
    impl ChatTransport for FakeTransport {
        async fn open(&self, _request: &ChatRequest) -> Result<TextChunkStream, RunFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                FakeBehavior::Chunks(items) => Ok(Box::pin(stream::iter(items.clone()))),
                FakeBehavior::ImmediateError(failure) => Err(failure.clone()),
                FakeBehavior::PendingStream => Ok(Box::pin(stream::pending())),
                FakeBehavior::PendingOpen => {
                    futures::future::pending::<()>().await;
                    unreachable!("pending open never resolves")
                }
            }
        }
    }

    fn builder_with(behavior: FakeBehavior) -> (RunBuilder, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Arc::new(FakeTransport {
            calls: calls.clone(),
            behavior,
        });
        (RunBuilder::new(transport, "writer"), calls)
    }

    fn ok_chunks(chunks: &[&str]) -> FakeBehavior {
        FakeBehavior::Chunks(chunks.iter().map(|c| Ok((*c).to_string())).collect())
    }

    #[tokio::test]
    async fn validation_rejects_empty_prompt_without_a_transport_call() {
        let (builder, calls) = builder_with(ok_chunks(&["hi"]));
        let err = builder.prompt("   ").start_stream().await;
        assert!(
            matches!(err, Err(ClientError::Validation(msg)) if msg.contains("prompt")),
            "whitespace prompt must be rejected"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_rejects_empty_agent_name() {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = Arc::new(FakeTransport {
            calls: calls.clone(),
            behavior: ok_chunks(&["hi"]),
        });
        let err = RunBuilder::new(transport, "  ")
            .prompt("hello")
            .start_stream()
            .await;
        assert!(matches!(err, Err(ClientError::Validation(msg)) if msg.contains("agent name")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_rejects_zero_buffer_capacity() {
        let (builder, _) = builder_with(ok_chunks(&["hi"]));
        let err = builder
            .prompt("hello")
            .stream_buffer_capacity(0)
            .start_stream()
            .await;
        assert!(
            matches!(err, Err(ClientError::Validation(msg)) if msg.contains("stream_buffer_capacity"))
        );
    }

    #[tokio::test]
    async fn emits_started_deltas_and_completed_in_order() {
        let (builder, _) = builder_with(ok_chunks(&["Hello", " world"]));
        let mut run = builder.prompt("hi").start_stream().await.expect("start");

        let first = run.next_event().await.expect("first event");
        assert!(matches!(first, ChatEvent::Started { .. }));

        let mut seqs = Vec::new();
        let mut texts = Vec::new();
        loop {
            match run.next_event().await.expect("event") {
                ChatEvent::Delta { seq, text, .. } => {
                    seqs.push(seq);
                    texts.push(text);
                }
                ChatEvent::Completed { reply, .. } => {
                    assert_eq!(reply, "Hello world");
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(texts, vec!["Hello".to_string(), " world".to_string()]);
        assert_eq!(run.finish().await.expect("finish"), "Hello world");
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let (builder, _) = builder_with(ok_chunks(&["a", "", "b"]));
        let run = builder.prompt("hi").start_stream().await.expect("start");
        assert_eq!(run.finish().await.expect("finish"), "ab");
    }

    #[tokio::test]
    async fn refused_invocation_is_a_terminal_failure() {
        let (builder, _) =
            builder_with(FakeBehavior::ImmediateError(RunFailure::Http { status: 503 }));
        let mut run = builder.prompt("hi").start_stream().await.expect("start");

        let mut saw_failure = false;
        while let Some(event) = run.next_event().await {
            if let ChatEvent::Failed { failure, .. } = event {
                assert_eq!(failure, RunFailure::Http { status: 503 });
                saw_failure = true;
                break;
            }
        }
        assert!(saw_failure);
        assert!(matches!(
            run.finish().await,
            Err(ClientError::RunFailed(RunFailure::Http { status: 503 }))
        ));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_earlier_fragments_ordered() {
        let (builder, _) = builder_with(FakeBehavior::Chunks(vec![
            Ok("partial".to_string()),
            Err(RunFailure::transport("connection reset")),
        ]));
        let mut run = builder.prompt("hi").start_stream().await.expect("start");

        let mut delivered = Vec::new();
        let mut failure = None;
        while let Some(event) = run.next_event().await {
            match event {
                ChatEvent::Delta { text, .. } => delivered.push(text),
                ChatEvent::Failed { failure: f, .. } => {
                    failure = Some(f);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(delivered, vec!["partial".to_string()]);
        assert!(matches!(failure, Some(RunFailure::Transport { .. })));
    }

    #[tokio::test]
    async fn abort_mid_stream_emits_cancelled() {
        let (builder, _) = builder_with(FakeBehavior::PendingStream);
        let mut run = builder.prompt("hi").start_stream().await.expect("start");

        let abort = run.abort_handle();
        let _ = run.next_event().await; // Started
        abort.abort();

        let mut saw_cancel = false;
        while let Some(event) = run.next_event().await {
            if let ChatEvent::Failed {
                failure: RunFailure::Cancelled,
                ..
            } = event
            {
                saw_cancel = true;
                break;
            }
        }
        assert!(saw_cancel);
        assert!(matches!(
            run.finish().await,
            Err(ClientError::RunFailed(RunFailure::Cancelled))
        ));
    }

    #[tokio::test]
    async fn abort_before_the_connection_opens_emits_cancelled() {
        let (builder, calls) = builder_with(FakeBehavior::PendingOpen);
        let mut run = builder.prompt("hi").start_stream().await.expect("start");

        let _ = run.next_event().await; // Started
        run.abort_handle().abort();

        let event = run.next_event().await.expect("terminal event");
        assert!(matches!(
            event,
            ChatEvent::Failed {
                failure: RunFailure::Cancelled,
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn collect_reply_concatenates_fragments() {
        let (builder, _) = builder_with(ok_chunks(&["one ", "two ", "three"]));
        let reply = builder.prompt("hi").collect_reply().await.expect("collect");
        assert_eq!(reply, "one two three");
    }
}
