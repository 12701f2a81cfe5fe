use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::config::BackendConfig;
use crate::errors::RunFailure;

/// Wire request for one agent invocation.
///
/// Serializes to the `POST /agent` body `{agent_name, prompt}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ChatRequest {
    #[serde(skip)]
    pub run_id: uuid::Uuid,
    pub agent_name: String,
    pub prompt: String,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// Ordered stream of decoded text fragments from one invocation.
pub type TextChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<String, RunFailure>> + Send + 'static>>;

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Transport seam for opening an agent invocation stream.
///
/// The HTTP implementation talks to the real backend; tests substitute fakes
/// that replay scripted fragments.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<TextChunkStream, RunFailure>;
}

/// `ChatTransport` over the backend's `POST /agent` endpoint.
pub struct HttpChatTransport {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpChatTransport {
    pub fn new(client: reqwest::Client, config: BackendConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(&self, request: &ChatRequest) -> Result<TextChunkStream, RunFailure> {
        debug!(run_id = %request.run_id, agent = %request.agent_name, "opening agent invocation stream");
        let mut http_req = self.client.post(self.config.run_url()).json(request);
        if let Some(timeout) = request.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| RunFailure::transport(format!("agent request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RunFailure::Http {
                status: status.as_u16(),
            });
        }

        let bytes: ByteStream = Box::pin(response.bytes_stream());
        Ok(text_chunk_stream(bytes))
    }
}

/// Buffering UTF-8 decoder for byte chunks whose boundaries may split
/// multi-byte sequences.
#[derive(Default)]
pub(crate) struct Utf8ChunkDecoder {
    buf: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decodes the longest valid prefix of the buffered bytes, keeping an
    /// incomplete trailing sequence for the next chunk.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Option<String>, RunFailure> {
        self.buf.extend_from_slice(chunk);
        let valid_up_to = match std::str::from_utf8(&self.buf) {
            Ok(_) => self.buf.len(),
            Err(err) if err.error_len().is_none() => err.valid_up_to(),
            Err(err) => {
                return Err(RunFailure::decode(format!(
                    "response is not valid UTF-8: {err}"
                )));
            }
        };
        if valid_up_to == 0 {
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&self.buf[..valid_up_to]).into_owned();
        self.buf.drain(..valid_up_to);
        Ok(Some(text))
    }

    /// Fails if the stream ended in the middle of a multi-byte sequence.
    pub fn finish(&self) -> Result<(), RunFailure> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(RunFailure::decode(
                "response ended inside a multi-byte UTF-8 sequence",
            ))
        }
    }
}

fn text_chunk_stream(bytes_stream: ByteStream) -> TextChunkStream {
    struct State {
        bytes_stream: ByteStream,
        decoder: Utf8ChunkDecoder,
        done: bool,
    }

    Box::pin(stream::try_unfold(
        State {
            bytes_stream,
            decoder: Utf8ChunkDecoder::default(),
            done: false,
        },
        |mut state| async move {
            loop {
                if state.done {
                    return Ok(None);
                }
                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => match state.decoder.push_chunk(&chunk)? {
                        Some(text) => return Ok(Some((text, state))),
                        None => continue,
                    },
                    Some(Err(e)) => {
                        return Err(RunFailure::transport(format!("streaming read failed: {e}")));
                    }
                    None => {
                        state.decoder.finish()?;
                        state.done = true;
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_passes_ascii_through() {
        let mut decoder = Utf8ChunkDecoder::default();
        let text = decoder.push_chunk(b"hello").expect("decode");
        assert_eq!(text.as_deref(), Some("hello"));
        decoder.finish().expect("clean end");
    }

    #[test]
    fn decoder_reassembles_a_split_multibyte_sequence() {
        // "é" is [0xC3, 0xA9]; split it across two network chunks.
        let mut decoder = Utf8ChunkDecoder::default();
        let first = decoder.push_chunk(&[b'c', b'a', b'f', 0xC3]).expect("decode");
        assert_eq!(first.as_deref(), Some("caf"));
        let second = decoder.push_chunk(&[0xA9]).expect("decode");
        assert_eq!(second.as_deref(), Some("é"));
        decoder.finish().expect("clean end");
    }

    #[test]
    fn decoder_rejects_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        let err = decoder.push_chunk(&[0xFF, b'x']).expect_err("must fail");
        assert!(matches!(err, RunFailure::Decode { .. }));
    }

    #[test]
    fn dangling_tail_at_end_of_stream_is_a_decode_failure() {
        let mut decoder = Utf8ChunkDecoder::default();
        let text = decoder.push_chunk(&[b'a', 0xC3]).expect("decode");
        assert_eq!(text.as_deref(), Some("a"));
        let err = decoder.finish().expect_err("must fail");
        assert!(matches!(err, RunFailure::Decode { .. }));
    }

    #[test]
    fn chat_request_body_carries_only_name_and_prompt() {
        let request = ChatRequest {
            run_id: uuid::Uuid::new_v4(),
            agent_name: "writer".into(),
            prompt: "hello".into(),
            timeout: None,
        };
        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({ "agent_name": "writer", "prompt": "hello" })
        );
    }
}
