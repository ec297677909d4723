//! HTTP client for the assistant chat endpoint.

pub mod http;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CasemateConfig;
use crate::error::{CasemateError, Result};
use crate::sse::{SseDecoder, StreamEvent};
use crate::types::ChatRequest;

/// Client for the assistant's chat-completion endpoint.
pub struct AssistantClient {
    http: reqwest::Client,
    config: CasemateConfig,
}

impl AssistantClient {
    /// Create a client from the given config.
    ///
    /// No overall request timeout is set: replies stream for as long as the
    /// model produces text. Callers wanting a deadline race the stream
    /// against a timer and cancel.
    pub fn new(config: CasemateConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self { http, config })
    }

    /// Send a chat request and stream the reply as text deltas.
    ///
    /// Each item is a non-empty fragment in arrival order. The stream ends
    /// normally on the terminator sentinel or on transport EOF, with or
    /// without the sentinel. An `Err` item is terminal: nothing follows it.
    pub async fn stream_reply(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        self.stream_reply_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`stream_reply`], stopping cooperatively when `cancel` fires.
    ///
    /// Cancellation ends the stream without an error item and without
    /// further reads from the transport. It is idempotent and may be
    /// triggered from any task.
    ///
    /// [`stream_reply`]: Self::stream_reply
    pub async fn stream_reply_with_cancel(
        &self,
        request: &ChatRequest,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let api_key = self.config.api_key().ok_or_else(|| {
            CasemateError::Authentication("no API key configured (CASEMATE_API_KEY)".into())
        })?;
        let url = format!("{}/chat/completions", self.config.base_url());

        debug!(messages = request.messages.len(), "assistant stream_reply");

        let resp = self
            .http
            .post(&url)
            .headers(http::bearer_headers(api_key))
            .json(request)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(http::status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream().map_err(CasemateError::Network);
        Ok(Box::pin(delta_stream(byte_stream, cancel)))
    }
}

/// Adapt a stream of raw byte chunks into a stream of text deltas.
///
/// One decoder per stream; instances are not reused across requests. A
/// transport `Err` aborts the stream after being yielded once; earlier
/// deltas stand.
pub fn delta_stream<S>(
    bytes: S,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = std::pin::pin!(bytes);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                next = bytes.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for event in decoder.push(&chunk) {
                match event {
                    StreamEvent::Delta(text) => yield Ok(text),
                    StreamEvent::Done => return,
                }
            }
        }

        // Transport EOF without the sentinel is still a normal completion.
        for event in decoder.finish() {
            match event {
                StreamEvent::Delta(text) => yield Ok(text),
                StreamEvent::Done => return,
            }
        }
    }
}

/// Drain a delta stream into the full reply text.
///
/// The accumulation is append-only: deltas are concatenated in arrival
/// order, and the result is final once the stream ends.
pub async fn collect_reply(
    mut stream: impl Stream<Item = Result<String>> + Unpin,
) -> Result<String> {
    let mut text = String::new();
    while let Some(delta) = stream.next().await {
        text.push_str(&delta?);
    }
    Ok(text)
}
