//! Server-sent events decoding for streamed completions
//!
//! Every vendor streams over SSE: the response body is a sequence of lines,
//! payloads arrive on `data:` lines, and a blank line ends an event. Network
//! chunks do not respect line boundaries, so [`SseLineBuffer`] holds the
//! incomplete tail between reads.
//!
//! [`pump_sse`] drives one response body to completion, turning payloads
//! into [`StreamEvent`]s through a vendor-specific parser.

use ensemble_application::ProviderError;
use ensemble_domain::StreamEvent;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::debug;

/// What one `data:` payload means to a vendor parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseStep {
    /// A text fragment to forward
    Delta(String),
    /// The vendor's end-of-stream marker
    Done,
    /// The vendor reported an error inside the stream
    Error(String),
    /// Keep-alive, metadata or an empty fragment
    Skip,
}

/// Accumulates raw body bytes and yields complete `data:` payloads.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every payload completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(payload) = Self::data_payload(&line_bytes) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        Self::data_payload(&rest)
    }

    fn data_payload(line_bytes: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line_bytes);
        let line = line.trim_end_matches(['\r', '\n']);
        let payload = line.strip_prefix("data:")?;
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        (!payload.is_empty()).then(|| payload.to_string())
    }
}

/// Read `response` to the end, forwarding parsed fragments to `tx`.
///
/// Always finishes with exactly one `Completed` or `Error` event unless the
/// receiver went away, in which case the response is dropped immediately.
/// A body that ends without a vendor terminator still completes.
pub async fn pump_sse<F>(
    response: reqwest::Response,
    tx: mpsc::Sender<StreamEvent>,
    provider: &'static str,
    mut parse: F,
) where
    F: FnMut(&str) -> SseStep + Send,
{
    let mut stream = response.bytes_stream();
    let mut lines = SseLineBuffer::new();
    let mut accumulated = String::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error(format!("{provider} stream interrupted: {e}")))
                    .await;
                return;
            }
        };

        for payload in lines.push(&bytes) {
            match forward(&tx, &mut accumulated, parse(&payload)).await {
                Flow::Continue => {}
                Flow::Stop => return,
            }
        }
    }

    if let Some(payload) = lines.finish()
        && let Flow::Stop = forward(&tx, &mut accumulated, parse(&payload)).await
    {
        return;
    }

    debug!(provider, bytes = accumulated.len(), "Stream ended without terminator");
    let _ = tx.send(StreamEvent::Completed(accumulated)).await;
}

enum Flow {
    Continue,
    Stop,
}

async fn forward(
    tx: &mpsc::Sender<StreamEvent>,
    accumulated: &mut String,
    step: SseStep,
) -> Flow {
    match step {
        SseStep::Skip => Flow::Continue,
        SseStep::Delta(fragment) => {
            accumulated.push_str(&fragment);
            if tx.send(StreamEvent::Delta(fragment)).await.is_err() {
                debug!("Stream consumer dropped, releasing connection");
                return Flow::Stop;
            }
            Flow::Continue
        }
        SseStep::Done => {
            let _ = tx
                .send(StreamEvent::Completed(std::mem::take(accumulated)))
                .await;
            Flow::Stop
        }
        SseStep::Error(message) => {
            let _ = tx.send(StreamEvent::Error(message)).await;
            Flow::Stop
        }
    }
}

/// Parse a JSON payload, mapping malformed input to a stream error step.
pub fn parse_json<T: serde::de::DeserializeOwned>(
    payload: &str,
    provider: &str,
) -> Result<T, SseStep> {
    serde_json::from_str(payload).map_err(|e| {
        SseStep::Error(
            ProviderError::Decode(format!("{provider} stream payload: {e}")).to_string(),
        )
    })
}
