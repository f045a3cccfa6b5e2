//! Provider adapter port
//!
//! Defines the uniform capability interface every vendor backend implements:
//! one-shot completion, streamed completion and (optionally) embeddings.

use async_trait::async_trait;
use ensemble_domain::{ProviderKind, StreamEvent};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during provider operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Handle for receiving streaming events from one generation.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` fed by the adapter's producer
/// task. Dropping the handle closes the channel; the producer notices on its
/// next send and releases the underlying connection.
pub struct StreamHandle {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Create a bounded producer/consumer pair.
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// A finished stream carrying a single complete text.
    pub fn from_text(text: String) -> Self {
        let (tx, handle) = Self::channel(1);
        // capacity 1 and a fresh receiver: this never fails
        let _ = tx.try_send(StreamEvent::Completed(text));
        handle
    }

    /// Receive the next event, or `None` once the producer is gone.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut full_text = String::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Delta(chunk) => full_text.push_str(&chunk),
                StreamEvent::Completed(text) => {
                    if full_text.is_empty() {
                        return Ok(text);
                    }
                    return Ok(full_text);
                }
                StreamEvent::Error(e) => return Err(ProviderError::Stream(e)),
            }
        }
        // Channel closed without Completed, return what we have
        Ok(full_text)
    }
}

/// A vendor backend bound to one credential.
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which vendor this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Issue a single completion and return the full text.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ProviderError>;

    /// Issue a streamed completion.
    ///
    /// Default implementation calls `generate()` and yields the result as a
    /// single `Completed` event.
    async fn generate_stream(&self, prompt: &str, model: &str) -> Result<StreamHandle, ProviderError> {
        let text = self.generate(prompt, model).await?;
        Ok(StreamHandle::from_text(text))
    }

    /// Whether `embed` can return vectors.
    fn supports_embeddings(&self) -> bool {
        false
    }

    /// Embed each text, returning one vector per input in order.
    ///
    /// Adapters without embeddings return an empty list instead of failing.
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAdapter;

    #[async_trait]
    impl ProviderAdapter for EchoAdapter {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Grok
        }

        async fn generate(&self, prompt: &str, model: &str) -> Result<String, ProviderError> {
            Ok(format!("{model}: {prompt}"))
        }
    }

    #[tokio::test]
    async fn test_default_stream_wraps_generate() {
        let handle = EchoAdapter.generate_stream("hi", "m").await.unwrap();
        assert_eq!(handle.collect_text().await.unwrap(), "m: hi");
    }

    #[tokio::test]
    async fn test_default_embed_is_empty() {
        assert!(!EchoAdapter.supports_embeddings());
        let vectors = EchoAdapter.embed(&["x".to_string()]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn test_collect_text_prefers_deltas() {
        let (tx, handle) = StreamHandle::channel(4);
        tx.send(StreamEvent::Delta("a".into())).await.unwrap();
        tx.send(StreamEvent::Delta("b".into())).await.unwrap();
        tx.send(StreamEvent::Completed("ignored".into())).await.unwrap();
        assert_eq!(handle.collect_text().await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_collect_text_surfaces_stream_error() {
        let (tx, handle) = StreamHandle::channel(4);
        tx.send(StreamEvent::Delta("a".into())).await.unwrap();
        tx.send(StreamEvent::Error("overloaded".into())).await.unwrap();
        assert_eq!(
            handle.collect_text().await.unwrap_err(),
            ProviderError::Stream("overloaded".to_string())
        );
    }

    #[tokio::test]
    async fn test_dropping_handle_closes_producer() {
        let (tx, handle) = StreamHandle::channel(1);
        drop(handle);
        assert!(tx.send(StreamEvent::Delta("x".into())).await.is_err());
    }
}
