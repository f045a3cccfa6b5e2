//! Streaming events for a single provider generation.
//!
//! [`StreamEvent`] is what a provider adapter's producer task pushes while
//! reading a vendor stream, bridging transport-level chunks (SSE lines,
//! chunked JSON) to the orchestrator.

/// An event in a streaming LLM response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental text fragment, in arrival order.
    Delta(String),
    /// The complete response text (signals stream end).
    Completed(String),
    /// A failure reported mid-stream (signals stream end).
    Error(String),
}
