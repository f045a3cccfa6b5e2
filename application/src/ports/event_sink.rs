//! Event sink port
//!
//! Every task of a run writes its [`EnsembleEvent`]s through a clone of the
//! same [`EventSink`]. The sink is a bounded channel drained by a single
//! writer, so each event reaches the client as one unit and never
//! interleaves with another.

use ensemble_domain::EnsembleEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// The consumer side of the event stream has gone away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Event stream closed by the client")]
pub struct SinkClosed;

#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<EnsembleEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<EnsembleEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver its writer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EnsembleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Queue one event, waiting for buffer space.
    pub async fn emit(&self, event: EnsembleEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
