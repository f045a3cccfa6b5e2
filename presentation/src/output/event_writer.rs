//! Writes an event stream to any async writer (stdout for the CLI).
//!
//! Uses the same framing as the HTTP surface, so `ensemble-server run`
//! output can be piped into anything that reads the event stream.

use crate::wire::EventEncoder;
use ensemble_domain::EnsembleEvent;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::warn;

/// Drain `rx` into `out`, flushing after every frame.
///
/// Returns the number of frames written once the channel closes.
pub async fn write_events<W>(
    mut rx: mpsc::Receiver<EnsembleEvent>,
    mut out: W,
) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;

    while let Some(event) = rx.recv().await {
        let frame = match EventEncoder.encode(&event) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = event.kind(), "Dropping unencodable event: {}", e);
                continue;
            }
        };
        out.write_all(frame.as_bytes()).await?;
        out.flush().await?;
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_frames_in_order() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(EnsembleEvent::AgreementStart).await.unwrap();
        tx.send(EnsembleEvent::ConsensusChunk {
            content: "Paris".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        let mut out = Vec::new();
        let count = write_events(rx, &mut out).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "data: {\"type\":\"agreement_start\"}\n\n\
             data: {\"type\":\"consensus_chunk\",\"content\":\"Paris\"}\n\n"
        );
    }
}
