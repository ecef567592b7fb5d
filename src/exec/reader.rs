// src/exec/reader.rs

//! Bounded, chunked draining of the child's output streams.
//!
//! Stdout and stderr are each read by their own future; the two futures are
//! joined by the caller so neither stream can stall the other. When a stream
//! grows past the output limit it trips a shared [`LimitSignal`], which stops
//! both readers and tells the pipeline to kill the child.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tracing::debug;

/// Bytes requested per read.
///
/// Also the worst-case overshoot past the output limit for a single stream.
pub const CHUNK_SIZE: usize = 8192;

/// One-shot, multi-listener flag raised when a stream exceeds its limit.
#[derive(Debug)]
pub struct LimitSignal {
    tx: watch::Sender<bool>,
}

impl LimitSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn trip(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_tripped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trip`](Self::trip) has been called.
    pub async fn tripped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|tripped| *tripped).await;
    }
}

impl Default for LimitSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Read `stream` to EOF in [`CHUNK_SIZE`] pieces.
///
/// With `limit = Some(l)`, reading stops as soon as more than `l` bytes have
/// been collected and `signal` is tripped. Reading also stops if another
/// reader trips `signal`. Bytes collected up to that point are returned.
/// A missing stream (output not captured) yields an empty buffer.
pub async fn read_stream<R>(
    stream: Option<R>,
    limit: Option<usize>,
    signal: &LimitSignal,
) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return Ok(Vec::new());
    };

    let mut output = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = tokio::select! {
            biased;
            _ = signal.tripped() => break,
            n = stream.read(&mut chunk) => n?,
        };
        if n == 0 {
            break;
        }

        output.extend_from_slice(&chunk[..n]);

        if let Some(limit) = limit {
            if output.len() > limit {
                debug!(limit, collected = output.len(), "output limit exceeded");
                signal.trip();
                break;
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_to_eof_without_limit() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let signal = LimitSignal::new();

        let out = read_stream(Some(&data[..]), None, &signal).await.unwrap();

        assert_eq!(out, data);
        assert!(!signal.is_tripped());
    }

    #[tokio::test]
    async fn missing_stream_is_empty() {
        let signal = LimitSignal::new();
        let out = read_stream(None::<&[u8]>, Some(10), &signal).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn exceeding_limit_trips_signal_and_keeps_partial_output() {
        let data = vec![1u8; CHUNK_SIZE * 4];
        let signal = LimitSignal::new();

        let out = read_stream(Some(&data[..]), Some(100), &signal)
            .await
            .unwrap();

        assert!(signal.is_tripped());
        assert!(out.len() > 100);
        assert!(out.len() <= 100 + CHUNK_SIZE);
    }

    #[tokio::test]
    async fn output_exactly_at_limit_is_not_cut() {
        let data = vec![1u8; 64];
        let signal = LimitSignal::new();

        let out = read_stream(Some(&data[..]), Some(64), &signal).await.unwrap();

        assert_eq!(out.len(), 64);
        assert!(!signal.is_tripped());
    }

    #[tokio::test]
    async fn tripped_signal_stops_other_reader() {
        let (_writer, reader) = tokio::io::duplex(64);
        let signal = LimitSignal::new();
        signal.trip();

        // The writer half stays open, so without the signal this would block.
        let out = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            read_stream(Some(reader), None, &signal),
        )
        .await
        .expect("reader should stop once the signal is tripped")
        .unwrap();

        assert!(out.is_empty());
    }
}
