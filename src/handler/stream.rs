//! Streaming adapter
//!
//! Bridges a blocking chunk sequence from the coder into a streamed response
//! body. The sequence is driven on tokio's blocking pool and handed over a
//! bounded channel; the body forwards chunks in order, untouched, and yields
//! to the scheduler after each one.

use futures::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, OwnedMutexGuard};

use crate::coder::{ChunkStream, Coder};
use crate::http::{BodyError, ResponseBody};
use crate::logger;

type Chunk = anyhow::Result<String>;

/// Start `run_stream(message)` on a blocking thread.
///
/// Resolves once the coder has accepted the message: `Err` if `run_stream`
/// itself failed (nothing has been sent yet), otherwise a body that yields
/// the chunks as they are produced. A failure partway through ends the body
/// with an error. `guard` is released when the producer finishes.
pub async fn stream_reply(
    coder: Arc<dyn Coder>,
    message: String,
    buffer: usize,
    guard: Option<OwnedMutexGuard<()>>,
) -> anyhow::Result<ResponseBody> {
    let (started_tx, started_rx) = oneshot::channel();
    let (tx, rx) = mpsc::channel::<Chunk>(buffer.max(1));

    tokio::task::spawn_blocking(move || {
        let _guard = guard;
        match coder.run_stream(&message) {
            Ok(chunks) => {
                if started_tx.send(Ok(())).is_ok() {
                    forward_chunks(chunks, &tx);
                }
            }
            Err(e) => {
                let _ = started_tx.send(Err(e));
            }
        }
    });

    match started_rx.await {
        Ok(Ok(())) => Ok(chunk_body(rx)),
        Ok(Err(e)) => Err(e),
        // Sender dropped without a verdict: run_stream panicked
        Err(_) => Err(anyhow::anyhow!("coder panicked while starting the stream")),
    }
}

/// Pull chunks until the sequence ends, fails, or the receiver goes away.
fn forward_chunks(mut chunks: ChunkStream, tx: &mpsc::Sender<Chunk>) {
    loop {
        let next = match panic::catch_unwind(AssertUnwindSafe(|| chunks.next())) {
            Ok(Some(chunk)) => chunk,
            Ok(None) => return,
            Err(_) => Err(anyhow::anyhow!("coder panicked while streaming")),
        };

        let failed = match &next {
            Ok(_) => false,
            Err(e) => {
                logger::log_error(&format!("Coder stream failed: {e:#}"));
                true
            }
        };

        if tx.blocking_send(next).is_err() {
            // Client went away; dropping `chunks` abandons the coder's work
            logger::log_warning("Response stream closed by client, abandoning coder stream");
            return;
        }
        if failed {
            return;
        }
    }
}

/// Body yielding the received chunks in order, one data frame per chunk.
fn chunk_body(rx: mpsc::Receiver<Chunk>) -> ResponseBody {
    let frames = stream::unfold((rx, false), |(mut rx, forwarded)| async move {
        if forwarded {
            // Let other requests progress between chunks
            tokio::task::yield_now().await;
        }
        let chunk = rx.recv().await?;
        let frame = chunk
            .map(|text| Frame::data(Bytes::from(text)))
            .map_err(BodyError::from);
        Some((frame, (rx, true)))
    });

    StreamBody::new(frames).boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Replays a fixed script of chunks; `None` marks a failure at that point
    struct ScriptedCoder {
        chunks: Vec<Option<&'static str>>,
    }

    impl Coder for ScriptedCoder {
        fn run(&self, _message: &str) -> anyhow::Result<String> {
            unreachable!("only streaming is exercised here")
        }

        fn run_stream(&self, message: &str) -> anyhow::Result<ChunkStream> {
            if message == "refuse" {
                anyhow::bail!("coder refused the message");
            }
            let chunks = self.chunks.clone().into_iter().map(|c| match c {
                Some(text) => Ok(text.to_string()),
                None => Err(anyhow::anyhow!("model connection lost")),
            });
            Ok(Box::new(chunks))
        }

        fn repo_root(&self) -> &Path {
            Path::new("/")
        }
    }

    /// Endless sequence that records when it is dropped
    struct Endless {
        pulled: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl Iterator for Endless {
        type Item = anyhow::Result<String>;

        fn next(&mut self) -> Option<Self::Item> {
            self.pulled.fetch_add(1, Ordering::SeqCst);
            Some(Ok("tick".to_string()))
        }
    }

    impl Drop for Endless {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    struct EndlessCoder {
        pulled: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl Coder for EndlessCoder {
        fn run(&self, _message: &str) -> anyhow::Result<String> {
            unreachable!("only streaming is exercised here")
        }

        fn run_stream(&self, _message: &str) -> anyhow::Result<ChunkStream> {
            Ok(Box::new(Endless {
                pulled: Arc::clone(&self.pulled),
                dropped: Arc::clone(&self.dropped),
            }))
        }

        fn repo_root(&self) -> &Path {
            Path::new("/")
        }
    }

    async fn next_chunk(body: &mut ResponseBody) -> Option<Result<Bytes, BodyError>> {
        let frame = body.frame().await?;
        Some(frame.map(|f| f.into_data().unwrap_or_default()))
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let coder = Arc::new(ScriptedCoder {
            chunks: vec![Some("Hel"), Some("lo, "), Some(""), Some("world")],
        });
        let body = stream_reply(coder, "hi".to_string(), 1, None).await.unwrap();
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"Hello, world");
    }

    #[tokio::test]
    async fn test_start_failure_is_reported_before_body() {
        let coder = Arc::new(ScriptedCoder { chunks: Vec::new() });
        let err = stream_reply(coder, "refuse".to_string(), 4, None)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn test_failure_midway_ends_body_with_error() {
        let coder = Arc::new(ScriptedCoder {
            chunks: vec![Some("partial "), None, Some("never sent")],
        });
        let mut body = stream_reply(coder, "hi".to_string(), 4, None).await.unwrap();

        let first = next_chunk(&mut body).await.unwrap().unwrap();
        assert_eq!(&first[..], b"partial ");
        let err = next_chunk(&mut body).await.unwrap().unwrap_err();
        assert!(err.to_string().contains("model connection lost"));
        assert!(next_chunk(&mut body).await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_body_abandons_producer() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let coder = Arc::new(EndlessCoder {
            pulled: Arc::clone(&pulled),
            dropped: Arc::clone(&dropped),
        });

        let mut body = stream_reply(coder, "hi".to_string(), 1, None).await.unwrap();
        let first = next_chunk(&mut body).await.unwrap().unwrap();
        assert_eq!(&first[..], b"tick");
        drop(body);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !dropped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("producer kept running after the body was dropped");

        // Bounded channel: the producer can only run a few chunks ahead
        assert!(pulled.load(Ordering::SeqCst) < 10);
    }

    #[tokio::test]
    async fn test_guard_held_until_stream_finishes() {
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        let guard = Arc::clone(&lock).lock_owned().await;
        let coder = Arc::new(ScriptedCoder {
            chunks: vec![Some("a"), Some("b")],
        });

        let body = stream_reply(coder, "hi".to_string(), 1, Some(guard)).await.unwrap();
        assert!(lock.try_lock().is_err());
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"ab");

        let _released = tokio::time::timeout(Duration::from_secs(5), lock.lock())
            .await
            .expect("guard was not released");
    }
}
