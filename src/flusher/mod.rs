//! Periodic flush scheduling.
//!
//! The flusher owns the only background concurrency in the client: a Tokio
//! task that rotates and delivers pending chunks on every flush interval.
//! Chunks whose delivery fails with a retriable error go back to the front
//! of the queue for the next pass; permanent failures drop the chunk after
//! the sender has notified the error handler.

use crate::buffer::{Buffer, Chunk};
use crate::config::FlusherConfig;
use crate::ingest::Ingester;
use crate::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chunks taken out of the buffer for delivery.
///
/// A chunk stays in the batch until its delivery attempt has resolved. If
/// the surrounding future is dropped mid-delivery (worker abort, drain
/// deadline) the drop impl puts everything still unresolved back into the
/// buffer, so no chunk vanishes with the cancelled future.
struct PendingBatch<'a> {
    buffer: &'a Buffer,
    chunks: VecDeque<Chunk>,
}

impl<'a> PendingBatch<'a> {
    fn take_from(buffer: &'a Buffer) -> Self {
        Self {
            buffer,
            chunks: buffer.take_pending().into(),
        }
    }

    fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn front(&self) -> Option<&Chunk> {
        self.chunks.front()
    }

    fn pop(&mut self) -> Option<Chunk> {
        self.chunks.pop_front()
    }
}

impl Drop for PendingBatch<'_> {
    fn drop(&mut self) {
        // Reverse order keeps push_front from scrambling the queue
        for chunk in self.chunks.drain(..).rev() {
            self.buffer.requeue(chunk);
        }
    }
}

/// Background flush scheduler driving chunk delivery
pub struct AsyncFlusher {
    config: FlusherConfig,
    buffer: Arc<Buffer>,
    ingester: Arc<Ingester>,
    shutdown_tx: broadcast::Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncFlusher {
    /// Spawn the flush task over the given buffer and ingester.
    ///
    /// This is the last construction step of the client: nothing runs in the
    /// background until it is called.
    pub fn start(config: FlusherConfig, buffer: Arc<Buffer>, ingester: Ingester) -> Self {
        let ingester = Arc::new(ingester);
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let worker = tokio::spawn({
            let buffer = Arc::clone(&buffer);
            let ingester = Arc::clone(&ingester);
            let flush_interval = config.flush_interval;
            async move {
                let mut ticker = tokio::time::interval(flush_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            Self::deliver_pending(&buffer, &ingester).await;
                        }
                        // Final drain is owned by close(), which can bound it
                        _ = shutdown_rx.recv() => break,
                    }
                }
                debug!("flush worker stopped");
            }
        });

        Self {
            config,
            buffer,
            ingester,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
        }
    }

    async fn deliver_pending(buffer: &Buffer, ingester: &Ingester) {
        let mut batch = PendingBatch::take_from(buffer);
        loop {
            // The chunk stays at the batch front across the await so the
            // guard still covers it if this future is dropped mid-delivery
            let result = match batch.front() {
                Some(chunk) => ingester.ingest(chunk).await,
                None => break,
            };
            let Some(chunk) = batch.pop() else { break };
            match result {
                Ok(()) => {}
                Err(err) if err.is_retriable() => {
                    warn!(tag = %chunk.tag, "delivery failed, requeueing chunk");
                    buffer.requeue(chunk);
                }
                Err(_) => {
                    error!(tag = %chunk.tag, bytes = chunk.len(), "dropping undeliverable chunk");
                }
            }
        }
    }

    /// Rotate all active chunks and deliver everything pending right now
    pub async fn flush(&self) -> Result<()> {
        self.buffer.rotate_all();
        Self::deliver_pending(&self.buffer, &self.ingester).await;
        Ok(())
    }

    /// Stop the flusher.
    ///
    /// Signals the worker and waits for it bounded by the configured
    /// termination wait (aborting if it outlives its window), then drains the
    /// buffer bounded by the configured drain wait. The two timeouts are
    /// independent. Chunks that cannot be delivered inside the drain window
    /// stay in the pending queue, where a configured backup directory can
    /// still pick them up.
    pub async fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(());

        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            if tokio::time::timeout(self.config.wait_until_flusher_terminated, &mut worker)
                .await
                .is_err()
            {
                warn!("flush worker did not terminate within the shutdown wait, aborting");
                worker.abort();
                // Join the aborted task so any chunk it had in flight is back
                // in the queue before the drain and backup passes look
                let _ = worker.await;
            }
        }

        self.drain(self.config.wait_until_buffer_flushed).await;
        if !self.buffer.is_empty() {
            warn!(
                remaining = self.buffer.buffered_bytes(),
                "buffer did not drain within the shutdown wait"
            );
        }

        Ok(())
    }

    /// Deliver everything pending, never letting a single chunk escape the
    /// queue on cancellation: an in-flight delivery cut off by the deadline
    /// is requeued, not lost.
    async fn drain(&self, wait: Duration) {
        let deadline = tokio::time::Instant::now() + wait;
        self.buffer.rotate_all();

        loop {
            let mut batch = PendingBatch::take_from(&self.buffer);
            if batch.is_empty() {
                break;
            }

            loop {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                if remaining.is_zero() {
                    // Dropping the batch requeues whatever is left
                    break;
                }
                let result = match batch.front() {
                    Some(chunk) => {
                        tokio::time::timeout(remaining, self.ingester.ingest(chunk)).await
                    }
                    None => break,
                };
                let Some(chunk) = batch.pop() else { break };
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) if err.is_retriable() => self.buffer.requeue(chunk),
                    Ok(Err(_)) => {
                        error!(tag = %chunk.tag, bytes = chunk.len(), "dropping undeliverable chunk");
                    }
                    Err(_) => self.buffer.requeue(chunk),
                }
            }
            drop(batch);

            if tokio::time::Instant::now() >= deadline {
                break;
            }
            if !self.buffer.is_empty() {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        }
    }
}
