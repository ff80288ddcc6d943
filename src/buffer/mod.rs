//! Chunked memory buffer with optional on-disk backup.
//!
//! Formatted lines accumulate in one active chunk per tag. When a chunk
//! reaches the retention size it rotates into the pending queue, where the
//! flush scheduler picks it up for delivery. Total buffered bytes (active
//! plus pending) are capped; appends beyond the cap fail with
//! [`LogShipError::BufferFull`] instead of growing without bound.

mod backup;

use crate::config::BufferConfig;
use crate::{LogShipError, Result};
use backup::FileBackup;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A rotated unit of buffered data awaiting delivery
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Tag the contained records were appended under
    pub tag: String,
    /// Newline-delimited payload bytes
    pub payload: Bytes,
}

impl Chunk {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the chunk carries no data
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Memory buffer holding not-yet-delivered records
pub struct Buffer {
    config: BufferConfig,
    active: DashMap<String, BytesMut>,
    pending: Mutex<VecDeque<Chunk>>,
    total: AtomicU64,
    backup: Option<FileBackup>,
}

impl Buffer {
    /// Create a buffer from a resolved configuration.
    ///
    /// When a backup directory is configured and in-memory-only mode is off,
    /// the directory is created if needed and any chunks persisted by a
    /// previous run are reloaded into the pending queue. Directory failures
    /// surface as [`LogShipError::ComponentConstruction`].
    pub fn new(config: BufferConfig) -> Result<Self> {
        let backup = match (&config.file_backup_dir, config.in_memory_only) {
            (Some(dir), false) => Some(FileBackup::new(dir)?),
            _ => None,
        };

        let buffer = Self {
            config,
            active: DashMap::new(),
            pending: Mutex::new(VecDeque::new()),
            total: AtomicU64::new(0),
            backup,
        };

        if let Some(file_backup) = &buffer.backup {
            let restored = file_backup.load_all()?;
            if !restored.is_empty() {
                debug!(chunks = restored.len(), "restored backed-up chunks");
                let mut pending = buffer.pending.lock();
                for chunk in restored {
                    buffer.total.fetch_add(chunk.len() as u64, Ordering::Relaxed);
                    pending.push_back(chunk);
                }
            }
        }

        Ok(buffer)
    }

    /// Append one formatted line under a tag.
    ///
    /// Rotates the tag's active chunk into the pending queue once it reaches
    /// the retention size.
    pub fn append(&self, tag: &str, line: &[u8]) -> Result<()> {
        let len = line.len() as u64;
        // Reserve the bytes atomically so concurrent appends cannot race past
        // the cap between a check and a separate add
        let reserved = self
            .total
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |total| {
                total
                    .checked_add(len)
                    .filter(|next| *next <= self.config.max_buffer_size)
            });
        if reserved.is_err() {
            return Err(LogShipError::BufferFull);
        }

        let mut chunk = self
            .active
            .entry(tag.to_string())
            .or_insert_with(|| BytesMut::with_capacity(self.config.chunk_initial_size));
        chunk.extend_from_slice(line);

        if chunk.len() >= self.config.chunk_retention_size {
            let payload = chunk.split().freeze();
            self.pending.lock().push_back(Chunk {
                tag: tag.to_string(),
                payload,
            });
        }

        Ok(())
    }

    /// Rotate every non-empty active chunk into the pending queue
    pub fn rotate_all(&self) {
        for mut entry in self.active.iter_mut() {
            if !entry.is_empty() {
                let payload = entry.split().freeze();
                self.pending.lock().push_back(Chunk {
                    tag: entry.key().clone(),
                    payload,
                });
            }
        }
    }

    /// Drain the pending queue, releasing the drained bytes from the cap
    pub fn take_pending(&self) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = {
            let mut pending = self.pending.lock();
            pending.drain(..).collect()
        };
        for chunk in &chunks {
            self.total.fetch_sub(chunk.len() as u64, Ordering::Relaxed);
        }
        chunks
    }

    /// Put a chunk back at the front of the queue after a failed delivery
    pub fn requeue(&self, chunk: Chunk) {
        self.total.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        self.pending.lock().push_front(chunk);
    }

    /// Total buffered bytes, active and pending
    pub fn buffered_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Whether no buffered data remains
    pub fn is_empty(&self) -> bool {
        self.buffered_bytes() == 0
    }

    /// Persist all remaining data to the backup directory, if one is active.
    ///
    /// No-op when backup is disabled. Called on shutdown after the drain
    /// window has passed.
    pub fn backup_unflushed(&self) -> Result<()> {
        let Some(file_backup) = &self.backup else {
            return Ok(());
        };

        self.rotate_all();
        for chunk in self.take_pending() {
            file_backup.save(&chunk)?;
        }
        Ok(())
    }
}
