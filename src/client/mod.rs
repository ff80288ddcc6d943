//! The assembled log-shipping client handle

pub mod builder;

use crate::buffer::Buffer;
use crate::config::ClientOptions;
use crate::flusher::AsyncFlusher;
use crate::types::{Record, RecordFields, RecordFormatter};
use crate::{LogShipError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A running log-shipping client.
///
/// Produced by [`LogShip::build`]; the caller is the sole owner and is
/// responsible for calling [`LogShip::close`] before dropping it so buffered
/// data is drained (and backed up, when configured).
pub struct LogShip {
    formatter: RecordFormatter,
    buffer: Arc<Buffer>,
    flusher: AsyncFlusher,
    closed: AtomicBool,
}

impl LogShip {
    /// Validate configuration, resolve defaults and assemble a client.
    ///
    /// Fails with [`LogShipError::InvalidConfiguration`] when the credential
    /// is empty, and with [`LogShipError::ComponentConstruction`] when a
    /// component cannot initialize, in both cases before any background
    /// activity has started, so the caller owns nothing to clean up.
    pub async fn build(
        credential: impl Into<String>,
        options: Option<ClientOptions>,
    ) -> Result<Self> {
        builder::build(credential.into(), options).await
    }

    /// Buffer one record under a tag, stamping the current time
    pub fn append_now(&self, tag: &str, fields: RecordFields) -> Result<()> {
        self.append(tag, &Record::now(fields))
    }

    /// Buffer one record under a tag.
    ///
    /// Fails with [`LogShipError::BufferFull`] when the buffer cap is
    /// reached, and with [`LogShipError::Closed`] after [`LogShip::close`].
    pub fn append(&self, tag: &str, record: &Record) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogShipError::Closed);
        }
        let line = self.formatter.format(tag, record)?;
        self.buffer.append(tag, &line)
    }

    /// Rotate and deliver everything buffered so far.
    ///
    /// Delivery failures are reported through the configured error handler,
    /// not returned here.
    pub async fn flush(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LogShipError::Closed);
        }
        self.flusher.flush().await
    }

    /// Shut the client down.
    ///
    /// Drains the buffer bounded by the configured drain wait, stops the
    /// flush worker bounded by the configured termination wait, then persists
    /// anything still undelivered to the backup directory when one is
    /// configured. Subsequent calls are no-ops.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.flusher.close().await?;
        self.buffer.backup_unflushed()
    }

    /// Total bytes currently buffered and not yet delivered
    pub fn buffered_bytes(&self) -> u64 {
        self.buffer.buffered_bytes()
    }
}
