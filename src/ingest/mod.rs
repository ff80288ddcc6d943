//! Chunk ingestion: the sender and its delivery wrapper

pub mod sender;

pub use sender::{ErrorHandler, HttpSender, SenderConfig};

use crate::buffer::Chunk;
use crate::Result;

/// Accepts buffered chunks and attempts delivery through a sender.
///
/// The ingester knows nothing about retry policy; that lives inside the
/// sender it wraps.
pub struct Ingester {
    sender: HttpSender,
}

impl Ingester {
    /// Wrap a constructed sender
    pub fn new(sender: HttpSender) -> Self {
        Self { sender }
    }

    /// Attempt delivery of one chunk
    pub async fn ingest(&self, chunk: &Chunk) -> Result<()> {
        self.sender.send(&chunk.tag, chunk.payload.clone()).await
    }

    /// The endpoint the wrapped sender delivers to
    pub fn endpoint(&self) -> &str {
        self.sender.endpoint()
    }
}
