//! # LogShip - Buffered Log Shipping for Rust
//!
//! LogShip is a client library that buffers structured log records in memory
//! and ships them in chunks to a remote ingestion endpoint over HTTP.
//!
//! ## Features
//!
//! - **Chunked Buffering**: Records accumulate in per-tag chunks that rotate
//!   for delivery once they reach a configurable retention size
//! - **Async Flushing**: A background Tokio task periodically delivers rotated
//!   chunks; delivery failures are retried with exponential backoff
//! - **Backpressure**: A hard cap on total buffered bytes rejects appends
//!   instead of growing without bound
//! - **Crash Safety**: Unflushed chunks can be persisted to a backup directory
//!   on shutdown and reloaded on the next start
//!
//! ## Quick Start
//!
//! ```no_run
//! use logship::client::LogShip;
//! use logship::config::ClientOptions;
//! use logship::types::Record;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions {
//!         endpoint: Some("https://ingest.example.com/v1/chunks".to_string()),
//!         ..Default::default()
//!     };
//!     let client = LogShip::build("my-api-key", Some(options)).await?;
//!
//!     let mut fields = HashMap::new();
//!     fields.insert("event".to_string(), "login".into());
//!     client.append("app.access", &Record::now(fields))?;
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod client;
pub mod config;
pub mod flusher;
pub mod ingest;
pub mod types;

/// Common error types used throughout LogShip
pub mod error {
    use std::fmt;

    /// LogShip error types
    #[derive(Debug)]
    pub enum LogShipError {
        /// A mandatory configuration value is missing or invalid
        InvalidConfiguration(String),
        /// A component failed to initialize during client assembly
        ComponentConstruction(String),
        /// The buffer has reached its configured maximum size
        BufferFull,
        /// I/O operation failed
        Io(std::io::Error),
        /// Serialization/deserialization failed
        Serde(serde_json::Error),
        /// Chunk delivery to the ingestion endpoint failed
        Delivery {
            /// What went wrong
            message: String,
            /// Whether the chunk is worth retrying later
            retriable: bool,
        },
        /// The client has already been closed
        Closed,
    }

    impl LogShipError {
        /// Whether the failed operation may succeed if attempted again
        pub fn is_retriable(&self) -> bool {
            match self {
                LogShipError::Delivery { retriable, .. } => *retriable,
                LogShipError::Io(_) => true,
                _ => false,
            }
        }
    }

    impl fmt::Display for LogShipError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                LogShipError::InvalidConfiguration(e) => write!(f, "Invalid configuration: {}", e),
                LogShipError::ComponentConstruction(e) => {
                    write!(f, "Component construction failed: {}", e)
                }
                LogShipError::BufferFull => write!(f, "Buffer is full"),
                LogShipError::Io(e) => write!(f, "I/O error: {}", e),
                LogShipError::Serde(e) => write!(f, "Serialization error: {}", e),
                LogShipError::Delivery { message, .. } => write!(f, "Delivery error: {}", message),
                LogShipError::Closed => write!(f, "Client is closed"),
            }
        }
    }

    impl std::error::Error for LogShipError {}

    impl From<std::io::Error> for LogShipError {
        fn from(err: std::io::Error) -> Self {
            LogShipError::Io(err)
        }
    }

    impl From<serde_json::Error> for LogShipError {
        fn from(err: serde_json::Error) -> Self {
            LogShipError::Serde(err)
        }
    }

    /// Result type alias for LogShip operations
    pub type Result<T> = std::result::Result<T, LogShipError>;
}

pub use error::{LogShipError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::LogShip;
    pub use crate::config::ClientOptions;
    pub use crate::ingest::sender::ErrorHandler;
    pub use crate::types::{Record, RecordFields};
    pub use crate::{LogShipError, Result};
}
