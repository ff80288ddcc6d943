//! User-facing client options and the default-resolution step.
//!
//! [`ClientOptions`] is a flat, immutable value: every field is independently
//! optional, and an unset field means "use the documented default", never
//! "disabled". [`merge`] resolves options into a [`ResolvedTopology`] whose
//! configs are fully populated; everything downstream of the merge assumes
//! completeness. The merge is pure and applies defaults per field, so setting
//! one option never changes the default chosen for another.

use crate::ingest::sender::ErrorHandler;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on total buffered, unflushed bytes (512 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: u64 = 512 * 1024 * 1024;

/// Default initial allocation per buffer chunk (1 MiB)
pub const DEFAULT_CHUNK_INITIAL_SIZE: usize = 1024 * 1024;

/// Default size threshold at which a chunk rotates out for delivery (4 MiB)
pub const DEFAULT_CHUNK_RETENTION_SIZE: usize = 4 * 1024 * 1024;

/// Default period between scheduled flush attempts
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(600);

/// Default maximum wait for the buffer to drain on shutdown
pub const DEFAULT_WAIT_UNTIL_BUFFER_FLUSHED: Duration = Duration::from_secs(10);

/// Default maximum wait for the flush worker to stop on shutdown
pub const DEFAULT_WAIT_UNTIL_FLUSHER_TERMINATED: Duration = Duration::from_secs(10);

/// User-supplied client tuning options.
///
/// All fields are optional; `None` selects the documented default. The value
/// is read-only once handed to [`LogShip::build`](crate::client::LogShip::build).
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// Overrides the sender's built-in ingestion endpoint
    pub endpoint: Option<String>,
    /// Upper bound on total buffered, unflushed bytes
    pub max_buffer_size: Option<u64>,
    /// Initial allocation size per buffer chunk
    pub chunk_initial_size: Option<usize>,
    /// Size threshold triggering chunk rotation
    pub chunk_retention_size: Option<usize>,
    /// Period between scheduled flush attempts
    pub flush_interval: Option<Duration>,
    /// Directory for persisting unflushed chunks across restarts
    pub file_backup_dir: Option<PathBuf>,
    /// Max wait on shutdown for the buffer to drain
    pub wait_until_buffer_flushed: Option<Duration>,
    /// Max wait on shutdown for the flush worker to stop
    pub wait_until_flusher_terminated: Option<Duration>,
    /// Disables on-disk backup entirely, even when a backup dir is set
    pub in_memory_only: Option<bool>,
    /// Invoked by the sender on delivery failure
    pub error_handler: Option<ErrorHandler>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("endpoint", &self.endpoint)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("chunk_initial_size", &self.chunk_initial_size)
            .field("chunk_retention_size", &self.chunk_retention_size)
            .field("flush_interval", &self.flush_interval)
            .field("file_backup_dir", &self.file_backup_dir)
            .field("wait_until_buffer_flushed", &self.wait_until_buffer_flushed)
            .field(
                "wait_until_flusher_terminated",
                &self.wait_until_flusher_terminated,
            )
            .field("in_memory_only", &self.in_memory_only)
            .field(
                "error_handler",
                &self.error_handler.as_ref().map(|_| "<handler>"),
            )
            .finish()
    }
}

/// Resolved buffer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferConfig {
    /// Upper bound on total buffered, unflushed bytes
    pub max_buffer_size: u64,
    /// Initial allocation size per chunk
    pub chunk_initial_size: usize,
    /// Size threshold triggering chunk rotation
    pub chunk_retention_size: usize,
    /// Backup directory, if on-disk backup is requested
    pub file_backup_dir: Option<PathBuf>,
    /// Whether on-disk backup is disabled regardless of directory
    pub in_memory_only: bool,
}

/// Resolved flush scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlusherConfig {
    /// Period between scheduled flush attempts
    pub flush_interval: Duration,
    /// Max wait on shutdown for the buffer to drain
    pub wait_until_buffer_flushed: Duration,
    /// Max wait on shutdown for the flush worker to stop
    pub wait_until_flusher_terminated: Duration,
}

/// Resolved record formatter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Stamp hostname and pid onto every formatted line
    pub include_process_metadata: bool,
}

/// The fully-populated set of subsystem configurations produced by [`merge`].
///
/// Created once per build call and discarded after the client handle is
/// constructed. No field is ever left unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTopology {
    /// Buffer configuration
    pub buffer: BufferConfig,
    /// Flush scheduler configuration
    pub flusher: FlusherConfig,
    /// Record formatter configuration
    pub formatter: FormatterConfig,
}

/// Resolve sparse user options into a complete topology.
///
/// `None` means "all defaults". Pure and deterministic; the input is not
/// mutated and no I/O happens here.
pub fn merge(options: Option<&ClientOptions>) -> ResolvedTopology {
    let empty = ClientOptions::default();
    let opts = options.unwrap_or(&empty);

    ResolvedTopology {
        buffer: BufferConfig {
            max_buffer_size: opts.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE),
            chunk_initial_size: opts
                .chunk_initial_size
                .unwrap_or(DEFAULT_CHUNK_INITIAL_SIZE),
            chunk_retention_size: opts
                .chunk_retention_size
                .unwrap_or(DEFAULT_CHUNK_RETENTION_SIZE),
            file_backup_dir: opts.file_backup_dir.clone(),
            in_memory_only: opts.in_memory_only.unwrap_or(false),
        },
        flusher: FlusherConfig {
            flush_interval: opts.flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL),
            wait_until_buffer_flushed: opts
                .wait_until_buffer_flushed
                .unwrap_or(DEFAULT_WAIT_UNTIL_BUFFER_FLUSHED),
            wait_until_flusher_terminated: opts
                .wait_until_flusher_terminated
                .unwrap_or(DEFAULT_WAIT_UNTIL_FLUSHER_TERMINATED),
        },
        formatter: FormatterConfig {
            include_process_metadata: true,
        },
    }
}
