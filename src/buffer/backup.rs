//! On-disk persistence of unflushed chunks.
//!
//! Each backed-up chunk is one file in the backup directory: the first line
//! holds the tag, the rest is the raw payload. Files are consumed (deleted)
//! as they are reloaded, so a chunk is restored at most once.

use crate::buffer::Chunk;
use crate::{LogShipError, Result};
use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

const BACKUP_EXTENSION: &str = "buf";

pub(crate) struct FileBackup {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FileBackup {
    /// Open (creating if needed) the backup directory
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            LogShipError::ComponentConstruction(format!(
                "failed to create backup directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            seq: AtomicU64::new(0),
        })
    }

    /// Persist one chunk as a new backup file
    pub fn save(&self, chunk: &Chunk) -> Result<()> {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let path = self
            .dir
            .join(format!("{:020}-{:04}.{}", nanos, seq, BACKUP_EXTENSION));

        let mut contents = Vec::with_capacity(chunk.tag.len() + 1 + chunk.len());
        contents.extend_from_slice(chunk.tag.as_bytes());
        contents.push(b'\n');
        contents.extend_from_slice(&chunk.payload);

        fs::write(&path, contents)?;
        Ok(())
    }

    /// Load and remove every backup file, oldest first.
    ///
    /// Unreadable or malformed files are skipped with a warning rather than
    /// failing the whole restore.
    pub fn load_all(&self) -> Result<Vec<Chunk>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(BACKUP_EXTENSION))
            .collect();
        paths.sort();

        let mut chunks = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_chunk(&path) {
                Some(chunk) => {
                    chunks.push(chunk);
                    let _ = fs::remove_file(&path);
                }
                None => {
                    warn!(path = %path.display(), "skipping malformed backup file");
                }
            }
        }
        Ok(chunks)
    }

    fn read_chunk(path: &Path) -> Option<Chunk> {
        let contents = fs::read(path).ok()?;
        let split = contents.iter().position(|b| *b == b'\n')?;
        let tag = String::from_utf8(contents[..split].to_vec()).ok()?;
        if tag.is_empty() || contents.len() <= split + 1 {
            return None;
        }
        Some(Chunk {
            tag,
            payload: Bytes::copy_from_slice(&contents[split + 1..]),
        })
    }
}
