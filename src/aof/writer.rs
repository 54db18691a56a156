//! AOF Writer
//!
//! Handles appending entries to the AOF.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::AofSyncPolicy;
use crate::error::{Result, TideError};
use crate::protocol::{encode, Value};

/// Appends encoded requests to the AOF
///
/// ## Concurrency
/// The file sits behind one mutex shared by `append` and `sync`, so entries
/// from concurrent connections never interleave and a sync never overlaps a
/// half-written entry.
pub struct AofWriter {
    path: PathBuf,
    sync_policy: AofSyncPolicy,
    inner: Mutex<Inner>,
}

struct Inner {
    file: File,

    /// File length after the last complete entry
    len: u64,

    /// Entries appended since open
    entries: u64,

    /// Bytes written since the last successful sync
    dirty: bool,
}

impl AofWriter {
    /// Open or create an AOF for appending
    pub fn open(path: &Path, sync_policy: AofSyncPolicy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        tracing::debug!(path = %path.display(), len, ?sync_policy, "AOF opened");

        Ok(Self {
            path: path.to_path_buf(),
            sync_policy,
            inner: Mutex::new(Inner {
                file,
                len,
                entries: 0,
                dirty: false,
            }),
        })
    }

    /// Append one request to the AOF
    ///
    /// The encoded request is written as a single unit. If the write fails
    /// part way, or the `Always` sync after it fails, the file is cut back
    /// to the previous entry boundary: an append that returns an error
    /// leaves nothing behind for replay to apply.
    pub fn append(&self, command: &Value) -> Result<()> {
        let bytes = encode(command);
        let sync_now = self.sync_policy == AofSyncPolicy::Always;

        let mut inner = self.inner.lock();
        let len = inner.len;
        write_entry(&mut inner.file, len, &bytes, sync_now)?;

        inner.len += bytes.len() as u64;
        inner.entries += 1;
        inner.dirty = !sync_now;

        Ok(())
    }

    /// Force appended entries to stable storage
    ///
    /// A no-op when nothing was appended since the last sync.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.dirty {
            return Ok(());
        }

        inner.file.sync_data()?;
        inner.dirty = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_policy(&self) -> AofSyncPolicy {
        self.sync_policy
    }

    /// Current file length in bytes
    pub fn len(&self) -> u64 {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries appended through this writer
    pub fn entries_appended(&self) -> u64 {
        self.inner.lock().entries
    }

    /// True when appended bytes have not been synced yet
    pub fn has_unsynced(&self) -> bool {
        self.inner.lock().dirty
    }
}

/// File operations the append path needs
pub(crate) trait LogFile: Write {
    fn set_len(&mut self, len: u64) -> io::Result<()>;
    fn sync_data(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn set_len(&mut self, len: u64) -> io::Result<()> {
        File::set_len(self, len)
    }

    fn sync_data(&mut self) -> io::Result<()> {
        File::sync_data(self)
    }
}

/// Write one entry at the end of a log currently `len` bytes long,
/// optionally syncing it. On any failure the log is cut back to `len`.
pub(crate) fn write_entry<F: LogFile>(
    file: &mut F,
    len: u64,
    bytes: &[u8],
    sync_now: bool,
) -> Result<()> {
    let outcome = file
        .write_all(bytes)
        .map_err(|e| TideError::AofWrite(e.to_string()))
        .and_then(|()| {
            if sync_now {
                file.sync_data()
                    .map_err(|e| TideError::AofWrite(format!("fsync failed: {}", e)))
            } else {
                Ok(())
            }
        });

    if outcome.is_err() {
        if let Err(rollback) = file.set_len(len) {
            tracing::error!(error = %rollback, "failed to roll back AOF entry");
        }
    }
    outcome
}
