//! AOF Replay
//!
//! Rebuilds state at startup by feeding every logged request back through
//! the command handlers.

use std::fs::OpenOptions;
use std::path::Path;

use crate::config::AofTailPolicy;
use crate::error::{Result, TideError};
use crate::protocol::Request;
use super::AofReader;

/// Replays the AOF at startup
pub struct AofReplay;

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayResult {
    /// Number of entries applied
    pub entries_replayed: u64,

    /// Bytes covered by the applied entries
    pub bytes_replayed: u64,

    /// Bytes of an incomplete final entry that were cut off
    /// (or, for `verify`, that would be cut off)
    pub truncated_bytes: u64,
}

impl ReplayResult {
    pub fn was_truncated(&self) -> bool {
        self.truncated_bytes > 0
    }
}

/// What to do on reaching an incomplete final entry
#[derive(Clone, Copy)]
enum TailAction {
    Refuse,
    Truncate,
    Report,
}

impl AofReplay {
    /// Replay an AOF, calling `apply` once per entry in file order
    ///
    /// This will:
    /// 1. Treat a missing file as an empty log
    /// 2. Decode entries back to back until a clean end of file
    /// 3. On an incomplete final entry, fail (`Refuse`) or cut it off
    ///    the file (`Truncate`)
    /// 4. Fail on any malformed entry, whatever the tail policy
    pub fn replay<F>(path: &Path, tail_policy: AofTailPolicy, apply: F) -> Result<ReplayResult>
    where
        F: FnMut(Request),
    {
        let action = match tail_policy {
            AofTailPolicy::Refuse => TailAction::Refuse,
            AofTailPolicy::Truncate => TailAction::Truncate,
        };
        Self::scan(path, action, apply)
    }

    /// Check an AOF without applying or modifying anything
    ///
    /// An incomplete final entry is reported in `truncated_bytes` instead of
    /// failing; malformed entries still fail.
    pub fn verify(path: &Path) -> Result<ReplayResult> {
        Self::scan(path, TailAction::Report, |_| {})
    }

    fn scan<F>(path: &Path, action: TailAction, mut apply: F) -> Result<ReplayResult>
    where
        F: FnMut(Request),
    {
        let mut result = ReplayResult::default();
        if !path.exists() {
            return Ok(result);
        }

        let file_len = path.metadata()?.len();
        let mut reader = AofReader::open(path)?;

        loop {
            let offset = reader.position();

            let value = match reader.next_entry() {
                Ok(Some(value)) => value,
                Ok(None) => break,
                Err(TideError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    let tail = file_len - offset;
                    match action {
                        TailAction::Refuse => {
                            return Err(TideError::AofCorruption {
                                offset,
                                reason: format!("incomplete entry at end of file ({} bytes)", tail),
                            })
                        }
                        TailAction::Truncate => {
                            drop(reader);
                            OpenOptions::new().write(true).open(path)?.set_len(offset)?;
                            tracing::warn!(
                                path = %path.display(),
                                offset,
                                bytes = tail,
                                "truncated incomplete AOF entry"
                            );
                        }
                        TailAction::Report => {}
                    }
                    result.truncated_bytes = tail;
                    break;
                }
                Err(TideError::Io(e)) => return Err(TideError::Io(e)),
                Err(e) => {
                    return Err(TideError::AofCorruption {
                        offset,
                        reason: e.to_string(),
                    })
                }
            };

            let request = Request::from_value(value).map_err(|e| TideError::AofCorruption {
                offset,
                reason: e.to_string(),
            })?;

            apply(request);
            result.entries_replayed += 1;
            result.bytes_replayed = reader.position();
        }

        Ok(result)
    }
}
