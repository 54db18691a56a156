//! AOF Reader
//!
//! Handles reading entries from the AOF.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;
use crate::protocol::{Decoder, Value};

/// Reads entries from the AOF, front to back
pub struct AofReader {
    decoder: Decoder<BufReader<File>>,
}

impl AofReader {
    /// Open an AOF for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            decoder: Decoder::new(BufReader::new(file)),
        })
    }

    /// Read the next entry
    ///
    /// `Ok(None)` at a clean end of file.
    pub fn next_entry(&mut self) -> Result<Option<Value>> {
        self.decoder.read_value()
    }

    /// Byte offset of the next entry
    pub fn position(&self) -> u64 {
        self.decoder.position()
    }

    /// Iterate over all entries
    pub fn entries(self) -> AofIterator {
        AofIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over AOF entries. Stops after the first error.
pub struct AofIterator {
    reader: AofReader,
    done: bool,
}

impl Iterator for AofIterator {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
