//! Protocol codec
//!
//! Encoding and decoding functions for the RESP wire format.
//!
//! ## Wire Format
//!
//! ```text
//! +OK\r\n                              simple string
//! -ERR message\r\n                     error
//! :1000\r\n                            integer
//! $3\r\nbar\r\n                        bulk string
//! $-1\r\n                              null bulk string
//! *2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n     array
//! ```
//!
//! Every value starts with a one-byte type marker. Lines end with CRLF.
//! Bulk strings and arrays carry a decimal length prefix, which makes a
//! stream of values self-delimiting with no separator between them.

use std::io::{BufRead, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, TideError};
use super::Value;

pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

pub const CRLF: &[u8] = b"\r\n";

/// Encoding of the null bulk string
pub const NULL_BULK: &[u8] = b"$-1\r\n";

/// Longest accepted line, excluding CRLF (64 KiB)
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Largest accepted bulk string payload (512 MiB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest accepted array element count
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Deepest accepted array nesting
pub const MAX_DEPTH: usize = 64;

/// Initial buffer for a bulk payload; larger payloads grow as bytes arrive
const BULK_READ_CHUNK: usize = 64 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
pub fn encode(value: &Value) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(value));
    encode_into(value, &mut buf);
    buf.freeze()
}

/// Append the encoding of a value to `buf`
///
/// Simple strings and errors are written verbatim; text containing CR or LF
/// produces a frame that will not decode back to the same value.
pub fn encode_into(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::SimpleString(text) => {
            buf.put_u8(SIMPLE_STRING);
            buf.put_slice(text.as_bytes());
            buf.put_slice(CRLF);
        }
        Value::Error(text) => {
            buf.put_u8(ERROR);
            buf.put_slice(text.as_bytes());
            buf.put_slice(CRLF);
        }
        Value::Integer(n) => {
            buf.put_u8(INTEGER);
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(CRLF);
        }
        Value::BulkString(data) => {
            buf.put_u8(BULK_STRING);
            buf.put_slice(data.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(data);
            buf.put_slice(CRLF);
        }
        Value::Null => buf.put_slice(NULL_BULK),
        Value::Array(items) => {
            buf.put_u8(ARRAY);
            buf.put_slice(items.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            for item in items {
                encode_into(item, buf);
            }
        }
    }
}

/// Exact number of bytes `encode` produces for `value`
pub fn encoded_len(value: &Value) -> usize {
    fn digits(n: usize) -> usize {
        n.to_string().len()
    }

    match value {
        Value::SimpleString(text) | Value::Error(text) => 1 + text.len() + 2,
        Value::Integer(n) => 1 + n.to_string().len() + 2,
        Value::BulkString(data) => 1 + digits(data.len()) + 2 + data.len() + 2,
        Value::Null => NULL_BULK.len(),
        Value::Array(items) => {
            1 + digits(items.len()) + 2 + items.iter().map(encoded_len).sum::<usize>()
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Incremental RESP decoder over a buffered byte stream
///
/// Consecutive calls to [`Decoder::read_value`] continue exactly where the
/// previous call stopped, so one decoder serves a whole connection or a whole
/// AOF file. After an error the stream position is unspecified and the
/// decoder must not be used again.
pub struct Decoder<R> {
    reader: R,

    /// Bytes consumed since construction
    position: u64,
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, position: 0 }
    }

    /// Bytes consumed from the underlying reader so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next complete value
    ///
    /// Returns `Ok(None)` when the stream ends cleanly between values.
    /// End of stream inside a value is an `UnexpectedEof` I/O error;
    /// malformed bytes are a `Protocol` error.
    pub fn read_value(&mut self) -> Result<Option<Value>> {
        match self.read_marker()? {
            Some(marker) => self.read_typed(marker, 0).map(Some),
            None => Ok(None),
        }
    }

    fn read_marker(&mut self) -> Result<Option<u8>> {
        let mut marker = [0u8; 1];
        match self.reader.read_exact(&mut marker) {
            Ok(()) => {
                self.position += 1;
                Ok(Some(marker[0]))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_typed(&mut self, marker: u8, depth: usize) -> Result<Value> {
        match marker {
            SIMPLE_STRING => Ok(Value::SimpleString(self.read_text()?)),
            ERROR => Ok(Value::Error(self.read_text()?)),
            INTEGER => Ok(Value::Integer(self.read_integer()?)),
            BULK_STRING => self.read_bulk(),
            ARRAY => self.read_array(depth),
            other => Err(TideError::Protocol(format!(
                "unknown type marker 0x{:02x}",
                other
            ))),
        }
    }

    /// Read one CRLF-terminated line, without the CRLF
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let limit = (MAX_LINE_LEN + CRLF.len()) as u64;
        let mut line = Vec::new();
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut line)?;
        self.position += read as u64;

        if !line.ends_with(CRLF) {
            if read as u64 == limit {
                return Err(TideError::Protocol(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_LEN
                )));
            }
            if line.last() != Some(&b'\n') {
                return Err(unexpected_eof("line"));
            }
            return Err(TideError::Protocol(
                "line not terminated by CRLF".to_string(),
            ));
        }

        line.truncate(line.len() - CRLF.len());
        Ok(line)
    }

    fn read_text(&mut self) -> Result<String> {
        let line = self.read_line()?;
        String::from_utf8(line)
            .map_err(|_| TideError::Protocol("status line is not valid UTF-8".to_string()))
    }

    fn read_integer(&mut self) -> Result<i64> {
        let line = self.read_line()?;
        std::str::from_utf8(&line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                TideError::Protocol(format!(
                    "invalid integer '{}'",
                    String::from_utf8_lossy(&line)
                ))
            })
    }

    fn read_bulk(&mut self) -> Result<Value> {
        let len = self.read_integer()?;
        if len < 0 {
            return Ok(Value::Null);
        }
        if len > MAX_BULK_LEN {
            return Err(TideError::Protocol(format!(
                "bulk string too large: {} bytes (max {})",
                len, MAX_BULK_LEN
            )));
        }

        // Grow with the bytes actually received, not the claimed length
        let len = len as usize;
        let mut payload = Vec::with_capacity(len.min(BULK_READ_CHUNK));
        (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut payload)?;
        self.position += payload.len() as u64;
        if payload.len() < len {
            return Err(unexpected_eof("bulk string"));
        }

        let mut terminator = [0u8; 2];
        self.reader
            .read_exact(&mut terminator)
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => unexpected_eof("bulk string"),
                _ => TideError::Io(e),
            })?;
        self.position += terminator.len() as u64;

        if &terminator[..] != CRLF {
            return Err(TideError::Protocol(
                "bulk string not terminated by CRLF".to_string(),
            ));
        }

        Ok(Value::BulkString(Bytes::from(payload)))
    }

    fn read_array(&mut self, depth: usize) -> Result<Value> {
        if depth >= MAX_DEPTH {
            return Err(TideError::Protocol(format!(
                "arrays nested deeper than {}",
                MAX_DEPTH
            )));
        }

        let len = self.read_integer()?;
        if len < 0 {
            return Err(TideError::Protocol(format!("negative array length {}", len)));
        }
        if len > MAX_ARRAY_LEN {
            return Err(TideError::Protocol(format!(
                "array too large: {} elements (max {})",
                len, MAX_ARRAY_LEN
            )));
        }

        let mut items = Vec::with_capacity((len as usize).min(1024));
        for _ in 0..len {
            let marker = self
                .read_marker()?
                .ok_or_else(|| unexpected_eof("array element"))?;
            items.push(self.read_typed(marker, depth + 1)?);
        }

        Ok(Value::Array(items))
    }
}

fn unexpected_eof(what: &str) -> TideError {
    TideError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        format!("stream ended inside {}", what),
    ))
}

/// Decode exactly one value from the front of a byte slice
pub fn decode(bytes: &[u8]) -> Result<Value> {
    Decoder::new(bytes)
        .read_value()?
        .ok_or_else(|| unexpected_eof("empty input"))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete value from a decoder
///
/// Blocks until a complete value is received, the stream ends, or an error
/// occurs
pub fn read_value<R: BufRead>(decoder: &mut Decoder<R>) -> Result<Option<Value>> {
    decoder.read_value()
}

/// Write a value to a stream and flush it
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    writer.write_all(&encode(value))?;
    writer.flush()?;
    Ok(())
}
