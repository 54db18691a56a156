//! Blocking RESP client
//!
//! Used by the CLI binary and by tests.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, TideError};
use crate::protocol::{write_value, Decoder, Value};

/// A connection to a TideKV (or any RESP) server
pub struct Client {
    decoder: Decoder<BufReader<TcpStream>>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        Ok(Self {
            decoder: Decoder::new(BufReader::new(stream.try_clone()?)),
            writer: BufWriter::new(stream),
        })
    }

    /// Fail reads that take longer than `timeout`
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a request and wait for its reply
    pub fn send(&mut self, request: &Value) -> Result<Value> {
        write_value(&mut self.writer, request)?;
        self.read_reply()?
            .ok_or_else(|| TideError::Network("server closed the connection".to_string()))
    }

    /// Send a command given as its parts, e.g. `["SET", "k", "v"]`
    pub fn command<I, T>(&mut self, parts: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.send(&Value::command(parts))
    }

    /// Write raw bytes without waiting for a reply
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read the next reply; `Ok(None)` once the server has closed the stream
    pub fn read_reply(&mut self) -> Result<Option<Value>> {
        self.decoder.read_value()
    }
}
