//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_value, Decoder, Request, Value};

/// Handles a single client connection
///
/// Cycles Reading → Dispatching → Replying until the client goes away or
/// the stream breaks. Dropping the connection closes the socket.
pub struct Connection {
    /// RESP decoder over the buffered read half
    decoder: Decoder<BufReader<TcpStream>>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            decoder: Decoder::new(BufReader::new(read_stream)),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok(())` when the client disconnects, or the error that
    /// forced the connection closed.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        loop {
            // Reading
            let value = match self.decoder.read_value() {
                Ok(Some(value)) => value,
                Ok(None) => {
                    tracing::debug!(peer = %self.peer_addr, "client disconnected");
                    return Ok(());
                }
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "client disconnected mid-request");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "closing connection");
                    // Best effort: tell the client why before hanging up
                    let _ = write_value(&mut self.writer, &Value::error(format!("ERR {}", e)));
                    return Err(e);
                }
            };

            // Validate: a bad request is skipped, the session continues
            let request = match Request::from_value(value) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "ignoring request");
                    continue;
                }
            };

            tracing::trace!(peer = %self.peer_addr, command = request.name(), "received command");

            // Dispatching
            let reply = self.engine.execute(&request);

            // Replying
            if let Err(e) = write_value(&mut self.writer, &reply) {
                if e.is_disconnect() {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "client gone before reply");
                    return Ok(());
                }
                tracing::warn!(peer = %self.peer_addr, error = %e, "error writing reply");
                return Err(e);
            }
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
