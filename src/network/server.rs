//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TideError};
use crate::protocol::{write_value, Value};
use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cloneable flag that asks a running server to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the server to stop accepting and drain its connections
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The underlying flag, for signal handler registration
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Sockets of live connections, kept so shutdown can unblock their reads
type LiveConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for TideKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,
    live: LiveConnections,
    workers: Vec<JoinHandle<()>>,
    next_id: u64,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            TideError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: ShutdownHandle::new(),
            live: Arc::new(Mutex::new(HashMap::new())),
            workers: Vec::new(),
            next_id: 0,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Number of connections currently being served
    pub fn connection_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Accept connections until the shutdown handle is triggered (blocking)
    ///
    /// On shutdown every live connection is closed and its worker joined
    /// before this returns.
    pub fn run(&mut self) -> Result<()> {
        // Non-blocking accept so the loop can observe the shutdown flag
        self.listener.set_nonblocking(true)?;
        tracing::info!(addr = %self.local_addr, "listening");

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.spawn_connection(stream) {
                        tracing::warn!(%peer, error = %e, "failed to start connection");
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    // Persistent failures such as EMFILE would otherwise spin
                    tracing::warn!(error = %e, "accept error");
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        self.drain();
        Ok(())
    }

    fn spawn_connection(&mut self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        // Reap finished workers so the list tracks live connections only
        self.workers.retain(|handle| !handle.is_finished());

        if self.live.lock().len() >= self.config.max_connections {
            tracing::warn!(max = self.config.max_connections, "connection limit reached");
            let mut stream = stream;
            let _ = write_value(&mut stream, &Value::error("ERR max number of clients reached"));
            return Ok(());
        }

        let id = self.next_id;
        self.next_id += 1;
        self.live.lock().insert(id, stream.try_clone()?);

        let engine = Arc::clone(&self.engine);
        let live = Arc::clone(&self.live);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                match Connection::new(stream, engine) {
                    Ok(mut connection) => {
                        if let Err(e) = connection.handle() {
                            tracing::debug!(peer = connection.peer_addr(), error = %e, "connection closed with error");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to set up connection"),
                }
                live.lock().remove(&id);
            });

        match spawned {
            Ok(handle) => {
                self.workers.push(handle);
                Ok(())
            }
            Err(e) => {
                self.live.lock().remove(&id);
                Err(e.into())
            }
        }
    }

    /// Close every live connection and wait for the workers
    fn drain(&mut self) {
        let live: Vec<TcpStream> = self.live.lock().drain().map(|(_, stream)| stream).collect();
        tracing::info!(connections = live.len(), "shutting down");

        // Reads blocked on these sockets return end-of-stream
        for stream in &live {
            let _ = stream.shutdown(Shutdown::Both);
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("connection thread panicked");
            }
        }
    }
}
