//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop that only spawns workers
//! - One thread per connection
//! - Commands routed through Engine
//! - Shutdown flag drains live connections before returning

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
