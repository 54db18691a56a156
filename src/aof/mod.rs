//! Append-Only File (AOF) Module
//!
//! Provides durability by logging every write command before it is applied.
//!
//! ## Responsibilities
//! - Append encoded write requests, one complete entry per write
//! - Periodically force the file to stable storage (background flusher)
//! - Replay the file at startup, before any client is accepted
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ *3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n │  entry 1
//! ├─────────────────────────────────────────┤
//! │ *4\r\n$4\r\nHSET\r\n ...                 │  entry 2
//! └─────────────────────────────────────────┘
//! ```
//! Entries are RESP arrays written back to back. There is no header, footer,
//! checksum or separator: the RESP length prefixes delimit every entry.
//!
//! ## Durability
//! With the default `everysec` policy at most one sync interval of appended
//! commands can be lost if the process dies abruptly.

mod writer;
mod reader;
mod replay;
mod flusher;

pub use writer::AofWriter;
pub use reader::{AofIterator, AofReader};
pub use replay::{AofReplay, ReplayResult};
pub use flusher::Flusher;
