//! # TideKV
//!
//! An in-memory key-value store with:
//! - RESP (REdis Serialization Protocol) wire compatibility
//! - Append-only file (AOF) of write commands for durability
//! - Startup replay of the AOF before any client is served
//! - One thread per client connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  RESP decode / encode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (write commands: log first, then apply)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │     AOF     │          │ Command Registry │
//!   │  (Append)   │          │   → Store        │
//!   └──────┬──────┘          └──────────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Flusher   │
//!   │ (fsync 1s)  │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod store;
pub mod command;
pub mod aof;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TideError, Result};
pub use config::Config;
pub use engine::Engine;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TideKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
