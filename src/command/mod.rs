//! Command Module
//!
//! The command registry and the built-in handlers.
//!
//! ## Responsibilities
//! - Map uppercase command names to handlers
//! - Implement the built-in commands against the shared [`Store`]
//! - Report handler failures as `Value::Error`, never as a Rust error
//!
//! ## Built-in Commands
//! - Connection: PING, ECHO
//! - Strings: SET, GET, DEL
//! - Hashes: HSET, HGET, HGETALL, HDEL

mod registry;
mod generic;
mod string;
mod hash;

pub use registry::CommandRegistry;

use bytes::Bytes;

use crate::protocol::Value;
use crate::store::Store;

/// A command implementation: arguments (without the command name) in,
/// one reply out
pub type Handler = fn(&Store, &[Value]) -> Value;

/// `-ERR wrong number of arguments for '<cmd>' command`
pub(crate) fn wrong_arity(command: &str) -> Value {
    Value::error(format!(
        "ERR wrong number of arguments for '{}' command",
        command.to_ascii_lowercase()
    ))
}

/// Collect every argument as raw bytes
///
/// Clients send bulk strings, but simple strings and integers are accepted
/// too so hand-written frames work.
pub(crate) fn bytes_args(args: &[Value]) -> Result<Vec<Bytes>, Value> {
    args.iter()
        .map(|arg| match arg {
            Value::BulkString(data) => Ok(data.clone()),
            Value::SimpleString(text) => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Value::Integer(n) => Ok(Bytes::from(n.to_string())),
            other => Err(Value::error(format!(
                "ERR invalid argument type: {}",
                other.kind()
            ))),
        })
        .collect()
}
