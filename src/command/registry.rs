//! Command registry
//!
//! Fixed mapping from uppercase command name to handler. Built once before
//! any connection is accepted and never mutated afterwards, so lookups from
//! many connection threads need no locking.

use std::collections::HashMap;

use crate::config::UnknownCommandPolicy;
use crate::protocol::Value;
use crate::store::Store;
use super::{generic, hash, string, Handler};

/// Immutable name → handler table
#[derive(Clone)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
    unknown_policy: UnknownCommandPolicy,
}

impl CommandRegistry {
    /// Registry with every built-in command
    pub fn new(unknown_policy: UnknownCommandPolicy) -> Self {
        Self::empty(unknown_policy)
            .with_handler("PING", generic::ping)
            .with_handler("ECHO", generic::echo)
            .with_handler("DEL", generic::del)
            .with_handler("SET", string::set)
            .with_handler("GET", string::get)
            .with_handler("HSET", hash::hset)
            .with_handler("HGET", hash::hget)
            .with_handler("HGETALL", hash::hgetall)
            .with_handler("HDEL", hash::hdel)
    }

    /// Registry with no commands at all
    pub fn empty(unknown_policy: UnknownCommandPolicy) -> Self {
        Self {
            handlers: HashMap::new(),
            unknown_policy,
        }
    }

    /// Add or replace a handler. The name is stored uppercased.
    pub fn with_handler(mut self, name: &str, handler: Handler) -> Self {
        self.handlers.insert(name.to_ascii_uppercase(), handler);
        self
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name.to_ascii_uppercase().as_str()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Run a command against the store
    ///
    /// Unknown commands answer with an empty simple string, or with an error
    /// under [`UnknownCommandPolicy::Error`].
    pub fn dispatch(&self, store: &Store, name: &str, args: &[Value]) -> Value {
        match self.lookup(name) {
            Some(handler) => handler(store, args),
            None => {
                tracing::debug!(command = %name, "unknown command");
                match self.unknown_policy {
                    UnknownCommandPolicy::EmptyStatus => Value::simple(""),
                    UnknownCommandPolicy::Error => {
                        Value::error(format!("ERR unknown command '{}'", name))
                    }
                }
            }
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn unknown_policy(&self) -> UnknownCommandPolicy {
        self.unknown_policy
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new(UnknownCommandPolicy::default())
    }
}
