//! Engine Module
//!
//! The core that coordinates the store, the command registry and the AOF.
//!
//! ## Responsibilities
//! - Replay the AOF into a fresh store before serving anything
//! - Log write commands before applying them
//! - Dispatch every request through the command registry
//! - Own the background AOF flusher

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::aof::{AofReplay, AofWriter, Flusher, ReplayResult};
use crate::command::CommandRegistry;
use crate::config::{AofSyncPolicy, Config};
use crate::error::Result;
use crate::protocol::{Request, Value};
use crate::store::Store;

/// The main engine
///
/// ## Concurrency Model
///
/// - **Write commands** (the configured allow-list): serialized by
///   `write_lock`. Each one appends to the AOF, then applies to the store,
///   while holding the lock, so AOF order is the order writes were applied.
/// - **Other commands**: go straight to the registry. The store's own locks
///   make each command atomic.
/// - **Registry**: immutable after `open`, shared without locking.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Full path of the AOF
    aof_path: PathBuf,

    /// Shared key space
    store: Store,

    /// Command name → handler
    registry: CommandRegistry,

    /// Uppercase names of commands that are logged
    write_commands: HashSet<String>,

    /// AOF appender, shared with the flusher thread
    aof: Arc<AofWriter>,

    /// Background sync thread (only under `EverySec`)
    flusher: Mutex<Option<Flusher>>,

    /// Serializes log-then-apply of write commands
    write_lock: Mutex<()>,

    /// What startup replay did
    replay: ReplayResult,
}

impl Engine {
    /// Open an engine with the built-in commands
    pub fn open(config: Config) -> Result<Self> {
        let registry = CommandRegistry::new(config.unknown_command_policy);
        Self::open_with_registry(config, registry)
    }

    /// Open an engine with a caller-supplied registry
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Replay the AOF into a fresh store (no replies, no re-append)
    /// 3. Open the AOF for appending
    /// 4. Start the flusher when the sync policy asks for one
    pub fn open_with_registry(config: Config, registry: CommandRegistry) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let aof_path = config.aof_path();

        let store = Store::new();
        let replay = AofReplay::replay(&aof_path, config.aof_tail_policy, |request| {
            let reply = registry.dispatch(&store, request.name(), request.args());
            if let Value::Error(message) = reply {
                tracing::debug!(command = request.name(), %message, "replayed command returned an error");
            }
        })?;

        if replay.entries_replayed > 0 || replay.was_truncated() {
            tracing::info!(
                entries = replay.entries_replayed,
                bytes = replay.bytes_replayed,
                truncated = replay.truncated_bytes,
                keys = store.key_count(),
                "AOF replay complete"
            );
        }

        let aof = Arc::new(AofWriter::open(&aof_path, config.aof_sync_policy)?);

        let flusher = match config.aof_sync_policy {
            AofSyncPolicy::EverySec { interval } => Some(Flusher::spawn(Arc::clone(&aof), interval)?),
            AofSyncPolicy::Always | AofSyncPolicy::No => None,
        };

        let write_commands = config
            .write_commands
            .iter()
            .map(|name| name.to_ascii_uppercase())
            .collect();

        Ok(Self {
            config,
            aof_path,
            store,
            registry,
            write_commands,
            aof,
            flusher: Mutex::new(flusher),
            write_lock: Mutex::new(()),
            replay,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a validated request and return the reply
    ///
    /// Write commands are appended to the AOF first. If the append fails the
    /// command is not applied and the client gets an error reply.
    pub fn execute(&self, request: &Request) -> Value {
        let name = request.name();

        if !self.is_logged(name) {
            return self.registry.dispatch(&self.store, name, request.args());
        }

        let _write_guard = self.write_lock.lock();

        if let Err(e) = self.aof.append(request.as_value()) {
            tracing::error!(command = name, error = %e, "AOF append failed, command not applied");
            return Value::error("ERR persistence failure");
        }

        self.registry.dispatch(&self.store, name, request.args())
    }

    /// Validate a decoded value and execute it
    pub fn execute_value(&self, value: Value) -> Result<Value> {
        let request = Request::from_value(value)?;
        Ok(self.execute(&request))
    }

    /// True when requests for `name` are appended to the AOF
    pub fn is_write_command(&self, name: &str) -> bool {
        self.write_commands.contains(&name.to_ascii_uppercase())
    }

    /// Only known commands are logged; an unknown name on the allow-list
    /// would replay to nothing.
    fn is_logged(&self, name: &str) -> bool {
        self.write_commands.contains(name) && self.registry.contains(name)
    }

    /// Force the AOF to stable storage now
    pub fn sync(&self) -> Result<()> {
        self.aof.sync()
    }

    /// Close the engine gracefully
    ///
    /// Stops the flusher and syncs the AOF. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
        self.aof.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn aof(&self) -> &AofWriter {
        &self.aof
    }

    /// Get the AOF path
    pub fn aof_path(&self) -> &Path {
        &self.aof_path
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Statistics from startup replay
    pub fn replay_result(&self) -> &ReplayResult {
        &self.replay
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
