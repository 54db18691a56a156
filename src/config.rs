//! Configuration for TideKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TideError;

/// Commands appended to the AOF unless the caller overrides the list
pub const DEFAULT_WRITE_COMMANDS: &[&str] = &["SET", "DEL", "HSET", "HDEL"];

/// Main configuration for a TideKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── appendonly.aof   (append-only command log)
    pub data_dir: PathBuf,

    /// File name of the AOF inside `data_dir`
    pub aof_filename: String,

    // -------------------------------------------------------------------------
    // AOF Configuration
    // -------------------------------------------------------------------------
    /// When appended commands are forced to stable storage
    pub aof_sync_policy: AofSyncPolicy,

    /// What startup replay does with an incomplete final entry
    pub aof_tail_policy: AofTailPolicy,

    /// Commands (uppercase) whose requests are appended to the AOF
    pub write_commands: Vec<String>,

    // -------------------------------------------------------------------------
    // Dispatch Configuration
    // -------------------------------------------------------------------------
    /// Reply shape for commands missing from the registry
    pub unknown_command_policy: UnknownCommandPolicy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,
}

/// AOF sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofSyncPolicy {
    /// fsync inside every append (safest, slowest)
    Always,

    /// fsync from a background thread on a fixed period.
    /// At most one interval of writes is lost on a crash.
    EverySec { interval: Duration },

    /// Never fsync explicitly; the OS decides
    No,
}

impl AofSyncPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn every_sec() -> Self {
        AofSyncPolicy::EverySec {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl FromStr for AofSyncPolicy {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(AofSyncPolicy::Always),
            "everysec" => Ok(AofSyncPolicy::every_sec()),
            "no" => Ok(AofSyncPolicy::No),
            other => Err(TideError::Config(format!(
                "unknown appendfsync policy '{}' (expected always, everysec or no)",
                other
            ))),
        }
    }
}

/// Startup behavior when the AOF ends in the middle of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AofTailPolicy {
    /// Refuse to start
    #[default]
    Refuse,

    /// Cut the incomplete entry off the file and continue
    Truncate,
}

impl FromStr for AofTailPolicy {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "refuse" => Ok(AofTailPolicy::Refuse),
            "truncate" => Ok(AofTailPolicy::Truncate),
            other => Err(TideError::Config(format!(
                "unknown aof tail policy '{}' (expected refuse or truncate)",
                other
            ))),
        }
    }
}

/// Reply sent for a command the registry does not know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCommandPolicy {
    /// Empty simple string (`+\r\n`). Kept for compatibility with existing clients.
    #[default]
    EmptyStatus,

    /// `-ERR unknown command '<name>'`
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tidekv_data"),
            aof_filename: "appendonly.aof".to_string(),
            aof_sync_policy: AofSyncPolicy::every_sec(),
            aof_tail_policy: AofTailPolicy::Refuse,
            write_commands: DEFAULT_WRITE_COMMANDS.iter().map(|c| c.to_string()).collect(),
            unknown_command_policy: UnknownCommandPolicy::EmptyStatus,
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the AOF
    pub fn aof_path(&self) -> PathBuf {
        self.data_dir.join(&self.aof_filename)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the AOF file name
    pub fn aof_filename(mut self, name: impl Into<String>) -> Self {
        self.config.aof_filename = name.into();
        self
    }

    /// Set the AOF sync policy
    pub fn aof_sync_policy(mut self, policy: AofSyncPolicy) -> Self {
        self.config.aof_sync_policy = policy;
        self
    }

    /// Set the AOF tail policy
    pub fn aof_tail_policy(mut self, policy: AofTailPolicy) -> Self {
        self.config.aof_tail_policy = policy;
        self
    }

    /// Replace the list of logged write commands
    pub fn write_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.write_commands = commands
            .into_iter()
            .map(|c| c.into().to_ascii_uppercase())
            .collect();
        self
    }

    /// Set the unknown-command reply policy
    pub fn unknown_command_policy(mut self, policy: UnknownCommandPolicy) -> Self {
        self.config.unknown_command_policy = policy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
