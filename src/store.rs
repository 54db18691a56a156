//! Shared Store
//!
//! The key space mutated by command handlers.
//!
//! ## Concurrency
//! Two independent key spaces (strings and hashes), each behind its own
//! `RwLock`. Every method takes the lock it needs exactly once, so a single
//! command is atomic with respect to every other command. Methods touching
//! both spaces lock `strings` before `hashes`.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use parking_lot::RwLock;

/// Field map of one hash key, ordered by field name
pub type Hash = BTreeMap<Bytes, Bytes>;

/// In-memory key space shared by all connections
#[derive(Default)]
pub struct Store {
    strings: RwLock<HashMap<Bytes, Bytes>>,
    hashes: RwLock<HashMap<Bytes, Hash>>,
}

/// Point-in-time copy of the whole store, ordered for comparison
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub strings: BTreeMap<Bytes, Bytes>,
    pub hashes: BTreeMap<Bytes, Hash>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------------

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.strings.read().get(key).cloned()
    }

    pub fn set(&self, key: Bytes, value: Bytes) {
        self.strings.write().insert(key, value);
    }

    /// Remove keys from both key spaces, returning how many keys existed
    pub fn delete<'a, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a Bytes>,
    {
        let mut strings = self.strings.write();
        let mut hashes = self.hashes.write();

        keys.into_iter()
            .filter(|key| {
                let had_string = strings.remove(*key).is_some();
                let had_hash = hashes.remove(*key).is_some();
                had_string || had_hash
            })
            .count()
    }

    // -------------------------------------------------------------------------
    // Hashes
    // -------------------------------------------------------------------------

    /// Set fields on a hash, creating it if needed. Returns the number of
    /// fields that did not exist before.
    pub fn hset<I>(&self, key: Bytes, fields: I) -> usize
    where
        I: IntoIterator<Item = (Bytes, Bytes)>,
    {
        let mut hashes = self.hashes.write();
        let hash = hashes.entry(key).or_default();

        fields
            .into_iter()
            .filter(|(field, value)| hash.insert(field.clone(), value.clone()).is_none())
            .count()
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes.read().get(key).and_then(|hash| hash.get(field)).cloned()
    }

    /// All fields of a hash in field order (empty if the key is missing)
    pub fn hgetall(&self, key: &[u8]) -> Vec<(Bytes, Bytes)> {
        self.hashes
            .read()
            .get(key)
            .map(|hash| hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Remove fields from a hash, dropping the hash once it is empty.
    /// Returns the number of fields removed.
    pub fn hdel<'a, I>(&self, key: &[u8], fields: I) -> usize
    where
        I: IntoIterator<Item = &'a Bytes>,
    {
        let mut hashes = self.hashes.write();
        let Some(hash) = hashes.get_mut(key) else {
            return 0;
        };

        let removed = fields
            .into_iter()
            .filter(|field| hash.remove(*field).is_some())
            .count();

        if hash.is_empty() {
            hashes.remove(key);
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Accessors (for testing and debugging)
    // -------------------------------------------------------------------------

    /// Number of keys across both key spaces
    pub fn key_count(&self) -> usize {
        let strings = self.strings.read();
        let hashes = self.hashes.read();
        strings.len() + hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let strings = self.strings.read();
        let hashes = self.hashes.read();
        StoreSnapshot {
            strings: strings.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            hashes: hashes.iter().map(|(k, h)| (k.clone(), h.clone())).collect(),
        }
    }
}
