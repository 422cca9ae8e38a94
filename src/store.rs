//! Define the interface of the key-value store that client handles talk to, along with
//! the implementations of that interface.

mod glob;
mod memory;
mod redis;

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use self::{glob::glob_match, memory::MemoryStore, redis::RedisStore};
use crate::{Reply, Result};

/// Keys found by a single step of a key-space scan.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Cursor to pass to the next step, `0` once the iteration is complete.
    pub cursor: u64,
    /// Keys found in this step.
    pub keys: Vec<String>,
}

/// A Redis-compatible store. Every method is a single round trip.
///
/// Implementations must be safe to share between concurrently running tasks, and must
/// not serialize calls on behalf of their callers.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Human readable location of the store.
    fn endpoint(&self) -> String;

    /// Set the value of a key, expiring it after `ttl` if one is given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Get the value of a key, if it exists. Otherwise, return `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key and return `true`, if it exists. Otherwise, return `false`.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Run an arbitrary command.
    async fn exec(&self, command: &str, args: &[&str]) -> Result<Reply>;

    /// Run one step of a key-space scan starting at `cursor`. An empty `pattern` matches
    /// every key, a `count` of 0 lets the store pick its own hint.
    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<ScanResult>;

    /// Set a field of the hash stored at key. Returns `true` if the field is new.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    /// Get a field of the hash stored at key, if it exists. Otherwise, return `None`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Get all fields and values of the hash stored at key. A missing key yields an
    /// empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Delete fields from the hash stored at key. Returns the number of removed fields.
    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64>;
}
