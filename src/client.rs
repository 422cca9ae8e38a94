use std::{collections::HashMap, sync::Arc, time::Duration};

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::Deserialize;
use tracing::debug;

use crate::{
    store::{RedisStore, ScanResult, Store},
    Error, Reply, Result, DEFAULT_ADDRESS,
};

/// Where and how a client handle connects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// The `host:port` address of the server.
    pub address: String,

    /// Password sent with `AUTH`, empty when the server requires none.
    pub password: String,

    /// Index of the logical database selected after connecting.
    pub database: i64,
}

impl ClientOptions {
    /// Creates a new set of options, an empty address stands for [`DEFAULT_ADDRESS`].
    ///
    /// [`DEFAULT_ADDRESS`]: crate::DEFAULT_ADDRESS
    pub fn new(address: &str, password: &str, database: i64) -> Self {
        let address = if address.is_empty() {
            DEFAULT_ADDRESS
        } else {
            address
        };
        Self {
            address: address.to_string(),
            password: password.to_string(),
            database,
        }
    }

    /// Get the connection parameters understood by the `redis` crate.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        let invalid = || Error::InvalidAddress(self.address.clone());
        let (host, port) = self.address.rsplit_once(':').ok_or_else(invalid)?;
        let port: u16 = port.parse().map_err(|_| invalid())?;
        // IPv6 hosts are written inside brackets
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }

        let password = (!self.password.is_empty()).then(|| self.password.clone());
        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db: self.database,
                password,
                ..Default::default()
            },
        })
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, "", 0)
    }
}

/// Handle to a store that test iterations issue commands through.
///
/// Cloning a `Client` is cheap, clones share the store and its connection. Every method
/// is a single round trip to the store, there is no batching and no retry.
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn Store>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.store.endpoint())
            .finish()
    }
}

impl Client {
    /// Creates a handle to a Redis server. No connection is made until the first command.
    pub fn new(options: ClientOptions) -> Self {
        Self::with_store(RedisStore::new(options))
    }

    /// Creates a handle to the given store.
    pub fn with_store<S>(store: S) -> Self
    where
        S: Store,
    {
        Self {
            store: Arc::new(store),
        }
    }

    /// Human readable location of the store behind this handle.
    pub fn endpoint(&self) -> String {
        self.store.endpoint()
    }

    /// Set the value of the key, expiring it after `ttl` if one is given.
    #[tracing::instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.store.set(key, value, ttl).await
    }

    /// Get the value of the key.
    ///
    /// Returns `None` if the key does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.store.get(key).await?;
        debug!(found = value.is_some());
        Ok(value)
    }

    /// Removes the key, ignoring non-existent keys.
    ///
    /// Returns `true` if the key was removed.
    #[tracing::instrument(skip(self))]
    pub async fn del(&self, key: &str) -> Result<bool> {
        self.store.del(key).await
    }

    /// Runs an arbitrary command and returns its reply as is.
    #[tracing::instrument(skip(self))]
    pub async fn exec(&self, command: &str, args: &[&str]) -> Result<Reply> {
        let reply = self.store.exec(command, args).await?;
        debug!(reply = reply.kind());
        Ok(reply)
    }

    /// Runs one step of a key-space scan.
    ///
    /// Callers keep passing the returned cursor back until it is `0`.
    #[tracing::instrument(skip(self))]
    pub async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<ScanResult> {
        let result = self.store.scan(cursor, pattern, count).await?;
        debug!(next = result.cursor, found = result.keys.len());
        Ok(result)
    }

    /// Sets a field of the hash stored at key. Returns `true` if the field is new.
    #[tracing::instrument(skip(self, value))]
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.store.hset(key, field, value).await
    }

    /// Gets a field of the hash stored at key.
    ///
    /// Returns `None` if the key or the field does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.store.hget(key, field).await
    }

    /// Gets every field and value of the hash stored at key, a missing key yields an
    /// empty map.
    #[tracing::instrument(skip(self))]
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.store.hgetall(key).await
    }

    /// Deletes fields from the hash stored at key.
    ///
    /// Returns the number of fields that were removed.
    #[tracing::instrument(skip(self))]
    pub async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        if fields.is_empty() {
            return Err(Error::InvalidArgument(
                "must specify at least 1 field".to_string(),
            ));
        }
        self.store.hdel(key, fields).await
    }
}
