//! The command façade exposed to test scripts.
//!
//! Scripts should not have to handle errors on every data-plane call, so the façade
//! reports failures through an [`ErrorReporter`] and hands back a default value instead.
//! A single failed call never aborts a load run.
//!
//! Absent keys and fields are reported exactly like failed operations. A script can not
//! tell "absent" from "connection broken" by the return value alone; the reported
//! [`Error`] tells them apart with [`Error::is_absence`]. Embedders that want absence as
//! a value should use the typed [`Client`] methods instead.

use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    report::{ErrorReporter, Report, TracingReporter},
    Client, ClientOptions, Error, Result, ScanResult,
};

/// Command façade over client handles, one method per supported command.
///
/// The façade is stateless apart from its reporter. It never owns the handles it is given
/// and adds no locking, so concurrently running iterations may share both the façade and
/// a handle.
#[derive(Clone)]
pub struct Redis {
    reporter: Arc<dyn ErrorReporter>,
}

impl Default for Redis {
    fn default() -> Self {
        Self::new(TracingReporter)
    }
}

impl std::fmt::Debug for Redis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redis").finish_non_exhaustive()
    }
}

impl Redis {
    /// Creates a façade that reports failures to the given reporter.
    pub fn new<R>(reporter: R) -> Self
    where
        R: ErrorReporter + 'static,
    {
        Self {
            reporter: Arc::new(reporter),
        }
    }

    /// Creates a handle to a Redis server, `address` defaults to `localhost:6379` when
    /// empty.
    ///
    /// This never fails and does no I/O. A bad address or an unreachable server is
    /// reported by the first command issued through the handle.
    pub fn new_client(&self, address: &str, password: &str, database: i64) -> Client {
        Client::new(ClientOptions::new(address, password, database))
    }

    /// Sets the value of a key, expiring it after `expiration` whole seconds. An
    /// expiration of 0 keeps the key until it is deleted.
    pub async fn set(&self, client: &Client, key: &str, value: &str, expiration: u64) {
        let ttl = (expiration > 0).then(|| Duration::from_secs(expiration));
        let result = client.set(key, value, ttl).await;
        self.check(result, "failed to set the specified key/value pair");
    }

    /// Gets the value of a key, or an empty string if the key is absent or the command
    /// failed.
    pub async fn get(&self, client: &Client, key: &str) -> String {
        let result = client
            .get(key)
            .await
            .and_then(|v| v.ok_or(Error::KeyNotFound));
        self.check(result, "failed to get the specified key")
            .unwrap_or_default()
    }

    /// Removes a key. Removing an absent key is not a failure.
    pub async fn del(&self, client: &Client, key: &str) {
        let result = client.del(key).await;
        self.check(result, "failed to remove the specified key");
    }

    /// Runs an arbitrary command against a key and returns its reply as a string.
    ///
    /// A nil reply is reported as an absent key, a reply that is not a string is
    /// reported as [`Error::UnexpectedType`]. Either way an empty string is returned.
    pub async fn exec(&self, client: &Client, command: &str, key: &str) -> String {
        match client.exec(command, &[key]).await {
            Ok(reply) => {
                let result = reply.into_string();
                let context = match result {
                    Err(Error::KeyNotFound) => "key does not exist",
                    _ => "failed to do command",
                };
                self.check(result, context).unwrap_or_default()
            }
            Err(err) => {
                self.reporter.report(Report::new("failed to do command", err));
                String::new()
            }
        }
    }

    /// Runs one step of a key-space scan. The caller loops, passing back the returned
    /// cursor, until it is `0`.
    ///
    /// `count` is a hint of how many keys to examine, the store may return more or less.
    /// A failed step returns a result with a `0` cursor and no keys.
    pub async fn scan(
        &self,
        client: &Client,
        cursor: u64,
        pattern: &str,
        count: u64,
    ) -> ScanResult {
        let result = client.scan(cursor, pattern, count).await;
        self.check(result, "failed to scan keys").unwrap_or_default()
    }

    /// Sets a field of the hash stored at key.
    pub async fn hset(&self, client: &Client, key: &str, field: &str, value: &str) {
        let result = client.hset(key, field, value).await;
        self.check(result, "failed to save field:value for specified key");
    }

    /// Gets a field of the hash stored at key, or an empty string if the field is absent
    /// or the command failed.
    pub async fn hget(&self, client: &Client, key: &str, field: &str) -> String {
        let result = client
            .hget(key, field)
            .await
            .and_then(|v| v.ok_or(Error::FieldNotFound));
        self.check(result, "failed to get field for specified key")
            .unwrap_or_default()
    }

    /// Gets all fields and values of the hash stored at key. An absent key yields an
    /// empty map and is not a failure.
    pub async fn hgetall(&self, client: &Client, key: &str) -> HashMap<String, String> {
        let result = client.hgetall(key).await;
        self.check(result, "failed to get fields, values for specified key")
            .unwrap_or_default()
    }

    /// Deletes one or more fields from the hash stored at key.
    pub async fn hdel(&self, client: &Client, key: &str, fields: &[&str]) {
        let result = client.hdel(key, fields).await;
        self.check(result, "failed to delete specified fields from key");
    }

    /// Hands the error, if any, to the reporter and turns the result into an `Option`.
    fn check<T>(&self, result: Result<T>, context: &'static str) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(err) => {
                self.reporter.report(Report::new(context, err));
                None
            }
        }
    }
}
