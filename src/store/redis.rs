use std::{collections::HashMap, time::Duration};

use ::redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands,
};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{ScanResult, Store};
use crate::{ClientOptions, Error, Reply, Result};

/// A store backed by a Redis server, reached through the `redis` crate.
///
/// No I/O happens when the store is created. The connection is opened by the first
/// command and then multiplexed between every caller sharing the store. Until it
/// succeeds, every command makes one attempt to open it.
///
/// Once open, a dropped connection fails the command that observed the drop and is
/// re-established in the background, later commands wait for the new connection.
pub struct RedisStore {
    options: ClientOptions,
    conn: OnceCell<ConnectionManager>,
}

impl RedisStore {
    /// Creates a store that will connect using the given options.
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            conn: OnceCell::new(),
        }
    }

    /// Options the store connects with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let info = self.options.connection_info()?;
                let client = ::redis::Client::open(info)?;
                info!(
                    address = %self.options.address,
                    database = self.options.database,
                    "connecting"
                );
                // A single attempt per connect, the caller reports the failure and the
                // next command tries again.
                let config = ConnectionManagerConfig::new().set_number_of_retries(0);
                let conn = ConnectionManager::new_with_config(client, config).await?;
                Ok::<_, Error>(conn)
            })
            .await?;
        // Clones share the same underlying connection
        Ok(conn.clone())
    }
}

/// Milliseconds for `PX`, rounded up so that a sub-millisecond TTL still expires the key
/// instead of being rejected by the server.
fn px_millis(ttl: Duration) -> u64 {
    ttl.as_nanos().div_ceil(1_000_000) as u64
}

#[async_trait]
impl Store for RedisStore {
    fn endpoint(&self) -> String {
        self.options.address.clone()
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        let mut cmd = ::redis::cmd("SET");
        cmd.arg(key).arg(value);
        match ttl {
            Some(ttl) if ttl.subsec_nanos() == 0 => {
                cmd.arg("EX").arg(ttl.as_secs());
            }
            Some(ttl) => {
                cmd.arg("PX").arg(px_millis(ttl));
            }
            None => {}
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exec(&self, command: &str, args: &[&str]) -> Result<Reply> {
        let mut conn = self.connection().await?;
        let mut cmd = ::redis::cmd(command);
        for arg in args {
            cmd.arg(*arg);
        }
        let value: ::redis::Value = cmd.query_async(&mut conn).await?;
        debug!(command, ?args, ?value, "executed");
        Ok(value.into())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<ScanResult> {
        let mut conn = self.connection().await?;
        let mut cmd = ::redis::cmd("SCAN");
        cmd.arg(cursor);
        if !pattern.is_empty() {
            cmd.arg("MATCH").arg(pattern);
        }
        if count > 0 {
            cmd.arg("COUNT").arg(count);
        }
        let (cursor, keys): (u64, Vec<String>) = cmd.query_async(&mut conn).await?;
        Ok(ScanResult { cursor, keys })
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let added: u64 = conn.hset(key, field, value).await?;
        Ok(added > 0)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.connection().await?;
        Ok(conn.hgetall(key).await?)
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        let mut conn = self.connection().await?;
        let mut cmd = ::redis::cmd("HDEL");
        cmd.arg(key);
        for field in fields {
            cmd.arg(*field);
        }
        Ok(cmd.query_async(&mut conn).await?)
    }
}
