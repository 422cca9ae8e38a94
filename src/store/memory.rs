use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::{glob_match, ScanResult, Store};
use crate::{Error, Reply, Result};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

/// Number of keys examined by a scan step when the caller gives no hint
const DEFAULT_SCAN_COUNT: usize = 10;

/// An in-process store that follows Redis semantics for the supported commands.
///
/// Used for dry runs of scripts and as the backing store of test servers. Keys are kept
/// sorted and the scan cursor is the position of the next key to examine, so keys added
/// while a scan is in progress may be missed.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Keyspace>>,
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Default)]
struct Keyspace {
    entries: BTreeMap<String, Entry>,
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

enum Value {
    String(String),
    Hash(HashMap<String, String>),
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |t| t <= now)
    }
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Hash(_) => "hash",
        }
    }
}

impl Keyspace {
    /// Get the entry of a key, dropping it first if it has expired.
    fn entry(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key)?.is_expired(now) {
            self.entries.remove(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn hash(&mut self, key: &str) -> Result<Option<&mut HashMap<String, String>>> {
        match self.entry(key) {
            Some(Entry {
                value: Value::Hash(h),
                ..
            }) => Ok(Some(h)),
            Some(_) => Err(Error::CommandFailed(WRONGTYPE.to_string())),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &str, ttl: Option<Duration>) {
        let entry = Entry {
            value: Value::String(value.to_string()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
    }

    fn get(&mut self, key: &str) -> Result<Option<String>> {
        match self.entry(key) {
            Some(Entry {
                value: Value::String(s),
                ..
            }) => Ok(Some(s.clone())),
            Some(_) => Err(Error::CommandFailed(WRONGTYPE.to_string())),
            None => Ok(None),
        }
    }

    fn del(&mut self, key: &str) -> bool {
        self.entry(key).is_some() && self.entries.remove(key).is_some()
    }

    fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<bool> {
        // drops an expired key and rejects strings before creating the hash
        self.hash(key)?;
        let entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(h) => Ok(h.insert(field.to_string(), value.to_string()).is_none()),
            Value::String(_) => Err(Error::CommandFailed(WRONGTYPE.to_string())),
        }
    }

    fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self.hash(key)?.and_then(|h| h.get(field).cloned()))
    }

    fn hgetall(&mut self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hash(key)?.map(|h| h.clone()).unwrap_or_default())
    }

    fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<u64> {
        let (removed, now_empty) = match self.hash(key)? {
            Some(h) => {
                let removed = fields.iter().filter(|f| h.remove(**f).is_some()).count();
                (removed as u64, h.is_empty())
            }
            None => return Ok(0),
        };
        // Redis removes a hash once its last field is gone
        if now_empty {
            self.entries.remove(key);
        }
        Ok(removed)
    }

    fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> ScanResult {
        let now = Instant::now();
        self.entries.retain(|_, e| !e.is_expired(now));

        let start = cursor as usize;
        let count = match count {
            0 => DEFAULT_SCAN_COUNT,
            n => n as usize,
        };
        let keys = self
            .entries
            .keys()
            .skip(start)
            .take(count)
            .filter(|k| pattern.is_empty() || glob_match(pattern, k))
            .cloned()
            .collect();

        let next = start.saturating_add(count);
        let cursor = if next >= self.entries.len() {
            0
        } else {
            next as u64
        };
        ScanResult { cursor, keys }
    }

    fn ttl(&mut self, key: &str) -> i64 {
        match self.entry(key) {
            Some(Entry {
                expires_at: Some(t),
                ..
            }) => t.saturating_duration_since(Instant::now()).as_secs() as i64,
            Some(_) => -1,
            None => -2,
        }
    }

    /// Dispatch a command by name, replying the way Redis would.
    fn exec(&mut self, command: &str, args: &[&str]) -> Result<Reply> {
        let name = command.to_ascii_lowercase();
        let arity_error = || {
            Error::CommandFailed(format!(
                "ERR wrong number of arguments for '{}' command",
                name
            ))
        };

        let reply = match (name.as_str(), args) {
            ("ping", []) => Reply::Status("PONG".to_string()),
            ("ping", [msg]) | ("echo", [msg]) => Reply::from(*msg),
            ("get", [key]) => self.get(key)?.into(),
            ("set", [key, value]) => {
                self.set(key, value, None);
                Reply::Status("OK".to_string())
            }
            ("set", [key, value, opt, n])
                if opt.eq_ignore_ascii_case("ex") || opt.eq_ignore_ascii_case("px") =>
            {
                let n = parse_integer(n)?;
                if n <= 0 {
                    return Err(Error::CommandFailed(
                        "ERR invalid expire time in 'set' command".to_string(),
                    ));
                }
                let ttl = if opt.eq_ignore_ascii_case("ex") {
                    Duration::from_secs(n as u64)
                } else {
                    Duration::from_millis(n as u64)
                };
                self.set(key, value, Some(ttl));
                Reply::Status("OK".to_string())
            }
            ("set", [_, _, ..]) => {
                return Err(Error::CommandFailed("ERR syntax error".to_string()));
            }
            ("del", keys) if !keys.is_empty() => {
                Reply::Integer(keys.iter().filter(|k| self.del(k)).count() as i64)
            }
            ("exists", keys) if !keys.is_empty() => {
                Reply::Integer(keys.iter().filter(|k| self.entry(k).is_some()).count() as i64)
            }
            ("type", [key]) => Reply::Status(
                self.entry(key)
                    .map_or("none", |e| e.value.type_name())
                    .to_string(),
            ),
            ("ttl", [key]) => Reply::Integer(self.ttl(key)),
            ("hset", [key, pairs @ ..]) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                let mut added = 0;
                for pair in pairs.chunks(2) {
                    if self.hset(key, pair[0], pair[1])? {
                        added += 1;
                    }
                }
                Reply::Integer(added)
            }
            ("hget", [key, field]) => self.hget(key, field)?.into(),
            ("hgetall", [key]) => {
                let mut pairs: Vec<_> = self.hgetall(key)?.into_iter().collect();
                pairs.sort();
                Reply::Mapping(
                    pairs
                        .into_iter()
                        .map(|(f, v)| (Reply::from(f), Reply::from(v)))
                        .collect(),
                )
            }
            ("hdel", [key, fields @ ..]) if !fields.is_empty() => {
                Reply::Integer(self.hdel(key, fields)? as i64)
            }
            ("hlen", [key]) => Reply::Integer(self.hash(key)?.map_or(0, |h| h.len()) as i64),
            ("scan", [cursor, opts @ ..]) => {
                let cursor = cursor
                    .parse::<u64>()
                    .map_err(|_| Error::CommandFailed("ERR invalid cursor".to_string()))?;
                let (pattern, count) = parse_scan_options(opts)?;
                let result = self.scan(cursor, pattern, count);
                Reply::Sequence(vec![
                    Reply::from(result.cursor.to_string()),
                    Reply::Sequence(result.keys.into_iter().map(Reply::from).collect()),
                ])
            }
            // There is a single keyspace and no authentication, connection setup
            // commands are acknowledged and otherwise ignored.
            ("select", [db]) => {
                parse_integer(db)?;
                Reply::Status("OK".to_string())
            }
            ("auth", [_]) | ("auth", [_, _]) | ("client", [_, ..]) => {
                Reply::Status("OK".to_string())
            }
            (
                "ping" | "echo" | "get" | "set" | "del" | "exists" | "type" | "ttl" | "hset"
                | "hget" | "hgetall" | "hdel" | "hlen" | "scan" | "select" | "auth" | "client",
                _,
            ) => return Err(arity_error()),
            _ => {
                return Err(Error::CommandFailed(format!(
                    "ERR unknown command '{}'",
                    command
                )))
            }
        };
        Ok(reply)
    }
}

fn parse_integer(s: &str) -> Result<i64> {
    s.parse().map_err(|_| {
        Error::CommandFailed("ERR value is not an integer or out of range".to_string())
    })
}

fn parse_scan_options<'a>(mut opts: &[&'a str]) -> Result<(&'a str, u64)> {
    let mut pattern = "";
    let mut count = 0;
    while let [opt, value, rest @ ..] = opts {
        if opt.eq_ignore_ascii_case("match") {
            pattern = *value;
        } else if opt.eq_ignore_ascii_case("count") {
            count = parse_integer(value)?;
            if count < 1 {
                return Err(Error::CommandFailed("ERR syntax error".to_string()));
            }
        } else {
            return Err(Error::CommandFailed("ERR syntax error".to_string()));
        }
        opts = rest;
    }
    if !opts.is_empty() {
        return Err(Error::CommandFailed("ERR syntax error".to_string()));
    }
    Ok((pattern, count as u64))
}

#[async_trait]
impl Store for MemoryStore {
    fn endpoint(&self) -> String {
        "memory".to_string()
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        self.inner.lock().set(key, value, ttl);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.lock().get(key)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        Ok(self.inner.lock().del(key))
    }

    async fn exec(&self, command: &str, args: &[&str]) -> Result<Reply> {
        let reply = self.inner.lock().exec(command, args);
        debug!(command, ?args, ?reply, "executed");
        reply
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: u64) -> Result<ScanResult> {
        Ok(self.inner.lock().scan(cursor, pattern, count))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.inner.lock().hset(key, field, value)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.lock().hget(key, field)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.lock().hgetall(key)
    }

    async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        self.inner.lock().hdel(key, fields)
    }
}
