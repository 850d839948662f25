//! The external key-value store the cache writes through to.
//!
//! Grounded on `services/data-aggregator/src/storage/mod.rs`'s
//! `RedisStorage`/`StorageBackend` split: a narrow trait over the handful of
//! hash/set/string operations the cache actually needs, with a real `redis`
//! backend and an in-memory fake for tests.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::collections::HashSet;

/// The hash/set/string subset of a KV store the cache needs.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// `HSET key field value`
    async fn hset(&self, key: &str, field: &str, value: String) -> Result<()>;
    /// `HGET key field`
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;
    /// `HGETALL key`
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;
    /// `DEL key`
    async fn delete(&self, key: &str) -> Result<()>;
    /// `SADD key member [member ...]`, no-op if `members` is empty
    async fn sadd(&self, key: &str, members: Vec<String>) -> Result<()>;
    /// `SMEMBERS key`
    async fn smembers(&self, key: &str) -> Result<HashSet<String>>;
    /// `SET key value`
    async fn set(&self, key: &str, value: String) -> Result<()>;
    /// `GET key`
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// A `redis`-backed [`KvStore`], using an async connection manager so
/// reconnects are handled transparently (mirrors `RedisStorage::new`).
pub struct RedisKv {
    conn: redis::aio::ConnectionManager,
}

impl RedisKv {
    /// Connect to `url`, e.g. `redis://127.0.0.1/`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn hset(&self, key: &str, field: &str, value: String) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let (): () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let (): () = conn.del(key).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, members: Vec<String>) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let (): () = conn.sadd(key, members).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let members: HashSet<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let (): () = conn.set(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }
}

/// An in-memory [`KvStore`] fake, standing in for a Redis server in tests
/// (grounded on `services/oms/tests/common/mod.rs`'s fixture-builder idiom
/// of faking the durable layer rather than spinning up the real thing).
#[derive(Debug, Default)]
pub struct InMemoryKv {
    hashes: DashMap<String, DashMap<String, String>>,
    sets: DashMap<String, HashSet<String>>,
    strings: DashMap<String, String>,
}

impl InMemoryKv {
    /// An empty fake store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn hset(&self, key: &str, field: &str, value: String) -> Result<()> {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .get(key)
            .and_then(|h| h.get(field).map(|v| v.clone())))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self
            .hashes
            .get(key)
            .map(|h| h.iter().map(|e| (e.key().clone(), e.value().clone())).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.hashes.remove(key);
        self.sets.remove(key);
        self.strings.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, members: Vec<String>) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        self.sets.entry(key.to_string()).or_default().extend(members);
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self.sets.get(key).map(|s| s.clone()).unwrap_or_default())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.strings.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.strings.get(key).map(|v| v.clone()))
    }
}
