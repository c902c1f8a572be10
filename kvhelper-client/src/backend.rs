//! Store backends the client can drive.
//!
//! Backends speak raw strings; prefixing and value coercion happen in
//! [`KvClient`](crate::KvClient).

use std::collections::HashMap;

use async_trait::async_trait;
use kvhelper_core::{Store, StoreConfig, Ttl};

use crate::Error;

/// The store commands the client needs.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn ping(&self) -> Result<(), Error>;

    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// SET, with an expiry when `ttl_seconds` is given
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error>;

    /// DEL, returning how many keys existed
    async fn delete(&self, keys: &[String]) -> Result<u64, Error>;

    async fn exists(&self, key: &str) -> Result<bool, Error>;

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, Error>;

    async fn persist(&self, key: &str) -> Result<bool, Error>;

    async fn ttl(&self, key: &str) -> Result<Ttl, Error>;

    /// Every key matching the Redis-style pattern, sorted and without duplicates
    async fn scan(&self, pattern: &str) -> Result<Vec<String>, Error>;

    /// HSET, returning how many fields were new
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, Error>;

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, Error>;

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error>;

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64, Error>;

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, Error>;

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, Error>;

    /// Set members in sorted order
    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error>;

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error>;
}

/// Backend over the in-process [`Store`].
///
/// Useful for tests and for running without a server. Must be created inside
/// a Tokio runtime.
#[derive(Clone)]
pub struct MemoryBackend {
    store: Store,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(config),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.store.get(key)?)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error> {
        self.store.set(key, value, ttl_seconds.unwrap_or(0));
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, Error> {
        Ok(count(keys.iter().filter(|key| self.store.delete(key)).count()))
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        Ok(self.store.contains_key(key))
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, Error> {
        Ok(self.store.expire(key, seconds))
    }

    async fn persist(&self, key: &str) -> Result<bool, Error> {
        Ok(self.store.persist(key))
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        Ok(self.store.ttl(key))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, Error> {
        Ok(self.store.keys(pattern)?)
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, Error> {
        Ok(count(self.store.hset(key, fields.iter().cloned())?))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, Error> {
        Ok(self.store.hget(key, field)?)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error> {
        Ok(self.store.hgetall(key)?)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64, Error> {
        Ok(count(self.store.hdel(key, fields.iter().map(String::as_str))?))
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, Error> {
        Ok(count(self.store.sadd(key, members.iter().cloned())?))
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, Error> {
        Ok(count(self.store.srem(key, members.iter().map(String::as_str))?))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        Ok(self.store.smembers(key)?)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error> {
        Ok(self.store.sismember(key, member)?)
    }
}
