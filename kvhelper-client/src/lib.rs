//! # kvhelper Client
//!
//! Async helper functions over a key-value store: strings, hashes, sets, key
//! scanning and expiry.
//!
//! Every value read back from the store goes through
//! [`coerce`](kvhelper_core::coerce), so `"42"` comes back as an integer and
//! `"null"` as [`Value::Null`]. Every key is namespaced with the configured
//! prefix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kvhelper_client::{KvClient, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kvhelper_client::Error> {
//!     // Connect to redis://127.0.0.1:6379/0
//!     let client = KvClient::connect().await?;
//!
//!     // Store a value with 5-minute TTL
//!     client.set("visits", 41, Some(300)).await?;
//!
//!     // Read it back already typed
//!     assert_eq!(client.get("visits").await?, Value::Int(41));
//!
//!     client.delete("visits").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration Overrides
//!
//! ```rust,no_run
//! use kvhelper_client::{ClientOptions, KvClient};
//! use kvhelper_core::{ConfigMap, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kvhelper_client::Error> {
//!     let overrides = ConfigMap::from([
//!         ("host".to_string(), Value::from("cache.internal")),
//!         ("prefix".to_string(), Value::from("orders:")),
//!     ]);
//!     let options = ClientOptions::from_config(Some(&overrides))?;
//!
//!     let client = KvClient::with_options(options).await?;
//!     client.hset("42", "status", "shipped").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Without a Server
//!
//! ```rust
//! use kvhelper_client::{ClientOptions, KvClient, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kvhelper_client::Error> {
//!     let client = KvClient::in_memory(&ClientOptions::default());
//!     client.set("ratio", 2.5, None).await?;
//!     assert_eq!(client.get("ratio").await?, Value::Float(2.5));
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
mod options;
mod redis_backend;

#[cfg(test)]
mod tests;

pub use backend::{Backend, MemoryBackend};
pub use error::Error;
pub use kvhelper_core::{ConfigMap, Ttl, Value};
pub use options::{settings, ClientOptions};
pub use redis_backend::RedisBackend;

use kvhelper_core::{coerce_opt, coerce_str, escape_pattern};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Keys per DEL when deleting by pattern
const DELETE_BATCH: usize = 500;

/// Truncates a key for logging (keys may carry user data)
fn truncate_key_for_log(key: &str) -> String {
    const MAX_LOG_LEN: usize = 32;
    match key.char_indices().nth(MAX_LOG_LEN) {
        Some((end, _)) => format!("{}...", &key[..end]),
        None => key.to_string(),
    }
}

/// A client for a key-value store.
///
/// Generic over the [`Backend`] doing the actual I/O; [`RedisBackend`] by
/// default. Cloning is cheap and clones share the backend.
pub struct KvClient<B: Backend = RedisBackend> {
    backend: Arc<B>,
    prefix: Arc<str>,
}

impl<B: Backend> Clone for KvClient<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            prefix: Arc::clone(&self.prefix),
        }
    }
}

impl KvClient<RedisBackend> {
    /// Connect to a Redis server with default options.
    pub async fn connect() -> Result<Self, Error> {
        Self::with_options(ClientOptions::default()).await
    }

    /// Connect to a Redis server with custom options.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kvhelper_client::{ClientOptions, KvClient};
    /// # async fn example() -> Result<(), kvhelper_client::Error> {
    /// let options = ClientOptions::new("10.0.0.7").with_prefix("sessions:");
    /// let client = KvClient::with_options(options).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_options(options: ClientOptions) -> Result<Self, Error> {
        let backend = RedisBackend::connect(&options).await?;
        tracing::info!("Connected to {} (prefix {:?})", options.url(), options.prefix);
        Ok(Self::with_backend(backend, options.prefix))
    }
}

impl KvClient<MemoryBackend> {
    /// Create a client over a fresh in-memory store.
    ///
    /// Only the prefix is taken from `options`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn in_memory(options: &ClientOptions) -> Self {
        Self::with_backend(MemoryBackend::new(), options.prefix.clone())
    }
}

impl<B: Backend> KvClient<B> {
    /// Wrap any backend.
    pub fn with_backend(backend: B, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            backend: Arc::new(backend),
            prefix: Arc::from(prefix),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn keys_for<I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        keys.into_iter().map(|k| self.key(k.as_ref())).collect()
    }

    /// Check the server is reachable.
    pub async fn ping(&self) -> Result<(), Error> {
        self.backend.ping().await
    }

    /// Retrieve a value, coerced to its scalar type.
    ///
    /// A missing key reads as [`Value::Null`].
    pub async fn get(&self, key: &str) -> Result<Value, Error> {
        Ok(coerce_opt(self.get_raw(key).await?.as_deref()))
    }

    /// Retrieve the stored text as is. Returns `None` if the key doesn't exist.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        let key = self.key(key);
        tracing::debug!("GET {}", truncate_key_for_log(&key));
        self.backend.get(&key).await
    }

    /// Store a value.
    ///
    /// # Arguments
    /// * `key` - The key, without prefix
    /// * `value` - Anything convertible to a [`Value`]; stored as its text form
    /// * `ttl_seconds` - Optional time-to-live. `None` or `Some(0)` means the
    ///   key never expires.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        ttl_seconds: Option<u64>,
    ) -> Result<(), Error> {
        let key = self.key(key);
        let ttl_seconds = ttl_seconds.filter(|ttl| *ttl > 0);
        tracing::debug!(
            "SET {} (ttl: {})",
            truncate_key_for_log(&key),
            ttl_seconds.map_or_else(|| "never".to_string(), |t| format!("{}s", t))
        );
        let value = value.into().to_stored();
        self.backend.set(&key, &value, ttl_seconds).await
    }

    /// Delete a key. Returns `true` if it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.delete_many([key]).await? > 0)
    }

    /// Delete several keys, returning how many existed.
    pub async fn delete_many<I>(&self, keys: I) -> Result<u64, Error>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let keys = self.keys_for(keys);
        tracing::debug!("DEL {} keys", keys.len());
        self.backend.delete(&keys).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, Error> {
        self.backend.exists(&self.key(key)).await
    }

    /// Set a TTL on a key. Returns `false` if the key does not exist.
    pub async fn expire(&self, key: &str, seconds: u64) -> Result<bool, Error> {
        let key = self.key(key);
        tracing::debug!("EXPIRE {} {}s", truncate_key_for_log(&key), seconds);
        self.backend.expire(&key, seconds).await
    }

    /// Remove the TTL from a key. Returns `false` if the key does not exist
    /// or had no TTL.
    pub async fn persist(&self, key: &str) -> Result<bool, Error> {
        self.backend.persist(&self.key(key)).await
    }

    pub async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        self.backend.ttl(&self.key(key)).await
    }

    /// The scan pattern for `pattern` inside this client's namespace. The
    /// prefix is escaped so that it only ever matches itself.
    fn scan_pattern(&self, pattern: &str) -> String {
        format!("{}{}", escape_pattern(&self.prefix), pattern)
    }

    /// Scans with `pattern` and keeps only keys inside this namespace.
    async fn scan_own(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let pattern = self.scan_pattern(pattern);
        tracing::debug!("SCAN {}", truncate_key_for_log(&pattern));
        let mut keys = self.backend.scan(&pattern).await?;
        keys.retain(|key| key.starts_with(&*self.prefix));
        Ok(keys)
    }

    /// List keys matching a Redis-style pattern (e.g. `"user:*"`), sorted,
    /// with the prefix removed.
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let keys = self.scan_own(pattern).await?;
        Ok(keys
            .into_iter()
            .map(|key| key[self.prefix.len()..].to_string())
            .collect())
    }

    /// Delete every key matching a Redis-style pattern, returning how many
    /// were removed.
    pub async fn delete_matching(&self, pattern: &str) -> Result<u64, Error> {
        let keys = self.scan_own(pattern).await?;
        tracing::debug!(
            "Deleting {} keys matching {}",
            keys.len(),
            truncate_key_for_log(pattern)
        );

        let mut removed = 0;
        for batch in keys.chunks(DELETE_BATCH) {
            removed += self.backend.delete(batch).await?;
        }
        Ok(removed)
    }

    /// Set one hash field. Returns `true` if the field is new.
    pub async fn hset(
        &self,
        key: &str,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<bool, Error> {
        let field: String = field.into();
        let value: Value = value.into();
        Ok(self.hset_many(key, [(field, value)]).await? > 0)
    }

    /// Set several hash fields at once, returning how many were new.
    ///
    /// # Example
    /// ```rust
    /// # use kvhelper_client::{ClientOptions, KvClient, Value};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kvhelper_client::Error> {
    /// # let client = KvClient::in_memory(&ClientOptions::default());
    /// client
    ///     .hset_many("user:1", [("name", Value::from("alice")), ("age", Value::Int(30))])
    ///     .await?;
    /// assert_eq!(client.hget("user:1", "age").await?, Value::Int(30));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn hset_many<I, F, V>(&self, key: &str, fields: I) -> Result<u64, Error>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        let key = self.key(key);
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(field, value)| (field.into(), value.into().to_stored()))
            .collect();
        tracing::debug!("HSET {} ({} fields)", truncate_key_for_log(&key), fields.len());
        self.backend.hset(&key, &fields).await
    }

    /// Read one hash field, coerced. A missing field reads as [`Value::Null`].
    pub async fn hget(&self, key: &str, field: &str) -> Result<Value, Error> {
        let value = self.backend.hget(&self.key(key), field).await?;
        Ok(coerce_opt(value.as_deref()))
    }

    /// Read a whole hash with every field coerced. A missing key gives an
    /// empty map.
    pub async fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Value>, Error> {
        let key = self.key(key);
        tracing::debug!("HGETALL {}", truncate_key_for_log(&key));
        let fields = self.backend.hgetall(&key).await?;
        Ok(fields
            .into_iter()
            .map(|(field, value)| {
                let value = coerce_str(&value);
                (field, value)
            })
            .collect())
    }

    /// Remove hash fields, returning how many existed.
    pub async fn hdel<I>(&self, key: &str, fields: I) -> Result<u64, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        self.backend.hdel(&self.key(key), &fields).await
    }

    /// Add set members, returning how many were new.
    pub async fn sadd<I>(&self, key: &str, members: I) -> Result<u64, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let key = self.key(key);
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        tracing::debug!("SADD {} ({} members)", truncate_key_for_log(&key), members.len());
        self.backend.sadd(&key, &members).await
    }

    /// Remove set members, returning how many existed.
    pub async fn srem<I>(&self, key: &str, members: I) -> Result<u64, Error>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        self.backend.srem(&self.key(key), &members).await
    }

    /// Set members in sorted order.
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        self.backend.smembers(&self.key(key)).await
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error> {
        self.backend.sismember(&self.key(key), member).await
    }
}

// JSON extension methods (only available with "json" feature)
#[cfg(feature = "json")]
impl<B: Backend> KvClient<B> {
    /// Store a JSON-serializable value.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kvhelper_client::KvClient;
    /// # use serde::Serialize;
    /// # #[derive(Serialize)]
    /// # struct User { name: String }
    /// # async fn example() -> Result<(), kvhelper_client::Error> {
    /// # let client = KvClient::connect().await?;
    /// let user = User { name: "Alice".into() };
    /// client.set_json("user:1", &user, Some(3600)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_json<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: Option<u64>,
    ) -> Result<(), Error> {
        let json = serde_json::to_string(value).map_err(Error::Serialization)?;
        self.set(key, json, ttl_seconds).await
    }

    /// Retrieve and deserialize a JSON value. Returns `None` if the key
    /// doesn't exist.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, Error> {
        match self.get_raw(key).await? {
            Some(json) => {
                let value = serde_json::from_str(&json).map_err(Error::Deserialization)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
