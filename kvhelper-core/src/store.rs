use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use glob::Pattern;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::entry::{Data, Entry, Ttl};
use crate::pattern::to_glob;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a different kind of value than the operation expects
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    /// The key pattern is not a valid glob
    InvalidPattern { pattern: String, reason: String },
}

impl StoreError {
    fn wrong_type(key: &str, expected: &'static str, found: &Data) -> Self {
        StoreError::WrongType {
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::WrongType { key, expected, found } => {
                write!(
                    f,
                    "Wrong type: key '{}' holds a {}, expected a {}",
                    key, found, expected
                )
            }
            StoreError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid key pattern '{}': {}", pattern, reason)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Internal shared state for the store
struct StoreInner {
    data: DashMap<String, Entry>,
    /// Sender to signal shutdown to the cleanup task
    shutdown_tx: watch::Sender<bool>,
    max_ttl: Duration,
}

/// Thread-safe in-memory key-value store with strings, hashes, sets and TTLs
///
/// Uses `DashMap` so operations on different keys rarely contend. Expired keys
/// are removed lazily when touched and periodically by a background task that
/// stops when the last handle is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use kvhelper_core::{Store, StoreConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let store = Store::with_config(
///         StoreConfig::default().with_cleanup_interval(Duration::from_secs(30)),
///     );
///
///     store.set("greeting", "hello", 300); // 5 minute TTL
///     store.hset("user:1", [("name".to_string(), "alice".to_string())]).unwrap();
///     store.sadd("tags", ["a".to_string(), "b".to_string()]).unwrap();
/// }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates a new store with default configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The store requires
    /// a runtime to spawn its background cleanup task.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new store with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn with_config(config: StoreConfig) -> Self {
        if tokio::runtime::Handle::try_current().is_err() {
            panic!(
                "kvhelper_core::Store requires a Tokio runtime. \
                 Create it from within a #[tokio::main] or #[tokio::test] context."
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(StoreInner {
            data: DashMap::new(),
            shutdown_tx,
            max_ttl: config.max_ttl,
        });

        // The task holds a weak handle so dropping the store ends it
        let cleanup_inner = Arc::downgrade(&inner);
        tokio::spawn(Self::cleanup_task(
            cleanup_inner,
            config.cleanup_interval,
            shutdown_rx,
        ));

        Self { inner }
    }

    /// Background task that periodically cleans up expired entries
    async fn cleanup_task(
        inner: std::sync::Weak<StoreInner>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    let removed = Self::cleanup_internal(&inner);
                    if removed > 0 {
                        tracing::debug!("Cleanup removed {} expired keys", removed);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn cleanup_internal(inner: &StoreInner) -> usize {
        let before = inner.data.len();
        inner.data.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(inner.data.len())
    }

    fn expiry_after(&self, seconds: u64) -> Instant {
        Instant::now() + Duration::from_secs(seconds).min(self.inner.max_ttl)
    }

    /// Runs `f` on a live entry, evicting it first if it has expired.
    fn read<T>(&self, key: &str, f: impl FnOnce(&Entry) -> T) -> Option<T> {
        let entry = self.inner.data.get(key)?;
        if entry.value().is_expired() {
            // Drop the read guard before removing
            drop(entry);
            self.inner.data.remove_if(key, |_, v| v.is_expired());
            return None;
        }
        Some(f(entry.value()))
    }

    /// Runs `f` on the entry for `key`, creating it from `create` when the key
    /// is missing or expired.
    fn upsert<T>(
        &self,
        key: &str,
        create: impl FnOnce() -> Data,
        f: impl FnOnce(&mut Entry) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        match self.inner.data.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    occupied.insert(Entry::new(create()));
                }
                f(occupied.get_mut())
            }
            MapEntry::Vacant(vacant) => {
                let mut entry = vacant.insert(Entry::new(create()));
                f(entry.value_mut())
            }
        }
    }

    /// Runs a removal on the entry for `key`, then drops the key if the
    /// collection it holds ended up empty.
    fn shrink(
        &self,
        key: &str,
        f: impl FnOnce(&mut Data) -> Result<usize, StoreError>,
    ) -> Result<usize, StoreError> {
        let Some(mut entry) = self.inner.data.get_mut(key) else {
            return Ok(0);
        };
        if entry.is_expired() {
            drop(entry);
            self.inner.data.remove_if(key, |_, v| v.is_expired());
            return Ok(0);
        }
        let removed = f(entry.data_mut())?;
        drop(entry);

        if removed > 0 {
            self.inner.data.remove_if(key, |_, v| match v.data() {
                Data::Hash(fields) => fields.is_empty(),
                Data::Set(members) => members.is_empty(),
                Data::Str(_) => false,
            });
        }
        Ok(removed)
    }

    /// Stores a string value, replacing whatever the key held before
    ///
    /// A TTL of 0 means the key never expires. Other TTLs are capped at
    /// [`StoreConfig::max_ttl`].
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, ttl_seconds: u64) {
        let value: String = value.into();
        let data = Data::Str(Arc::from(value));
        let entry = if ttl_seconds == 0 {
            Entry::new(data)
        } else {
            Entry::with_expiry(data, self.expiry_after(ttl_seconds))
        };
        self.inner.data.insert(key.into(), entry);
    }

    /// Stores a value that expires immediately (for testing purposes)
    #[cfg(test)]
    fn set_expired(&self, key: impl Into<String>, value: impl Into<String>) {
        let value: String = value.into();
        let entry = Entry::with_expiry(
            Data::Str(Arc::from(value)),
            Instant::now() - Duration::from_secs(1),
        );
        self.inner.data.insert(key.into(), entry);
    }

    /// Retrieves a string value by key
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key, |entry| match entry.data() {
            Data::Str(value) => Ok(value.to_string()),
            other => Err(StoreError::wrong_type(key, "string", other)),
        })
        .transpose()
    }

    /// Deletes a key of any kind
    ///
    /// Returns `true` if a live key was removed.
    #[must_use = "returns whether the key existed"]
    pub fn delete(&self, key: &str) -> bool {
        self.inner
            .data
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired())
    }

    /// Deletes all entries from the store, returning how many there were.
    pub fn delete_all(&self) -> usize {
        let count = self.inner.data.len();
        self.inner.data.clear();
        count
    }

    /// Checks if a key exists and is not expired.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read(key, |_| ()).is_some()
    }

    /// Sets a TTL on an existing key. A TTL of 0 deletes the key.
    ///
    /// Returns `false` if the key does not exist.
    pub fn expire(&self, key: &str, seconds: u64) -> bool {
        if seconds == 0 {
            return self.delete(key);
        }
        let expires_at = self.expiry_after(seconds);
        self.set_expiry(key, Some(expires_at))
    }

    /// Removes the TTL from a key. Returns `false` if the key does not exist
    /// or had no TTL.
    pub fn persist(&self, key: &str) -> bool {
        let had_ttl = self
            .read(key, |entry| entry.expires_at().is_some())
            .unwrap_or(false);
        had_ttl && self.set_expiry(key, None)
    }

    fn set_expiry(&self, key: &str, expires_at: Option<Instant>) -> bool {
        let Some(mut entry) = self.inner.data.get_mut(key) else {
            return false;
        };
        if entry.is_expired() {
            drop(entry);
            self.inner.data.remove_if(key, |_, v| v.is_expired());
            return false;
        }
        entry.set_expires_at(expires_at);
        true
    }

    /// Returns the remaining lifetime of a key
    pub fn ttl(&self, key: &str) -> Ttl {
        self.read(key, Entry::ttl).unwrap_or(Ttl::Missing)
    }

    /// Returns live keys matching a Redis-style pattern, sorted.
    ///
    /// Supports `*`, `?`, `[abc]`, `[a-z]`, `[^a]` and backslash escapes (see
    /// [`escape_pattern`](crate::escape_pattern)). Unlike Redis, an unclosed
    /// `[` is rejected with [`StoreError::InvalidPattern`], and `\]` cannot
    /// appear inside a class.
    ///
    /// This scans every key in the store; it is meant for maintenance and
    /// debugging rather than hot paths.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let matcher = Pattern::new(&to_glob(pattern)).map_err(|e| StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut keys: Vec<String> = self
            .inner
            .data
            .iter()
            .filter(|entry| matcher.matches(entry.key()))
            .filter(|entry| !entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Sets hash fields, creating the hash if needed. The key's TTL is kept.
    ///
    /// Returns the number of fields that were newly added.
    pub fn hset<I>(&self, key: &str, fields: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut fields = fields.into_iter().peekable();
        if fields.peek().is_none() {
            return Ok(0);
        }
        self.upsert(
            key,
            || Data::Hash(HashMap::new()),
            |entry| match entry.data_mut() {
                Data::Hash(hash) => Ok(fields
                    .map(|(field, value)| hash.insert(field, value))
                    .filter(Option::is_none)
                    .count()),
                other => Err(StoreError::wrong_type(key, "hash", other)),
            },
        )
    }

    /// Returns one field of a hash
    pub fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.read(key, |entry| match entry.data() {
            Data::Hash(hash) => Ok(hash.get(field).cloned()),
            other => Err(StoreError::wrong_type(key, "hash", other)),
        })
        .transpose()
        .map(Option::flatten)
    }

    /// Returns every field of a hash; a missing key gives an empty map.
    pub fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.read(key, |entry| match entry.data() {
            Data::Hash(hash) => Ok(hash.clone()),
            other => Err(StoreError::wrong_type(key, "hash", other)),
        })
        .unwrap_or_else(|| Ok(HashMap::new()))
    }

    /// Removes hash fields, returning how many existed.
    pub fn hdel<'a, I>(&self, key: &str, fields: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.shrink(key, |data| match data {
            Data::Hash(hash) => Ok(fields
                .into_iter()
                .filter(|field| hash.remove(*field).is_some())
                .count()),
            other => Err(StoreError::wrong_type(key, "hash", other)),
        })
    }

    /// Adds set members, returning how many were new.
    pub fn sadd<I>(&self, key: &str, members: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut members = members.into_iter().peekable();
        if members.peek().is_none() {
            return Ok(0);
        }
        self.upsert(
            key,
            || Data::Set(BTreeSet::new()),
            |entry| match entry.data_mut() {
                Data::Set(set) => Ok(members
                    .map(|member| set.insert(member))
                    .filter(|added| *added)
                    .count()),
                other => Err(StoreError::wrong_type(key, "set", other)),
            },
        )
    }

    /// Removes set members, returning how many existed.
    pub fn srem<'a, I>(&self, key: &str, members: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.shrink(key, |data| match data {
            Data::Set(set) => Ok(members
                .into_iter()
                .filter(|member| set.remove(*member))
                .count()),
            other => Err(StoreError::wrong_type(key, "set", other)),
        })
    }

    /// Returns set members in sorted order; a missing key gives no members.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(key, |entry| match entry.data() {
            Data::Set(set) => Ok(set.iter().cloned().collect()),
            other => Err(StoreError::wrong_type(key, "set", other)),
        })
        .unwrap_or_else(|| Ok(Vec::new()))
    }

    pub fn sismember(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.read(key, |entry| match entry.data() {
            Data::Set(set) => Ok(set.contains(member)),
            other => Err(StoreError::wrong_type(key, "set", other)),
        })
        .unwrap_or(Ok(false))
    }

    /// Manually triggers cleanup of all expired entries
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        Self::cleanup_internal(&self.inner)
    }

    /// Returns the number of entries in the store (including expired ones)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Stops the background cleanup task
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
