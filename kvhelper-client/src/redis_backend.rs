//! Backend over a Redis server using the `redis` crate.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use kvhelper_core::Ttl;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, IntoConnectionInfo};

use crate::{Backend, ClientOptions, Error};

/// Backend holding a multiplexed, self-reconnecting Redis connection.
///
/// Cloning is cheap; clones share the same connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
    scan_count: usize,
}

impl RedisBackend {
    /// Connect using the host, port, database, password and timeouts in `options`.
    pub async fn connect(options: &ClientOptions) -> Result<Self, Error> {
        let mut info = (options.host.as_str(), options.port)
            .into_connection_info()
            .map_err(|e| Error::Connection(e.to_string()))?;
        info.redis.db = options.db;
        info.redis.password = options.password.clone();

        let client = redis::Client::open(info).map_err(|e| Error::Connection(e.to_string()))?;
        let config = ConnectionManagerConfig::new()
            .set_connection_timeout(options.connect_timeout)
            .set_response_timeout(options.response_timeout);

        let conn = tokio::time::timeout(
            options.connect_timeout,
            ConnectionManager::new_with_config(client, config),
        )
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "connecting to {} took longer than {:?}",
                options.url(),
                options.connect_timeout
            ))
        })?
        .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            scan_count: options.scan_count.max(1),
        })
    }

    /// A handle to the shared connection for commands this crate does not wrap
    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(seconds) = ttl_seconds {
            cmd.arg("EX").arg(seconds);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, Error> {
        // DEL without arguments is a syntax error
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(keys).await?;
        Ok(removed)
    }

    async fn exists(&self, key: &str) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let applied: bool = redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(applied)
    }

    async fn persist(&self, key: &str) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let persisted: bool = conn.persist(key).await?;
        Ok(persisted)
    }

    async fn ttl(&self, key: &str) -> Result<Ttl, Error> {
        let mut conn = self.conn.clone();
        let seconds: i64 = conn.ttl(key).await?;
        Ok(match seconds {
            -2 => Ttl::Missing,
            s if s < 0 => Ttl::Persistent,
            s => Ttl::Expires(s.unsigned_abs()),
        })
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.conn.clone();
        let mut found = BTreeSet::new();
        let mut cursor: u64 = 0;

        // SCAN may return a key more than once; the set removes repeats
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await?;
            found.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(found.into_iter().collect())
    }

    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<u64, Error> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let added: u64 = redis::cmd("HSET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await?;
        Ok(added)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, Error> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64, Error> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = conn.hdel(key, fields).await?;
        Ok(removed)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64, Error> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let added: u64 = conn.sadd(key, members).await?;
        Ok(added)
    }

    async fn srem(&self, key: &str, members: &[String]) -> Result<u64, Error> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = conn.srem(key, members).await?;
        Ok(removed)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, Error> {
        let mut conn = self.conn.clone();
        let members: BTreeSet<String> = conn.smembers(key).await?;
        Ok(members.into_iter().collect())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let is_member: bool = conn.sismember(key, member).await?;
        Ok(is_member)
    }
}
