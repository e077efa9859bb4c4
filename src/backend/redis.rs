//! Redis cache tag index.
//!
//! Layout per tag:
//! - `tag:{tag}:generation` - INCR counter, absent means 0
//! - `tag:{tag}:keys` - SET of entry keys registered under the tag. Its
//!   expiry is raised to the longest TTL of the entries added to it, and
//!   removed when an entry without TTL joins, so the set never outlives the
//!   need for it by more than one TTL (needs Redis 7 for `EXPIRE NX|GT`).
//!
//! Entries are stored as postcard-encoded [`StoredEntry`] values so the tag
//! stamps travel with the payload.

use super::{CacheBackend, TagStamp};
use crate::error::{Error, Result};
use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Connection, Pool, Runtime};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool statistics information.
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub connections: u32,
    pub idle_connections: u32,
}

/// Default Redis connection pool size.
/// Formula: (CPU cores × 2) + 1
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Configuration for Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    pub pool_size: u32,
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            database: 0,
            pool_size: DEFAULT_POOL_SIZE,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Build Redis connection string.
    pub fn connection_string(&self) -> String {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => format!(
                "redis://{}:{}@{}:{}/{}",
                username, password, self.host, self.port, self.database
            ),
            (None, Some(password)) => format!(
                "redis://default:{}@{}:{}/{}",
                password, self.host, self.port, self.database
            ),
            _ => format!("redis://{}:{}/{}", self.host, self.port, self.database),
        }
    }
}

/// Value stored under an entry key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub stamps: Vec<TagStamp>,
    pub data: Vec<u8>,
}

fn generation_key(tag: &str) -> String {
    format!("tag:{}:generation", tag)
}

fn members_key(tag: &str) -> String {
    format!("tag:{}:keys", tag)
}

/// Redis tag index with connection pooling.
///
/// # Example
///
/// ```no_run
/// # use resource_kit::backend::{CacheBackend, RedisBackend, RedisConfig, TagStamp};
/// # use resource_kit::error::Result;
/// # async fn example() -> Result<()> {
/// let backend = RedisBackend::new(RedisConfig::default()).await?;
///
/// let generation = backend.tag_generation("generos").await?;
/// backend
///     .set("generos:id:1", b"value".to_vec(), &[TagStamp::new("generos", generation)], None)
///     .await?;
/// backend.evict_by_tag("generos").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Create new Redis backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = Self::create_pool(&config.connection_string(), config.pool_size)?;

        info!(
            "✓ Redis backend initialized: {}:{}",
            config.host, config.port
        );

        Ok(RedisBackend { pool })
    }

    /// Create from connection string directly.
    ///
    /// Pool size comes from `REDIS_POOL_SIZE` when set, else 16.
    ///
    /// # Errors
    /// Returns `Err` if pool creation fails.
    pub async fn from_connection_string(conn_str: &str) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        let pool = Self::create_pool(conn_str, pool_size)?;

        info!(
            "✓ Redis backend initialized from connection string (pool size: {})",
            pool_size
        );

        Ok(RedisBackend { pool })
    }

    fn create_pool(conn_str: &str, pool_size: u32) -> Result<Pool> {
        let mut cfg = PoolConfig::from_url(conn_str);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size as usize));

        cfg.create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::CacheError(format!("Failed to create Redis pool: {}", e)))
    }

    /// Get current pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            connections: status.size as u32,
            idle_connections: status.available as u32,
        }
    }

    /// Number of keys currently registered under `tag`.
    pub async fn tracked_keys(&self, tag: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        conn.scard(members_key(tag)).await.map_err(|e| {
            Error::CacheError(format!("Redis SCARD failed for tag {}: {}", tag, e))
        })
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::CacheError(format!("Failed to get Redis connection: {}", e)))
    }

    async fn generations(&self, conn: &mut Connection, tags: &[&str]) -> Result<Vec<u64>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = tags.iter().map(|t| generation_key(t)).collect();
        let values: Vec<Option<u64>> = deadpool_redis::redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut **conn)
            .await
            .map_err(|e| Error::CacheError(format!("Redis MGET generations failed: {}", e)))?;
        Ok(values.into_iter().map(|v| v.unwrap_or(0)).collect())
    }
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;

        let raw: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| Error::CacheError(format!("Redis GET failed for key {}: {}", key, e)))?;

        let Some(raw) = raw else {
            debug!("✓ Redis GET {} -> MISS", key);
            return Ok(None);
        };

        let entry: StoredEntry = postcard::from_bytes(&raw)?;
        let tags: Vec<&str> = entry.stamps.iter().map(|s| s.tag.as_str()).collect();
        let current = self.generations(&mut conn, &tags).await?;

        // A stale entry is hidden, not deleted: a fresh fill may already sit
        // under the same key by the time a DEL would land.
        if entry
            .stamps
            .iter()
            .zip(current)
            .any(|(stamp, generation)| stamp.generation != generation)
        {
            debug!("✓ Redis GET {} -> MISS (stale)", key);
            return Ok(None);
        }

        debug!("✓ Redis GET {} -> HIT", key);
        Ok(Some(entry.data))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        tags: &[TagStamp],
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;

        let names: Vec<&str> = tags.iter().map(|s| s.tag.as_str()).collect();
        let current = self.generations(&mut conn, &names).await?;
        if tags
            .iter()
            .zip(current)
            .any(|(stamp, generation)| stamp.generation < generation)
        {
            debug!("✓ Redis SET {} discarded (tag evicted since read)", key);
            return Ok(());
        }

        let entry = StoredEntry {
            stamps: tags.to_vec(),
            data: value,
        };
        let bytes = postcard::to_allocvec(&entry)
            .map_err(|e| Error::SerializationError(e.to_string()))?;

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, bytes, seconds)
                    .await
                    .map_err(|e| {
                        Error::CacheError(format!("Redis SET_EX failed for key {}: {}", key, e))
                    })?;
                debug!("✓ Redis SET {} (TTL: {}s, tags: {})", key, seconds, tags.len());
            }
            None => {
                conn.set::<_, _, ()>(key, bytes).await.map_err(|e| {
                    Error::CacheError(format!("Redis SET failed for key {}: {}", key, e))
                })?;
                debug!("✓ Redis SET {} (tags: {})", key, tags.len());
            }
        }

        let mut register = deadpool_redis::redis::pipe();
        register.atomic();
        for stamp in tags {
            let members = members_key(&stamp.tag);
            register.sadd(&members, key).ignore();
            match ttl {
                Some(duration) => {
                    let seconds = duration.as_secs().max(1);
                    register
                        .cmd("EXPIRE")
                        .arg(&members)
                        .arg(seconds)
                        .arg("NX")
                        .ignore()
                        .cmd("EXPIRE")
                        .arg(&members)
                        .arg(seconds)
                        .arg("GT")
                        .ignore();
                }
                None => {
                    register.persist(&members).ignore();
                }
            }
        }
        if !tags.is_empty() {
            register.query_async::<()>(&mut *conn).await.map_err(|e| {
                Error::CacheError(format!("Redis tag registration failed for key {}: {}", key, e))
            })?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn().await?;

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| Error::CacheError(format!("Redis DEL failed for key {}: {}", key, e)))?;

        debug!("✓ Redis DELETE {}", key);
        Ok(())
    }

    async fn evict_by_tag(&self, tag: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let members = members_key(tag);

        // One MULTI/EXEC: bump the generation and take the member set together.
        let (generation, keys): (u64, Vec<String>) = deadpool_redis::redis::pipe()
            .atomic()
            .incr(generation_key(tag), 1)
            .smembers(&members)
            .del(&members)
            .ignore()
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::CacheError(format!("Redis EVICT failed for tag {}: {}", tag, e)))?;

        let removed: usize = if keys.is_empty() {
            0
        } else {
            conn.del(&keys).await.map_err(|e| {
                Error::CacheError(format!("Redis DEL (bulk) failed for tag {}: {}", tag, e))
            })?
        };

        debug!(
            "✓ Redis EVICT tag {} -> {} entries (generation {})",
            tag, removed, generation
        );
        Ok(removed)
    }

    async fn tag_generation(&self, tag: &str) -> Result<u64> {
        let mut conn = self.conn().await?;
        let generation: Option<u64> = conn.get(generation_key(tag)).await.map_err(|e| {
            Error::CacheError(format!("Redis GET generation failed for tag {}: {}", tag, e))
        })?;
        Ok(generation.unwrap_or(0))
    }

    async fn health_check(&self) -> Result<bool> {
        let mut conn = self.conn().await?;

        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| Error::CacheError(format!("Redis PING failed: {}", e)))?;

        Ok(pong.contains("PONG"))
    }

    async fn clear_all(&self) -> Result<()> {
        let mut conn = self.conn().await?;

        deadpool_redis::redis::cmd("FLUSHDB")
            .query_async::<()>(&mut *conn)
            .await
            .map_err(|e| Error::CacheError(format!("Redis FLUSHDB failed: {}", e)))?;

        warn!("⚠ Redis FLUSHDB executed - all cache cleared!");
        Ok(())
    }
}
