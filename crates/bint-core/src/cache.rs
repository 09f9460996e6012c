use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::RedisConfig;
use crate::error::BintError;

/// Cache backend trait for pluggable caching strategies.
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a raw value from the cache.
    async fn get(&self, key: &str) -> Result<Option<String>, BintError>;

    /// Set a raw value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BintError>;

    /// Delete a key from the cache.
    async fn del(&self, key: &str) -> Result<bool, BintError>;

    async fn exists(&self, key: &str) -> Result<bool, BintError>;

    /// Flush all keys (use with caution).
    async fn flush(&self) -> Result<(), BintError>;

    /// Round-trip check used at startup.
    async fn ping(&self) -> Result<(), BintError> {
        Ok(())
    }
}

/// The cache handle carried by every [`Context`](crate::Context).
///
/// ```rust,ignore
/// Operation::new("GetProfile", |ctx: Context, id: i64| async move {
///     let key = format!("profile:{id}");
///     if let Some(cached) = ctx.cache.get_json::<Profile>(&key).await? {
///         return Ok(Json(cached));
///     }
///     let profile = load_profile(&ctx.db, id).await?;
///     ctx.cache.set_json(&key, &profile, Some(Duration::from_secs(300))).await?;
///     Ok::<_, BintError>(Json(profile))
/// })
/// ```
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl CacheService {
    /// Create a new cache service with the given backend.
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        CacheService {
            backend: Arc::new(backend),
        }
    }

    /// Create an in-memory cache (good for development and testing).
    pub fn in_memory() -> Self {
        CacheService::new(InMemoryCache::new())
    }

    /// Build the cache described by the `redis` config section.
    ///
    /// Without a section the in-memory backend is used. A configured server
    /// that cannot be reached is an error, as is a section while the `redis`
    /// feature is off.
    pub async fn connect(config: Option<&RedisConfig>) -> Result<Self, BintError> {
        let Some(config) = config else {
            tracing::info!("using in-memory cache");
            return Ok(CacheService::in_memory());
        };

        #[cfg(feature = "redis")]
        {
            let redis_cache = RedisCache::new(&config.url()).await?;
            tracing::info!(addr = %config.addr, "redis cache connected");
            Ok(CacheService::new(redis_cache))
        }
        #[cfg(not(feature = "redis"))]
        {
            let _ = config;
            Err(BintError::Config(
                "redis configured but the `redis` feature is disabled".to_string(),
            ))
        }
    }

    /// Get a JSON-deserialized value from the cache.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, BintError> {
        match self.backend.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| BintError::Cache(format!("deserialize {key}: {e}"))),
            None => Ok(None),
        }
    }

    /// Set a JSON-serialized value in the cache.
    pub async fn set_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), BintError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| BintError::Cache(format!("serialize {key}: {e}")))?;
        self.backend.set(key, &raw, ttl).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, BintError> {
        self.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BintError> {
        self.backend.set(key, value, ttl).await
    }

    pub async fn del(&self, key: &str) -> Result<bool, BintError> {
        self.backend.del(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, BintError> {
        self.backend.exists(key).await
    }

    pub async fn flush(&self) -> Result<(), BintError> {
        self.backend.flush().await
    }

    pub async fn ping(&self) -> Result<(), BintError> {
        self.backend.ping().await
    }
}

// ── In-Memory Cache Backend ──

/// HashMap-backed cache. Expired entries are dropped lazily on read.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, Entry>>>,
}

#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() <= at)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BintError> {
        let store = self.store.read().await;
        match store.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.value.clone())),
            Some(_) => {
                drop(store);
                self.store.write().await.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BintError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|d| Instant::now() + d),
        };
        self.store.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, BintError> {
        Ok(self.store.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, BintError> {
        Ok(self.store.read().await.get(key).is_some_and(Entry::is_live))
    }

    async fn flush(&self) -> Result<(), BintError> {
        self.store.write().await.clear();
        Ok(())
    }
}

// ── Redis Cache Backend ──

/// Redis-backed cache for production use.
///
/// ```rust,ignore
/// let cache = RedisCache::new("redis://:secret@127.0.0.1:6379/0").await?;
/// let service = CacheService::new(cache);
/// ```
#[cfg(feature = "redis")]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

#[cfg(feature = "redis")]
fn redis_err(op: &str, e: redis::RedisError) -> BintError {
    BintError::Cache(format!("redis {op}: {e}"))
}

#[cfg(feature = "redis")]
impl RedisCache {
    /// Connect and ping, giving up after five seconds.
    pub async fn new(url: &str) -> Result<Self, BintError> {
        let client = redis::Client::open(url).map_err(|e| redis_err("open", e))?;
        let connect = redis::aio::ConnectionManager::new(client);
        let conn = tokio::time::timeout(Duration::from_secs(5), connect)
            .await
            .map_err(|_| BintError::Cache("redis connect: timed out".to_string()))?
            .map_err(|e| redis_err("connect", e))?;
        let cache = RedisCache { conn };
        cache.ping().await?;
        Ok(cache)
    }
}

#[cfg(feature = "redis")]
#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BintError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| redis_err("GET", e))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), BintError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| redis_err("SETEX", e)),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(|e| redis_err("SET", e)),
        }
    }

    async fn del(&self, key: &str) -> Result<bool, BintError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let count: i64 = conn.del(key).await.map_err(|e| redis_err("DEL", e))?;
        Ok(count > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, BintError> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(|e| redis_err("EXISTS", e))
    }

    async fn flush(&self) -> Result<(), BintError> {
        let mut conn = self.conn.clone();
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| redis_err("FLUSHDB", e))
    }

    async fn ping(&self) -> Result<(), BintError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| redis_err("PING", e))
    }
}
