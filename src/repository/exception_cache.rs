//! 异常消息缓存 - 投递失败的消息按 msg_id 暂存，保留一段时间后由缓存自行淘汰
//!
//! 写入是幂等覆盖：同一 msg_id 再次写入会替换旧值并重置保留时间。

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use crate::error::Result;
use crate::infra::{metrics, RedisClient};

/// 缓存存储
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 写入序列化后的异常消息
    async fn put_exception(&self, key: &str, blob: &str) -> Result<()>;

    /// 读取异常消息（不存在或已过期返回 None）
    async fn get_exception(&self, key: &str) -> Result<Option<String>>;

    /// 健康检查
    async fn health_check(&self) -> Result<()>;
}

/// Redis 缓存存储
#[derive(Clone)]
pub struct RedisCacheStore {
    client: RedisClient,
    key_prefix: String,
    ttl: Duration,
}

impl RedisCacheStore {
    pub fn new(client: RedisClient, key_prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn put_exception(&self, key: &str, blob: &str) -> Result<()> {
        let full_key = self.full_key(key);
        self.client
            .setex(&full_key, self.ttl.as_secs(), blob)
            .await?;
        debug!("💾 异常消息已缓存: {} (ttl={}s)", full_key, self.ttl.as_secs());
        Ok(())
    }

    async fn get_exception(&self, key: &str) -> Result<Option<String>> {
        self.client.get(&self.full_key(key)).await
    }

    async fn health_check(&self) -> Result<()> {
        let state = self.client.pool_state();
        metrics::record_redis_pool(
            state.connections.saturating_sub(state.idle_connections),
            state.idle_connections,
        );
        self.client.ping().await
    }
}

/// 本地 TTL 缓存（用于测试和开发）
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<String, String>,
}

impl MokaCacheStore {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

impl Default for MokaCacheStore {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(7 * 24 * 3600))
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn put_exception(&self, key: &str, blob: &str) -> Result<()> {
        self.cache.insert(key.to_string(), blob.to_string()).await;
        Ok(())
    }

    async fn get_exception(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = MokaCacheStore::default();
        store.put_exception("m1", "first").await.unwrap();
        store.put_exception("m1", "second").await.unwrap();
        assert_eq!(
            store.get_exception("m1").await.unwrap().as_deref(),
            Some("second")
        );
        assert_eq!(store.get_exception("m2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let store = MokaCacheStore::new(100, Duration::from_millis(50));
        store.put_exception("m1", "blob").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(store.get_exception("m1").await.unwrap(), None);
    }
}
