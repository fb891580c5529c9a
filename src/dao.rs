//! 数据访问聚合器
//!
//! 进程内只构造一次，持有四个存储适配器的句柄（`Arc` 共享给各个处理器）。
//! 任意一个适配器初始化失败都会中止启动，不存在降级模式。

use std::sync::Arc;

use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::infra::{Database, RedisClient};
use crate::repository::{
    CacheStore, ColumnStore, CounterStore, InboxStore, PgCounterStore, PgInboxStore,
    RedisCacheStore, SledColumnStore,
};

/// 数据访问聚合器
#[derive(Clone)]
pub struct Dao {
    counter: Arc<dyn CounterStore>,
    column: Arc<dyn ColumnStore>,
    inbox: Arc<dyn InboxStore>,
    cache: Arc<dyn CacheStore>,
}

impl Dao {
    /// 按配置连接全部存储（列存储 → 计数器 → 收件箱 → 缓存）
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let column = SledColumnStore::open(&config.column_store.path, &config.column_store.tree)
            .map_err(|e| {
                error!("❌ 列存储初始化失败: {}", e);
                e
            })?;

        let counter_db = Database::new(&config.counter_store).await.map_err(|e| {
            error!("❌ 计数器存储初始化失败: {}", e);
            ServerError::Database(format!("counter store: {}", e))
        })?;
        let counter_pool = Arc::new(counter_db.pool().clone());

        // 收件箱与计数器同库时复用连接池
        let inbox_pool = if config.inbox_store.url == config.counter_store.url {
            counter_pool.clone()
        } else {
            let inbox_db = Database::new(&config.inbox_store).await.map_err(|e| {
                error!("❌ 收件箱存储初始化失败: {}", e);
                ServerError::Database(format!("inbox store: {}", e))
            })?;
            Arc::new(inbox_db.pool().clone())
        };

        let redis = RedisClient::new(&config.cache.redis).await.map_err(|e| {
            error!("❌ 缓存存储初始化失败: {}", e);
            e
        })?;
        let cache = RedisCacheStore::new(
            redis,
            config.cache.exception_key_prefix.clone(),
            config.cache.exception_ttl(),
        );

        info!("✅ 数据访问层初始化完成");
        Ok(Self::from_stores(
            Arc::new(PgCounterStore::new(counter_pool)),
            Arc::new(column),
            Arc::new(PgInboxStore::new(inbox_pool)),
            Arc::new(cache),
        ))
    }

    /// 用现成的适配器构造（测试 / 内存模式）
    pub fn from_stores(
        counter: Arc<dyn CounterStore>,
        column: Arc<dyn ColumnStore>,
        inbox: Arc<dyn InboxStore>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            counter,
            column,
            inbox,
            cache,
        }
    }

    pub fn counter(&self) -> &Arc<dyn CounterStore> {
        &self.counter
    }

    pub fn column(&self) -> &Arc<dyn ColumnStore> {
        &self.column
    }

    pub fn inbox(&self) -> &Arc<dyn InboxStore> {
        &self.inbox
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// 逐个检查适配器，返回 (名称, 是否可用)
    pub async fn health(&self) -> Vec<(&'static str, bool)> {
        let mut report = Vec::with_capacity(4);
        report.push(("counter_store", self.counter.health_check().await.is_ok()));
        report.push(("column_store", self.column.health_check().await.is_ok()));
        report.push(("inbox_store", self.inbox.health_check().await.is_ok()));
        report.push(("cache", self.cache.health_check().await.is_ok()));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryColumnStore, MemoryCounterStore, MemoryInboxStore, MokaCacheStore};

    #[tokio::test]
    async fn test_health_reports_each_store() {
        let counter = Arc::new(MemoryCounterStore::new());
        let dao = Dao::from_stores(
            counter.clone(),
            Arc::new(MemoryColumnStore::new()),
            Arc::new(MemoryInboxStore::new()),
            Arc::new(MokaCacheStore::default()),
        );
        assert!(dao.health().await.iter().all(|(_, ok)| *ok));

        counter.set_unavailable(true);
        let report = dao.health().await;
        assert_eq!(report[0], ("counter_store", false));
        assert!(report[1..].iter().all(|(_, ok)| *ok));
    }

    #[tokio::test]
    async fn test_connect_fails_fast_on_bad_column_store() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = ServerConfig::new();
        config.column_store.path = file.path().display().to_string();
        assert!(matches!(
            Dao::connect(&config).await,
            Err(ServerError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_fails_fast_on_unreachable_counter_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::new();
        config.column_store.path = dir.path().join("cells").display().to_string();
        config.counter_store.url = "postgres://postgres@127.0.0.1:1/x".to_string();
        config.counter_store.min_connections = 0;
        config.counter_store.acquire_timeout_secs = 1;
        config.inbox_store = config.counter_store.clone();

        let result =
            tokio::time::timeout(std::time::Duration::from_secs(15), Dao::connect(&config))
                .await
                .unwrap();
        assert!(matches!(result, Err(ServerError::Database(_))));
    }
}
