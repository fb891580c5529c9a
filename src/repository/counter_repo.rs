//! 计数器存储 - 用户消息水位（current / total）
//!
//! 生产环境为 PostgreSQL 表 `manager_user_msg_id`，测试使用内存实现。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::model::UserMsgId;

/// 计数器存储
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 读取用户消息水位，行不存在时返回 `ServerError::NotFound`
    async fn get_watermark(&self, user_id: i64) -> Result<UserMsgId>;

    /// 健康检查
    async fn health_check(&self) -> Result<()>;
}

/// 计数器存储 (PostgreSQL 实现)
#[derive(Clone)]
pub struct PgCounterStore {
    pool: Arc<PgPool>,
}

impl PgCounterStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn get_watermark(&self, user_id: i64) -> Result<UserMsgId> {
        let row = sqlx::query_as::<_, UserMsgId>(
            r#"
            SELECT uid, current_msg_id, total_msg_id
            FROM manager_user_msg_id
            WHERE uid = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to query user msg id: {}", e)))?;

        let watermark = row.ok_or_else(|| {
            ServerError::NotFound(format!("user msg id for uid {}", user_id))
        })?;
        debug!(
            "📊 uid={} 水位: current={}, total={}",
            user_id, watermark.current_msg_id, watermark.total_msg_id
        );
        Ok(watermark)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| ServerError::Database(format!("counter store unavailable: {}", e)))?;
        Ok(())
    }
}

/// 内存计数器存储（用于测试和开发）
#[derive(Default)]
pub struct MemoryCounterStore {
    rows: RwLock<HashMap<i64, UserMsgId>>,
    unavailable: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, watermark: UserMsgId) {
        self.rows.write().insert(watermark.uid, watermark);
    }

    /// 模拟后端不可用，之后所有读取都返回 `ServerError::Database`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServerError::Database("counter store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get_watermark(&self, user_id: i64) -> Result<UserMsgId> {
        self.check_available()?;
        self.rows
            .read()
            .get(&user_id)
            .copied()
            .ok_or_else(|| ServerError::NotFound(format!("user msg id for uid {}", user_id)))
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_counter_roundtrip() {
        let store = MemoryCounterStore::new();
        store.set(UserMsgId::new(42, 5, 7));

        let watermark = store.get_watermark(42).await.unwrap();
        assert_eq!(watermark.current_msg_id, 5);
        assert_eq!(watermark.total_msg_id, 7);
    }

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let store = MemoryCounterStore::new();
        let err = store.get_watermark(1).await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryCounterStore::new();
        store.set(UserMsgId::new(42, 5, 7));
        store.set_unavailable(true);
        assert!(matches!(
            store.get_watermark(42).await,
            Err(ServerError::Database(_))
        ));
        assert!(store.health_check().await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.get_watermark(42).await.unwrap().current_msg_id, 5);
        store.health_check().await.unwrap();
    }
}
