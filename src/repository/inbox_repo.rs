//! 离线收件箱 - 按接收方批量读取排队中的离线消息
//!
//! 生产环境为 PostgreSQL 表 `manager_offline_msgs`，每条消息以 JSONB 文档保存。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::model::OfflineMsg;

/// 离线收件箱存储
#[async_trait]
pub trait InboxStore: Send + Sync {
    /// 读取用户的全部离线消息（按入队顺序，不去重、不截断）
    async fn get_inbox(&self, user_id: i64) -> Result<Vec<OfflineMsg>>;

    /// 健康检查
    async fn health_check(&self) -> Result<()>;
}

/// 离线收件箱 (PostgreSQL 实现)
#[derive(Clone)]
pub struct PgInboxStore {
    pool: Arc<PgPool>,
}

impl PgInboxStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InboxStore for PgInboxStore {
    async fn get_inbox(&self, user_id: i64) -> Result<Vec<OfflineMsg>> {
        let docs: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT doc
            FROM manager_offline_msgs
            WHERE target_uid = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| ServerError::Database(format!("Failed to query offline msgs: {}", e)))?;

        // 任意一条文档无法解析都视为数据损坏，整个调用失败
        let messages = docs
            .into_iter()
            .map(|(doc,)| serde_json::from_value::<OfflineMsg>(doc))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("📬 uid={} 离线消息 {} 条", user_id, messages.len());
        Ok(messages)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| ServerError::Database(format!("inbox store unavailable: {}", e)))?;
        Ok(())
    }
}

/// 内存收件箱（用于测试和开发）
#[derive(Default)]
pub struct MemoryInboxStore {
    inboxes: DashMap<i64, Vec<OfflineMsg>>,
    unavailable: AtomicBool,
}

impl MemoryInboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: OfflineMsg) {
        self.inboxes
            .entry(message.target_uid)
            .or_default()
            .push(message);
    }

    /// 模拟后端不可用
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ServerError::Database("inbox store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl InboxStore for MemoryInboxStore {
    async fn get_inbox(&self, user_id: i64) -> Result<Vec<OfflineMsg>> {
        self.check_available()?;
        Ok(self
            .inboxes
            .get(&user_id)
            .map(|inbox| inbox.value().clone())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<()> {
        self.check_available()
    }
}
