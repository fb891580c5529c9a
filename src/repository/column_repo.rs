//! 列存储 - 按行键读取消息单元格
//!
//! 生产环境为 sled（一个 tree 存全部单元格），键布局：
//!
//! ```text
//! {row_key}/{family}:{qualifier} -> value
//! ```
//!
//! 同一行的单元格共享前缀 `{row_key}/`，读取时按前缀扫描。

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};
use crate::model::Cell;

/// 列存储
#[async_trait]
pub trait ColumnStore: Send + Sync {
    /// 读取一行的全部单元格，行不存在时返回空列表
    async fn get_cells(&self, row_key: &str) -> Result<Vec<Cell>>;

    /// 健康检查
    async fn health_check(&self) -> Result<()>;
}

/// Sled 列存储
pub struct SledColumnStore {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledColumnStore {
    /// 打开（或创建）列存储
    pub fn open(path: impl AsRef<Path>, tree: &str) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            ServerError::Storage(format!(
                "Failed to open sled database at {}: {}",
                path.display(),
                e
            ))
        })?;
        let tree = db
            .open_tree(tree)
            .map_err(|e| ServerError::Storage(format!("Failed to open tree {}: {}", tree, e)))?;
        info!("📦 列存储已打开: {} (tree={})", path.display(), String::from_utf8_lossy(&tree.name()));
        Ok(Self { db, tree })
    }

    fn cell_key(row_key: &str, family: &[u8], qualifier: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(row_key.len() + family.len() + qualifier.len() + 2);
        key.extend_from_slice(row_key.as_bytes());
        key.push(b'/');
        key.extend_from_slice(family);
        key.push(b':');
        key.extend_from_slice(qualifier);
        key
    }

    fn row_prefix(row_key: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(row_key.len() + 1);
        prefix.extend_from_slice(row_key.as_bytes());
        prefix.push(b'/');
        prefix
    }

    /// 写入单元格（外部写路径 / 测试数据准备）
    pub fn put_cell(&self, row_key: &str, cell: &Cell) -> Result<()> {
        let key = Self::cell_key(row_key, &cell.family, &cell.qualifier);
        self.tree.insert(key, cell.value.as_ref())?;
        Ok(())
    }

    /// 刷盘
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl ColumnStore for SledColumnStore {
    async fn get_cells(&self, row_key: &str) -> Result<Vec<Cell>> {
        let prefix = Self::row_prefix(row_key);
        let mut cells = Vec::new();

        for item in self.tree.scan_prefix(&prefix) {
            let (key, value) = item?;
            let column = &key[prefix.len()..];
            let Some(split) = column.iter().position(|b| *b == b':') else {
                warn!("⚠️ 跳过格式错误的列键: row={}", row_key);
                continue;
            };
            cells.push(Cell::new(
                Bytes::copy_from_slice(&column[..split]),
                Bytes::copy_from_slice(&column[split + 1..]),
                Bytes::copy_from_slice(&value),
            ));
        }

        debug!("Retrieved {} cells for row {} from Sled", cells.len(), row_key);
        Ok(cells)
    }

    async fn health_check(&self) -> Result<()> {
        // 实际读一次 tree，IO 错误向上传递
        self.tree.first()?;
        Ok(())
    }
}

/// 内存列存储（用于测试和开发）
///
/// 支持按行注入读取失败与读取延迟。
#[derive(Default)]
pub struct MemoryColumnStore {
    rows: RwLock<HashMap<String, Vec<Cell>>>,
    failing_rows: RwLock<HashSet<String>>,
    delays: RwLock<HashMap<String, Duration>>,
}

impl MemoryColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_cell(&self, row_key: &str, cell: Cell) {
        self.rows
            .write()
            .entry(row_key.to_string())
            .or_default()
            .push(cell);
    }

    /// 之后读取该行返回 `ServerError::Storage`
    pub fn fail_row(&self, row_key: &str) {
        self.failing_rows.write().insert(row_key.to_string());
    }

    /// 读取该行前先等待一段时间
    pub fn delay_row(&self, row_key: &str, delay: Duration) {
        self.delays.write().insert(row_key.to_string(), delay);
    }
}

#[async_trait]
impl ColumnStore for MemoryColumnStore {
    async fn get_cells(&self, row_key: &str) -> Result<Vec<Cell>> {
        let delay = self.delays.read().get(row_key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_rows.read().contains(row_key) {
            return Err(ServerError::Storage(format!("injected failure for row {}", row_key)));
        }
        Ok(self.rows.read().get(row_key).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Family, Qualifier};

    #[tokio::test]
    async fn test_sled_prefix_scan_is_row_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledColumnStore::open(dir.path().join("cells"), "p2p_msgs").unwrap();

        store
            .put_cell("42_5", &Cell::typed(Family::Msg, Qualifier::Msg, "hi"))
            .unwrap();
        store
            .put_cell("42_5", &Cell::typed(Family::User, Qualifier::SourceUid, 7i64.to_be_bytes().to_vec()))
            .unwrap();
        // 共享数字前缀但属于另一行
        store
            .put_cell("42_50", &Cell::typed(Family::Msg, Qualifier::Msg, "other"))
            .unwrap();

        let cells = store.get_cells("42_5").await.unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.value.as_ref() != b"other"));

        let msg = cells
            .iter()
            .find(|c| c.family.as_ref() == b"msg")
            .unwrap();
        assert_eq!(msg.qualifier.as_ref(), b"msg");
        assert_eq!(msg.value.as_ref(), b"hi");
    }

    #[tokio::test]
    async fn test_sled_missing_row_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledColumnStore::open(dir.path().join("cells"), "p2p_msgs").unwrap();
        assert!(store.get_cells("1_1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sled_health_check_reads_tree() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledColumnStore::open(dir.path().join("cells"), "p2p_msgs").unwrap();
        store.health_check().await.unwrap();

        store
            .put_cell("9_1", &Cell::typed(Family::Msg, Qualifier::Msg, "x"))
            .unwrap();
        store.flush().await.unwrap();
        store.health_check().await.unwrap();
    }

    #[test]
    fn test_sled_open_on_file_path_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(SledColumnStore::open(file.path(), "p2p_msgs").is_err());
    }

    #[tokio::test]
    async fn test_memory_injected_failure() {
        let store = MemoryColumnStore::new();
        store.put_cell("1_2", Cell::typed(Family::Msg, Qualifier::Msg, "x"));
        store.fail_row("1_2");
        assert!(matches!(
            store.get_cells("1_2").await,
            Err(ServerError::Storage(_))
        ));
        assert!(store.get_cells("1_3").await.unwrap().is_empty());
    }
}
