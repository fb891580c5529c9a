//! 离线消息同步服务
//!
//! 职责：
//! - 读取用户消息水位（current / total）
//! - 逐个消息 ID 从列存储取出单元格并合并成消息
//! - 单个 ID 读取失败只记录并跳过，不影响整次同步

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::codec;
use crate::dao::Dao;
use crate::error::Result;
use crate::infra::metrics;
use crate::model::{row_key, Cell, OffsetMessage};
use crate::repository::{ColumnStore, CounterStore};

/// 一次同步的结果
///
/// `skipped_ids` 只记录读取失败的 ID；行不存在或没有可识别字段的 ID 不计入。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub messages: Vec<OffsetMessage>,
    pub skipped_ids: Vec<i64>,
}

/// 同步服务
pub struct SyncService {
    counter: Arc<dyn CounterStore>,
    column: Arc<dyn ColumnStore>,
    /// 同时在途的列存储读取数
    concurrency: usize,
}

impl SyncService {
    pub fn new(dao: &Dao, concurrency: usize) -> Self {
        Self {
            counter: dao.counter().clone(),
            column: dao.column().clone(),
            concurrency: concurrency.max(1),
        }
    }

    /// 同步用户的离线消息
    ///
    /// 只有读取水位失败会返回错误；结果按消息 ID 升序排列。
    pub async fn sync(&self, user_id: i64) -> Result<SyncOutcome> {
        let watermark = self.counter.get_watermark(user_id).await.map_err(|e| {
            error!("❌ 读取消息水位失败: uid={}, error={}", user_id, e);
            metrics::record_backend_error("counter_store");
            e
        })?;

        if !watermark.has_pending() {
            debug!(
                "uid={} 无待同步消息 (current={}, total={})",
                user_id, watermark.current_msg_id, watermark.total_msg_id
            );
            return Ok(SyncOutcome::default());
        }

        let column = &self.column;
        // buffered 按输入顺序产出结果，并发读取不会打乱 ID 顺序
        let fetched: Vec<(i64, Result<Vec<Cell>>)> = stream::iter(watermark.pending_range())
            .map(|msg_id| async move {
                let row = row_key(user_id, msg_id);
                (msg_id, column.get_cells(&row).await)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let outcome = fetched
            .into_iter()
            .fold(SyncOutcome::default(), |mut outcome, (msg_id, result)| {
                match result {
                    Ok(cells) => {
                        if let Some(message) = assemble_row(user_id, msg_id, &cells) {
                            outcome.messages.push(message);
                        }
                    }
                    Err(e) => {
                        warn!("⚠️ 跳过消息: uid={}, msg_id={}, error={}", user_id, msg_id, e);
                        metrics::record_backend_error("column_store");
                        outcome.skipped_ids.push(msg_id);
                    }
                }
                outcome
            });

        info!(
            "🔄 uid={} 同步完成: range={}..={}, messages={}, skipped={}",
            user_id,
            watermark.current_msg_id,
            watermark.total_msg_id,
            outcome.messages.len(),
            outcome.skipped_ids.len()
        );
        metrics::record_sync(outcome.messages.len(), outcome.skipped_ids.len());
        Ok(outcome)
    }
}

/// 把一行的全部单元格合并成一条消息
///
/// 一个可识别字段都没有时返回 None；格式错误的单元格记录后忽略。
fn assemble_row(user_id: i64, msg_id: i64, cells: &[Cell]) -> Option<OffsetMessage> {
    let mut message = OffsetMessage::default();
    let mut decoded = false;

    for cell in cells {
        match codec::merge_cell(&mut message, cell) {
            Ok(merged) => decoded |= merged,
            Err(e) => {
                warn!("⚠️ 单元格解码失败: row={}, error={}", row_key(user_id, msg_id), e);
            }
        }
    }

    decoded.then_some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Family, Qualifier};

    #[test]
    fn test_assemble_row_without_known_fields() {
        let cells = vec![Cell::new("meta", "flags", "x")];
        assert_eq!(assemble_row(1, 2, &cells), None);
        assert_eq!(assemble_row(1, 2, &[]), None);
    }

    #[test]
    fn test_assemble_row_skips_malformed_cell() {
        let cells = vec![
            Cell::typed(Family::User, Qualifier::SourceUid, vec![1u8, 2, 3]),
            Cell::typed(Family::Msg, Qualifier::Msg, "hello"),
        ];
        let message = assemble_row(1, 2, &cells).unwrap();
        assert_eq!(message.source_uid, 0);
        assert_eq!(message.msg, "hello");
    }
}
