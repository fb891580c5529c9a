use serde::{Deserialize, Serialize};

/// 用户消息水位（计数器存储中的一行）
///
/// - `current_msg_id`: 客户端最后确认的消息 ID
/// - `total_msg_id`: 为该用户生成的最新消息 ID
///
/// 只由外部写路径维护，这里只读。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserMsgId {
    pub uid: i64,
    pub current_msg_id: i64,
    pub total_msg_id: i64,
}

impl UserMsgId {
    pub fn new(uid: i64, current_msg_id: i64, total_msg_id: i64) -> Self {
        Self {
            uid,
            current_msg_id,
            total_msg_id,
        }
    }

    /// 是否有待同步的离线消息
    pub fn has_pending(&self) -> bool {
        self.current_msg_id < self.total_msg_id
    }

    /// 需要扫描的消息 ID 区间（含两端）
    ///
    /// 没有待同步消息时返回空区间，`current > total` 也视为空区间而不是错误。
    pub fn pending_range(&self) -> std::ops::RangeInclusive<i64> {
        if self.has_pending() {
            self.current_msg_id..=self.total_msg_id
        } else {
            // 空区间
            1..=0
        }
    }
}
