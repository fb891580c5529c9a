use serde::{Deserialize, Serialize};

/// 同步结果中的单条点对点消息（由一行单元格合并而来）
///
/// 未解码到的字段保持零值：列存储本身是稀疏的，这不算错误。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetMessage {
    pub source_uid: i64,
    pub target_uid: i64,
    pub msg_id: String,
    pub msg: String,
}

/// 离线收件箱中的消息（文档存储）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineMsg {
    pub source_uid: i64,
    pub target_uid: i64,
    pub msg_id: String,
    pub msg: String,
}

/// 投递失败的异常消息，整体序列化后按 msg_id 写入缓存
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionMsg {
    pub source_uid: i64,
    pub target_uid: i64,
    pub msg_id: String,
    pub msg: String,
}

impl ExceptionMsg {
    pub fn new(source_uid: i64, target_uid: i64, msg_id: String, msg: String) -> Self {
        Self {
            source_uid,
            target_uid,
            msg_id,
            msg,
        }
    }

    /// 序列化为缓存中保存的 JSON 字符串
    pub fn to_blob(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_blob(blob: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(blob)
    }
}
