use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrCode;
use crate::model::{OffsetMessage, OfflineMsg};

/// RPC 请求帧
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// 路由路径，格式：manager/module/action
    pub route: String,
    /// 请求参数 JSON
    #[serde(default)]
    pub body: Value,
    /// 调用方给出的截止时间（毫秒），不给则不限时
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// 响应信封
///
/// `err_code == 0` 时 payload 完整可信；否则调用方不应读取 payload 字段。
/// payload 字段平铺在信封上，例如 `{"err_code":0,"err_str":"ok","msgs":[...]}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    pub err_code: u32,
    pub err_str: String,
    #[serde(flatten)]
    pub payload: Option<P>,
}

impl<P> Envelope<P> {
    pub fn ok(payload: P) -> Self {
        Self {
            err_code: ErrCode::Ok.as_u32(),
            err_str: ErrCode::Ok.as_str().to_string(),
            payload: Some(payload),
        }
    }

    /// 错误信封，payload 为空
    pub fn error(code: ErrCode) -> Self {
        Self {
            err_code: code.as_u32(),
            err_str: code.as_str().to_string(),
            payload: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.err_code == ErrCode::Ok.as_u32()
    }
}

/// 无数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// GetOfflineMsgs 返回数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineMsgsPayload {
    pub msgs: Vec<OfflineMsg>,
}

/// Sync 返回数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub p2p_msgs: Vec<OffsetMessage>,
}

/// GetOfflineMsgs 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOfflineMsgsRequest {
    pub uid: i64,
}

/// SetExceptionMsg 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetExceptionMsgRequest {
    pub source_uid: i64,
    pub target_uid: i64,
    pub msg_id: String,
    pub msg: String,
}

/// ExceptionMsg 请求（目前不读取任何字段）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExceptionMsgRequest {
    #[serde(default)]
    pub msg_id: String,
}

/// Sync 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub uid: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_flattens_payload() {
        let envelope = Envelope::ok(SyncPayload::default());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"err_code": 0, "err_str": "ok", "p2p_msgs": []})
        );
    }

    #[test]
    fn test_error_envelope_has_no_payload() {
        let envelope = Envelope::<OfflineMsgsPayload>::error(ErrCode::ServerError);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"err_code": 500, "err_str": "server error"})
        );
        assert!(!envelope.is_ok());
    }

    #[test]
    fn test_request_defaults() {
        let request: RpcRequest = serde_json::from_value(json!({"route": "manager/sync"})).unwrap();
        assert_eq!(request.body, Value::Null);
        assert_eq!(request.timeout_ms, None);
    }
}
