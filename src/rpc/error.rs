use std::fmt;

use crate::error::{ErrCode, ServerError};

/// RPC 错误
///
/// `message` 只用于日志，不写入响应信封。
#[derive(Debug, Clone)]
pub struct RpcError {
    pub code: ErrCode,
    pub message: String,
}

impl RpcError {
    /// 请求帧错误（请求体无法解析）
    pub fn request<S: Into<String>>(msg: S) -> Self {
        Self {
            code: ErrCode::RequestError,
            message: msg.into(),
        }
    }

    /// 服务端错误
    pub fn server<S: Into<String>>(msg: S) -> Self {
        Self {
            code: ErrCode::ServerError,
            message: msg.into(),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_u32(), self.message)
    }
}

impl std::error::Error for RpcError {}

/// RPC 结果类型
pub type RpcResult<T> = Result<T, RpcError>;

impl From<ServerError> for RpcError {
    fn from(err: ServerError) -> Self {
        RpcError {
            code: ErrCode::from(&err),
            message: err.to_string(),
        }
    }
}
