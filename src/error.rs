use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 服务器错误类型
///
/// 各存储后端的错误模型不同，这里统一收敛为一套内部错误，
/// 对外只通过 RPC 网关转换成响应信封中的错误码。
#[derive(Debug, Clone, Error)]
pub enum ServerError {
    /// 数据库错误（计数器 / 收件箱）
    #[error("Database error: {0}")]
    Database(String),
    /// 列存储错误
    #[error("Storage error: {0}")]
    Storage(String),
    /// 缓存错误
    #[error("Cache error: {0}")]
    Cache(String),
    /// 资源未找到
    #[error("Not found: {0}")]
    NotFound(String),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),
    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// 服务发现错误
    #[error("Service discovery error: {0}")]
    Discovery(String),
    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// 是否为后端不可用类错误（连接、超时、数据损坏）
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            ServerError::Database(_)
                | ServerError::Storage(_)
                | ServerError::Cache(_)
                | ServerError::NotFound(_)
                | ServerError::Timeout(_)
        )
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Serialization(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ServerError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ServerError::Timeout(err.to_string())
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServerError::NotFound("row not found".to_string()),
            other => ServerError::Database(other.to_string()),
        }
    }
}

impl From<sled::Error> for ServerError {
    fn from(err: sled::Error) -> Self {
        ServerError::Storage(err.to_string())
    }
}

impl From<redis::RedisError> for ServerError {
    fn from(err: redis::RedisError) -> Self {
        ServerError::Cache(err.to_string())
    }
}

#[cfg(feature = "etcd")]
impl From<etcd_client::Error> for ServerError {
    fn from(err: etcd_client::Error) -> Self {
        ServerError::Discovery(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServerError>;

/// 响应错误码
///
/// 与调用方共享的错误码表，`Ok` 永远是 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrCode {
    /// 成功
    Ok = 0,
    /// 请求帧错误（未知路由 / 无法解析的请求体）
    RequestError = 400,
    /// 服务端错误（后端不可用、编码失败）
    ServerError = 500,
}

impl ErrCode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// 错误码对应的固定描述
    pub fn as_str(self) -> &'static str {
        match self {
            ErrCode::Ok => "ok",
            ErrCode::RequestError => "request error",
            ErrCode::ServerError => "server error",
        }
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(ErrCode::Ok),
            400 => Some(ErrCode::RequestError),
            500 => Some(ErrCode::ServerError),
            _ => None,
        }
    }
}

impl From<&ServerError> for ErrCode {
    fn from(_error: &ServerError) -> Self {
        // 后端细节不向调用方暴露，统一为 ServerError
        ErrCode::ServerError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_err_code_registry() {
        assert_eq!(ErrCode::Ok.as_u32(), 0);
        assert_eq!(ErrCode::ServerError.as_str(), "server error");
        assert_eq!(ErrCode::from_u32(500), Some(ErrCode::ServerError));
        assert_eq!(ErrCode::from_u32(7), None);
    }

    #[test]
    fn test_every_server_error_maps_to_server_error_code() {
        let errors = [
            ServerError::Database("down".into()),
            ServerError::Serialization("bad".into()),
            ServerError::Timeout("slow".into()),
        ];
        for e in &errors {
            assert_eq!(ErrCode::from(e), ErrCode::ServerError);
        }
    }

    #[test]
    fn test_row_not_found_is_not_found() {
        let err: ServerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ServerError::NotFound(_)));
        assert!(err.is_backend());
    }
}
