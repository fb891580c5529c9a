use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use super::error::RpcResult;
use super::types::{Empty, Envelope, RpcRequest};
use crate::error::ErrCode;
use crate::infra::metrics;

/// RPC 处理函数类型：请求体 → 序列化后的响应信封
pub type RpcHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = RpcResult<Value>> + Send>> + Send + Sync>;

/// RPC 路由器
///
/// 每个服务实例构造一份，启动完成后只读。
#[derive(Clone, Default)]
pub struct RpcRouter {
    routes: HashMap<String, RpcHandler>,
}

impl RpcRouter {
    /// 创建新的路由器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册路由
    pub fn register<F, Fut>(&mut self, route: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<Value>> + Send + 'static,
    {
        let handler: RpcHandler = Arc::new(move |body| Box::pin(handler(body)));
        self.routes.insert(route.to_string(), handler);
    }

    /// 处理 RPC 请求，总是返回一个完整的响应信封
    pub async fn handle(&self, request: RpcRequest) -> Value {
        let started = Instant::now();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("rpc", route = %request.route, %request_id);
        let response = self.dispatch(&request).instrument(span).await;

        let err_code = response
            .get("err_code")
            .and_then(Value::as_u64)
            .unwrap_or(ErrCode::ServerError.as_u32() as u64) as u32;
        metrics::record_rpc(&request.route, err_code, started.elapsed().as_secs_f64());
        debug!(
            "RPC {} [{}] -> err_code={} ({:?})",
            request.route,
            request_id,
            err_code,
            started.elapsed()
        );
        response
    }

    async fn dispatch(&self, request: &RpcRequest) -> Value {
        let Some(handler) = self.routes.get(&request.route) else {
            warn!("⚠️ 未知路由: {}", request.route);
            return error_envelope(ErrCode::RequestError);
        };

        let call = handler(request.body.clone());
        let result = match request.timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("⏱️ RPC 超时: {} ({}ms)", request.route, ms);
                    return error_envelope(ErrCode::ServerError);
                }
            },
            None => call.await,
        };

        match result {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("⚠️ RPC {} 失败: {}", request.route, e);
                error_envelope(e.code)
            }
        }
    }

    /// 获取所有注册的路由
    pub fn list_routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self.routes.keys().cloned().collect();
        routes.sort();
        routes
    }
}

fn error_envelope(code: ErrCode) -> Value {
    let envelope = Envelope::<Empty>::error(code);
    serde_json::json!({
        "err_code": envelope.err_code,
        "err_str": envelope.err_str,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::error::RpcError;
    use serde_json::json;

    fn request(route: &str, timeout_ms: Option<u64>) -> RpcRequest {
        RpcRequest {
            route: route.to_string(),
            body: json!({}),
            timeout_ms,
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_request_error() {
        let router = RpcRouter::new();
        let response = router.handle(request("manager/nope", None)).await;
        assert_eq!(response, json!({"err_code": 400, "err_str": "request error"}));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_envelope() {
        let mut router = RpcRouter::new();
        router.register("manager/fail", |_body| async { Err::<Value, _>(RpcError::server("boom")) });
        let response = router.handle(request("manager/fail", None)).await;
        assert_eq!(response["err_code"], 500);
        // 错误细节不外泄
        assert_eq!(response["err_str"], "server error");
    }

    #[tokio::test]
    async fn test_deadline_exceeded_is_server_error() {
        let mut router = RpcRouter::new();
        router.register("manager/slow", |_body| async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, RpcError>(json!({"err_code": 0, "err_str": "ok"}))
        });
        let response = router.handle(request("manager/slow", Some(20))).await;
        assert_eq!(response["err_code"], 500);

        let response = router.handle(request("manager/slow", None)).await;
        assert_eq!(response["err_code"], 0);
    }
}
