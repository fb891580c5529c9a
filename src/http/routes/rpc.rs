//! POST /rpc - JSON RPC 入口
//!
//! 请求帧 `{route, body, timeout_ms?}`；任何情况下都返回 HTTP 200 和一个响应信封，
//! 调用方只看 `err_code`。

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde_json::Value;
use tracing::warn;

use crate::error::ErrCode;
use crate::http::HttpServerState;
use crate::rpc::{Empty, Envelope, RpcRequest};

pub fn create_route() -> Router<HttpServerState> {
    Router::new().route("/rpc", post(rpc_handler))
}

async fn rpc_handler(State(state): State<HttpServerState>, body: Bytes) -> Json<Value> {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("⚠️ 无法解析 RPC 请求帧: {}", e);
            let envelope = Envelope::<Empty>::error(ErrCode::RequestError);
            return Json(serde_json::json!({
                "err_code": envelope.err_code,
                "err_str": envelope.err_str,
            }));
        }
    };

    Json(state.router.handle(request).await)
}
