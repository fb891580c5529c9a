//! HTTP 路由模块
//!
//! 路由结构：
//! - `POST /rpc`    - RPC 入口（JSON 请求帧 → 响应信封）
//! - `GET /health`  - 存储适配器健康检查
//! - `GET /metrics` - Prometheus 抓取端点

pub mod rpc;
pub mod status;

use axum::Router;

use crate::http::HttpServerState;

/// 创建所有路由
pub fn create_routes() -> Router<HttpServerState> {
    Router::new()
        .merge(rpc::create_route()) // /rpc
        .merge(status::create_route()) // /health, /metrics
}
