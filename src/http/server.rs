//! HTTP 服务器 - 使用 Axum 承载 RPC 入口

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dao::Dao;
use crate::http::routes;
use crate::rpc::RpcRouter;

/// HTTP 服务器共享状态
#[derive(Clone)]
pub struct HttpServerState {
    pub router: Arc<RpcRouter>,
    pub dao: Dao,
}

/// RPC HTTP 服务器
pub struct RpcHttpServer {
    state: HttpServerState,
}

impl RpcHttpServer {
    pub fn new(router: Arc<RpcRouter>, dao: Dao) -> Self {
        Self {
            state: HttpServerState { router, dao },
        }
    }

    /// 构建路由
    pub fn app(&self) -> Router {
        Router::new()
            .merge(routes::create_routes())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// 在已绑定的监听器上提供服务，直到 `shutdown` 完成
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!("🌐 RPC 服务器启动在 {}", addr);
        }
        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown)
            .await
    }
}
