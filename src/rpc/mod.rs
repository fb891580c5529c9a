pub mod error;
pub mod manager;
pub mod router;
pub mod types;

use std::sync::Arc;

pub use error::{RpcError, RpcResult};
pub use manager::ManagerRpcService;
pub use router::RpcRouter;
pub use types::{Empty, Envelope, OfflineMsgsPayload, RpcRequest, SyncPayload};

/// 构造本实例的 RPC 路由表
pub fn build_router(service: Arc<ManagerRpcService>) -> RpcRouter {
    let mut router = RpcRouter::new();
    service.register_routes(&mut router);
    tracing::info!("✅ RPC 路由已注册: {:?}", router.list_routes());
    router
}
