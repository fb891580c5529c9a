//! 消息管理服务器
//!
//! 启动顺序：绑定监听地址 → 构造数据访问层（失败即退出）→ 注册服务发现 → 提供服务。
//! Ctrl+C 后停止接收新请求并撤销服务发现租约。

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::dao::Dao;
use crate::error::ServerError;
use crate::http::RpcHttpServer;
use crate::config::ServiceDiscoveryConfig;
#[cfg(feature = "etcd")]
use crate::infra::EtcdRegistrar;
use crate::infra::{NoopRegistrar, ServiceRegistrar, ServiceRegistration};
use crate::rpc::{build_router, ManagerRpcService, RpcRouter};

#[cfg(feature = "etcd")]
async fn connect_registrar(
    sd: &ServiceDiscoveryConfig,
) -> Result<Arc<dyn ServiceRegistrar>, ServerError> {
    let registrar = EtcdRegistrar::connect(&sd.etcd_addr, sd.key_prefix.clone())
        .await
        .map_err(|e| {
            error!("❌ 连接服务发现失败: {}", e);
            e
        })?;
    Ok(Arc::new(registrar))
}

#[cfg(not(feature = "etcd"))]
async fn connect_registrar(
    sd: &ServiceDiscoveryConfig,
) -> Result<Arc<dyn ServiceRegistrar>, ServerError> {
    error!("❌ 未编译 etcd 支持，无法注册到 {}", sd.etcd_addr);
    Err(ServerError::Configuration(
        "service discovery requires the `etcd` feature".to_string(),
    ))
}

/// 消息管理服务器
pub struct ManagerServer {
    config: ServerConfig,
    listener: TcpListener,
    dao: Dao,
    router: Arc<RpcRouter>,
    registrar: Arc<dyn ServiceRegistrar>,
}

impl ManagerServer {
    /// 按配置完成启动前的全部准备，任何一步失败都返回错误
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let bind_address = config.bind_address();
        let listener = TcpListener::bind(&bind_address).await.map_err(|e| {
            error!("❌ 绑定监听地址失败: {}: {}", bind_address, e);
            ServerError::Internal(format!("failed to bind {}: {}", bind_address, e))
        })?;
        info!("🔌 已绑定监听地址: {}", bind_address);

        let dao = Dao::connect(&config).await?;

        let registrar: Arc<dyn ServiceRegistrar> = if config.service_discovery.enabled {
            connect_registrar(&config.service_discovery).await?
        } else {
            Arc::new(NoopRegistrar)
        };

        Self::from_parts(config, listener, dao, registrar).await
    }

    /// 用现成的监听器、数据访问层与注册器组装服务器，并完成服务注册
    pub async fn from_parts(
        config: ServerConfig,
        listener: TcpListener,
        dao: Dao,
        registrar: Arc<dyn ServiceRegistrar>,
    ) -> Result<Self, ServerError> {
        let service = Arc::new(ManagerRpcService::new(dao.clone(), config.sync.concurrency));
        let router = Arc::new(build_router(service));

        let registration = ServiceRegistration::from_config(
            &config.service_discovery,
            config.advertised_rpc_addr(),
        );
        registrar.register(&registration).await.map_err(|e| {
            error!("❌ 服务注册失败: {}", e);
            e
        })?;

        Ok(Self {
            config,
            listener,
            dao,
            router,
            registrar,
        })
    }

    /// 实际监听地址
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// 运行服务器，直到收到 Ctrl+C
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("🛑 收到停止信号，正在关闭..."),
                Err(e) => error!("❌ 监听停止信号失败: {}", e),
            }
        };
        self.run_until(shutdown).await
    }

    /// 运行服务器，直到 `shutdown` 完成
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.config.enable_metrics {
            match crate::infra::metrics::init() {
                Ok(()) => info!("📊 Prometheus 指标已启用，GET /metrics 可用"),
                // 已初始化（同进程内多次启动），忽略
                Err(e) => warn!("⚠️ Prometheus 指标未重新初始化: {}", e),
            }
        }

        info!(
            "🚀 消息管理服务已启动: {} (advertised={})",
            self.config.bind_address(),
            self.config.advertised_rpc_addr()
        );

        let http_server = RpcHttpServer::new(self.router.clone(), self.dao.clone());
        let served = http_server.serve(self.listener, shutdown).await;

        if let Err(e) = self.registrar.deregister().await {
            warn!("⚠️ 撤销服务注册失败: {}", e);
        }

        served.map_err(|e| ServerError::Internal(format!("rpc server failed: {}", e)))?;
        info!("✅ 消息管理服务已停止");
        Ok(())
    }
}
