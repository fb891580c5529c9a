//! 服务注册
//!
//! 启动时把本服务的 RPC 地址以租约方式写入 etcd，并在后台按心跳间隔续约。
//! 续约失败只记录日志并重试建立 keep-alive 流，不影响请求处理。
//! etcd 实现需要 `etcd` feature。

#[cfg(feature = "etcd")]
use std::sync::Arc;
#[cfg(feature = "etcd")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "etcd")]
use etcd_client::{Client, LeaseGrantOptions, PutOptions};
use serde::{Deserialize, Serialize};
#[cfg(feature = "etcd")]
use tokio::sync::Mutex;
#[cfg(feature = "etcd")]
use tokio::task::JoinHandle;
#[cfg(feature = "etcd")]
use tracing::{debug, info};
use tracing::warn;

use crate::config::ServiceDiscoveryConfig;
use crate::error::Result;
#[cfg(feature = "etcd")]
use crate::error::ServerError;

/// 注册信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRegistration {
    /// 服务名
    pub name: String,
    /// 对外公布的 RPC 地址
    pub rpc_addr: String,
    /// 注册中心地址
    pub registry_addr: String,
    /// 心跳间隔（秒）
    pub interval_secs: u64,
    /// 租约 TTL（秒）
    pub ttl_secs: u64,
}

impl ServiceRegistration {
    pub fn from_config(config: &ServiceDiscoveryConfig, rpc_addr: String) -> Self {
        Self {
            name: config.service_name.clone(),
            rpc_addr,
            registry_addr: config.etcd_addr.clone(),
            interval_secs: config.interval_secs,
            ttl_secs: config.ttl_secs,
        }
    }
}

/// 服务注册器
#[async_trait]
pub trait ServiceRegistrar: Send + Sync {
    /// 注册服务，失败时调用方应中止启动
    async fn register(&self, registration: &ServiceRegistration) -> Result<()>;

    /// 注销服务（进程退出时调用）
    async fn deregister(&self) -> Result<()>;
}

/// 不做任何注册（本地调试，`--no-register`）
pub struct NoopRegistrar;

#[async_trait]
impl ServiceRegistrar for NoopRegistrar {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        warn!(
            "⚠️ 服务发现已禁用，跳过注册: {} -> {}",
            registration.name, registration.rpc_addr
        );
        Ok(())
    }

    async fn deregister(&self) -> Result<()> {
        Ok(())
    }
}

/// 基于 etcd 租约的服务注册器
#[cfg(feature = "etcd")]
pub struct EtcdRegistrar {
    client: Arc<Mutex<Client>>,
    key_prefix: String,
    lease_id: Mutex<Option<i64>>,
    keep_alive_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

#[cfg(feature = "etcd")]
impl EtcdRegistrar {
    /// 连接 etcd
    pub async fn connect(etcd_addr: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let endpoints: Vec<&str> = etcd_addr
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let client = Client::connect(endpoints, None).await?;
        info!("🔗 已连接 etcd: {}", etcd_addr);
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
            key_prefix: key_prefix.into(),
            lease_id: Mutex::new(None),
            keep_alive_handle: parking_lot::Mutex::new(None),
        })
    }

    /// 注册 key：{prefix}/{name}/{rpc_addr}
    pub fn service_key(prefix: &str, registration: &ServiceRegistration) -> String {
        format!(
            "{}/{}/{}",
            prefix.trim_end_matches('/'),
            registration.name,
            registration.rpc_addr
        )
    }

    fn spawn_keep_alive(&self, lease_id: i64, interval: Duration) -> JoinHandle<()> {
        let client = self.client.clone();
        tokio::spawn(async move {
            loop {
                let result = {
                    let mut c = client.lock().await;
                    c.lease_keep_alive(lease_id).await
                };
                match result {
                    Ok((mut keeper, mut stream)) => loop {
                        tokio::time::sleep(interval).await;
                        if let Err(e) = keeper.keep_alive().await {
                            warn!(lease_id, error = %e, "etcd 续约失败，重建 keep-alive");
                            break;
                        }
                        match stream.message().await {
                            Ok(Some(resp)) => {
                                debug!(lease_id, ttl = resp.ttl(), "etcd 续约成功");
                            }
                            Ok(None) => {
                                warn!(lease_id, "etcd keep-alive 流已结束");
                                break;
                            }
                            Err(e) => {
                                warn!(lease_id, error = %e, "etcd keep-alive 流错误");
                                break;
                            }
                        }
                    },
                    Err(e) => {
                        warn!(lease_id, error = %e, "建立 etcd keep-alive 失败");
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        })
    }
}

#[cfg(feature = "etcd")]
#[async_trait]
impl ServiceRegistrar for EtcdRegistrar {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        if registration.ttl_secs <= registration.interval_secs {
            return Err(ServerError::Configuration(format!(
                "lease ttl ({}s) must exceed heartbeat interval ({}s)",
                registration.ttl_secs, registration.interval_secs
            )));
        }

        let key = Self::service_key(&self.key_prefix, registration);
        let lease_id = {
            let mut client = self.client.lock().await;
            let lease = client
                .lease_grant(registration.ttl_secs as i64, None::<LeaseGrantOptions>)
                .await?;
            let lease_id = lease.id();
            client
                .put(
                    key.clone(),
                    registration.rpc_addr.clone(),
                    Some(PutOptions::new().with_lease(lease_id)),
                )
                .await?;
            lease_id
        };

        *self.lease_id.lock().await = Some(lease_id);
        let handle =
            self.spawn_keep_alive(lease_id, Duration::from_secs(registration.interval_secs));
        if let Some(old) = self.keep_alive_handle.lock().replace(handle) {
            old.abort();
        }

        info!(
            "✅ 服务已注册: {} (lease={}, ttl={}s, interval={}s)",
            key, lease_id, registration.ttl_secs, registration.interval_secs
        );
        Ok(())
    }

    async fn deregister(&self) -> Result<()> {
        if let Some(handle) = self.keep_alive_handle.lock().take() {
            handle.abort();
        }
        if let Some(lease_id) = self.lease_id.lock().await.take() {
            let mut client = self.client.lock().await;
            client.lease_revoke(lease_id).await?;
            info!("🔌 已撤销服务租约: {}", lease_id);
        }
        Ok(())
    }
}

#[cfg(feature = "etcd")]
impl Drop for EtcdRegistrar {
    fn drop(&mut self) {
        if let Some(handle) = self.keep_alive_handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ServiceRegistration {
        ServiceRegistration {
            name: "manager_server".to_string(),
            rpc_addr: "10.0.0.3:9090".to_string(),
            registry_addr: "http://127.0.0.1:2379".to_string(),
            interval_secs: 5,
            ttl_secs: 15,
        }
    }

    #[cfg(feature = "etcd")]
    #[test]
    fn test_service_key_layout() {
        assert_eq!(
            EtcdRegistrar::service_key("/privchat/services/", &registration()),
            "/privchat/services/manager_server/10.0.0.3:9090"
        );
    }

    #[tokio::test]
    async fn test_noop_registrar_always_succeeds() {
        let registrar = NoopRegistrar;
        registrar.register(&registration()).await.unwrap();
        registrar.deregister().await.unwrap();
    }
}
