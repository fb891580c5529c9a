// Infrastructure layer - 基础设施层
// 负责数据库连接池、Redis 连接池、监控指标与服务注册

pub mod database;
pub mod metrics;
pub mod redis;
pub mod service_registry;

pub use database::{mask_database_url, Database};
pub use redis::RedisClient;
#[cfg(feature = "etcd")]
pub use service_registry::EtcdRegistrar;
pub use service_registry::{NoopRegistrar, ServiceRegistrar, ServiceRegistration};
