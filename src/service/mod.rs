// 业务服务层模块
pub mod sync_service;

pub use sync_service::{SyncOutcome, SyncService};
