//! 存储适配器
//!
//! 四种存储各自暴露一个窄接口（trait），错误统一为 `ServerError`；
//! 每种存储都有生产实现与内存实现，内存实现用于测试和本地开发。

pub mod column_repo;
pub mod counter_repo;
pub mod exception_cache;
pub mod inbox_repo;

pub use column_repo::{ColumnStore, MemoryColumnStore, SledColumnStore};
pub use counter_repo::{CounterStore, MemoryCounterStore, PgCounterStore};
pub use exception_cache::{CacheStore, MokaCacheStore, RedisCacheStore};
pub use inbox_repo::{InboxStore, MemoryInboxStore, PgInboxStore};
