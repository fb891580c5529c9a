//! 数据模型模块

pub mod cell;
pub mod message;
pub mod watermark;

// 重新导出常用类型
pub use cell::{row_key, Cell, Family, Qualifier};
pub use message::{ExceptionMsg, OffsetMessage, OfflineMsg};
pub use watermark::UserMsgId;
