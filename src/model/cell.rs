//! 列存储单元格
//!
//! 行键为 `"{user_id}_{msg_id}"`，每行包含零个或多个 (family, qualifier) → 原始字节 的单元格。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 列族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    User,
    Msg,
}

impl Family {
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Family::User => b"user",
            Family::Msg => b"msg",
        }
    }
}

/// 列限定符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    SourceUid,
    TargetUid,
    MsgId,
    Msg,
}

impl Qualifier {
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Qualifier::SourceUid => b"source_uid",
            Qualifier::TargetUid => b"target_uid",
            Qualifier::MsgId => b"msg_id",
            Qualifier::Msg => b"msg",
        }
    }
}

/// 单元格
///
/// family / qualifier 保留原始字节，未知组合也能原样表示（由解码器忽略）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub family: Bytes,
    pub qualifier: Bytes,
    pub value: Bytes,
}

impl Cell {
    pub fn new(
        family: impl Into<Bytes>,
        qualifier: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }

    /// 用已知列族/限定符构造
    pub fn typed(family: Family, qualifier: Qualifier, value: impl Into<Bytes>) -> Self {
        Self::new(
            Bytes::from_static(family.as_bytes()),
            Bytes::from_static(qualifier.as_bytes()),
            value,
        )
    }
}

/// 组合行键
pub fn row_key(user_id: i64, msg_id: i64) -> String {
    format!("{}_{}", user_id, msg_id)
}
