//! 单元格解码
//!
//! 把 (family, qualifier, value) 解码为对 [`OffsetMessage`] 的字段更新。
//! 分发通过查表完成，未登记的 (family, qualifier) 组合直接忽略，
//! 新增列不会导致旧版本解码失败。

use thiserror::Error;

use crate::model::{Cell, Family, OffsetMessage, Qualifier};

/// 解码错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// 数值列不是 8 字节大端整数
    #[error("invalid i64 cell {family}:{qualifier}: expected 8 bytes, got {len}")]
    InvalidInt {
        family: String,
        qualifier: String,
        len: usize,
    },
}

/// 单个字段更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    SourceUid(i64),
    TargetUid(i64),
    MsgId(String),
    Msg(String),
}

impl FieldUpdate {
    /// 写入累加器
    pub fn apply(self, message: &mut OffsetMessage) {
        match self {
            FieldUpdate::SourceUid(v) => message.source_uid = v,
            FieldUpdate::TargetUid(v) => message.target_uid = v,
            FieldUpdate::MsgId(v) => message.msg_id = v,
            FieldUpdate::Msg(v) => message.msg = v,
        }
    }
}

type FieldDecoder = fn(&[u8]) -> Result<FieldUpdate, CodecError>;

/// (family, qualifier) → 字段解码器
const FIELD_TABLE: &[(Family, Qualifier, FieldDecoder)] = &[
    (Family::User, Qualifier::SourceUid, decode_source_uid),
    (Family::User, Qualifier::TargetUid, decode_target_uid),
    (Family::Msg, Qualifier::MsgId, decode_msg_id),
    (Family::Msg, Qualifier::Msg, decode_msg),
];

fn decode_source_uid(value: &[u8]) -> Result<FieldUpdate, CodecError> {
    decode_i64(Family::User, Qualifier::SourceUid, value).map(FieldUpdate::SourceUid)
}

fn decode_target_uid(value: &[u8]) -> Result<FieldUpdate, CodecError> {
    decode_i64(Family::User, Qualifier::TargetUid, value).map(FieldUpdate::TargetUid)
}

fn decode_msg_id(value: &[u8]) -> Result<FieldUpdate, CodecError> {
    Ok(FieldUpdate::MsgId(decode_text(value)))
}

fn decode_msg(value: &[u8]) -> Result<FieldUpdate, CodecError> {
    Ok(FieldUpdate::Msg(decode_text(value)))
}

fn decode_i64(family: Family, qualifier: Qualifier, value: &[u8]) -> Result<i64, CodecError> {
    let raw: [u8; 8] = value.try_into().map_err(|_| CodecError::InvalidInt {
        family: String::from_utf8_lossy(family.as_bytes()).into_owned(),
        qualifier: String::from_utf8_lossy(qualifier.as_bytes()).into_owned(),
        len: value.len(),
    })?;
    Ok(i64::from_be_bytes(raw))
}

fn decode_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

/// 解码一个单元格
///
/// 返回 `Ok(None)` 表示该组合不在表中（忽略，不是错误）。
pub fn decode(family: &[u8], qualifier: &[u8], value: &[u8]) -> Result<Option<FieldUpdate>, CodecError> {
    FIELD_TABLE
        .iter()
        .find(|(f, q, _)| f.as_bytes() == family && q.as_bytes() == qualifier)
        .map(|(_, _, decoder)| decoder(value))
        .transpose()
}

/// 解码并合并到累加器，返回是否写入了字段
pub fn merge_cell(message: &mut OffsetMessage, cell: &Cell) -> Result<bool, CodecError> {
    match decode(&cell.family, &cell.qualifier, &cell.value)? {
        Some(update) => {
            update.apply(message);
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> Vec<Cell> {
        vec![
            Cell::typed(Family::User, Qualifier::SourceUid, 1001i64.to_be_bytes().to_vec()),
            Cell::typed(Family::User, Qualifier::TargetUid, 42i64.to_be_bytes().to_vec()),
            Cell::typed(Family::Msg, Qualifier::MsgId, "42_5"),
            Cell::typed(Family::Msg, Qualifier::Msg, "hello"),
        ]
    }

    #[test]
    fn test_decode_big_endian_uid() {
        let update = decode(b"user", b"source_uid", &[0, 0, 0, 0, 0, 0, 1, 2]).unwrap();
        assert_eq!(update, Some(FieldUpdate::SourceUid(258)));
    }

    #[test]
    fn test_decode_negative_uid() {
        let update = decode(b"user", b"target_uid", &(-7i64).to_be_bytes()).unwrap();
        assert_eq!(update, Some(FieldUpdate::TargetUid(-7)));
    }

    #[test]
    fn test_decode_text_is_raw() {
        let update = decode(b"msg", b"msg", "你好 \\n \"x\"".as_bytes()).unwrap();
        assert_eq!(update, Some(FieldUpdate::Msg("你好 \\n \"x\"".to_string())));
    }

    #[test]
    fn test_unknown_pairs_are_ignored() {
        assert_eq!(decode(b"user", b"nickname", b"abc").unwrap(), None);
        assert_eq!(decode(b"meta", b"msg", b"abc").unwrap(), None);
        // 限定符放在错误的列族下也不匹配
        assert_eq!(decode(b"msg", b"source_uid", b"abc").unwrap(), None);
    }

    #[test]
    fn test_short_uid_is_codec_error() {
        let err = decode(b"user", b"source_uid", &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidInt {
                family: "user".to_string(),
                qualifier: "source_uid".to_string(),
                len: 3,
            }
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let cell = Cell::typed(Family::Msg, Qualifier::MsgId, "abc");
        let mut once = OffsetMessage::default();
        merge_cell(&mut once, &cell).unwrap();
        let mut twice = once.clone();
        merge_cell(&mut twice, &cell).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let cells = full_row();
        let mut forward = OffsetMessage::default();
        for c in &cells {
            merge_cell(&mut forward, c).unwrap();
        }
        let mut backward = OffsetMessage::default();
        for c in cells.iter().rev() {
            merge_cell(&mut backward, c).unwrap();
        }
        assert_eq!(forward, backward);
        assert_eq!(
            forward,
            OffsetMessage {
                source_uid: 1001,
                target_uid: 42,
                msg_id: "42_5".to_string(),
                msg: "hello".to_string(),
            }
        );
    }

    #[test]
    fn test_merge_reports_unknown_cell() {
        let mut m = OffsetMessage::default();
        let touched = merge_cell(&mut m, &Cell::new("x", "y", "z")).unwrap();
        assert!(!touched);
        assert_eq!(m, OffsetMessage::default());
    }
}
