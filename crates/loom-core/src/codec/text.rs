//! Text family - raw text をそのまま文字列として扱う

use super::{CodecFamily, DecodeError, EncodeError};
use crate::schema::Value;

pub const FAMILY: &str = "text";

/// TextFamily は raw text をそのまま `Value::String` として扱う
///
/// 空の入力も `Value::String("")` になる（`Void` にはしない）。
/// 表現できるのは `string` スキーマのみ。
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFamily;

impl CodecFamily for TextFamily {
    fn name(&self) -> &str {
        FAMILY
    }

    fn parse(&self, raw: &str) -> Result<Value, DecodeError> {
        Ok(Value::String(raw.to_string()))
    }

    fn render(&self, value: &Value) -> Result<String, EncodeError> {
        match value {
            Value::Void => Ok(String::new()),
            Value::String(s) => Ok(s.clone()),
            other => Err(EncodeError::Unsupported {
                family: FAMILY.to_string(),
                kind: other.kind(),
                context: String::new(),
            }),
        }
    }
}
