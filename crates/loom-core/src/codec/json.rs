//! JSON family - serde_json による JSON テキスト

use serde_json::Number;

use super::{CodecFamily, DecodeError, EncodeError, exact_integer};
use crate::schema::Value;

pub const FAMILY: &str = "json";

/// JsonFamily は JSON テキストを扱う
///
/// - 空（空白のみ）の入力は `Value::Void`
/// - 出力は pretty print + 末尾改行
/// - 整数で表せる数値は `5` のように整数表記（`5.0` にはしない）
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFamily;

impl CodecFamily for JsonFamily {
    fn name(&self) -> &str {
        FAMILY
    }

    fn parse(&self, raw: &str) -> Result<Value, DecodeError> {
        if raw.trim().is_empty() {
            return Ok(Value::Void);
        }
        let json: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| DecodeError::Malformed {
                family: FAMILY.to_string(),
                message: e.to_string(),
            })?;
        Ok(from_json(json))
    }

    fn render(&self, value: &Value) -> Result<String, EncodeError> {
        if value.is_void() {
            return Ok(String::new());
        }
        let json = to_json(value)?;
        let mut text = serde_json::to_string_pretty(&json).map_err(|e| EncodeError::Serialize {
            family: FAMILY.to_string(),
            message: e.to_string(),
        })?;
        text.push('\n');
        Ok(text)
    }
}

/// serde_json::Value → Value
pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::Array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect(),
        ),
    }
}

/// Value → serde_json::Value
///
/// - トップレベルの `Void` は `null`
/// - object 内の `Void` フィールドは省略（decode 時に `Void` として補完される）
/// - array 内の `Void` は表現できない
/// - `Date` は `YYYY-MM-DD` 文字列
pub fn to_json(value: &Value) -> Result<serde_json::Value, EncodeError> {
    Ok(match value {
        Value::Void | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Value::Number(json_number(*n)?),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if item.is_void() {
                    return Err(EncodeError::Unsupported {
                        family: FAMILY.to_string(),
                        kind: item.kind(),
                        context: " inside an array".to_string(),
                    });
                }
                out.push(to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Object(fields) => {
            let mut out = serde_json::Map::new();
            for (key, field) in fields.iter().filter(|(_, field)| !field.is_void()) {
                out.insert(key.clone(), to_json(field)?);
            }
            serde_json::Value::Object(out)
        }
    })
}

fn json_number(n: f64) -> Result<Number, EncodeError> {
    if let Some(i) = exact_integer(n) {
        return Ok(Number::from(i));
    }
    Number::from_f64(n).ok_or_else(|| EncodeError::NonFinite {
        family: FAMILY.to_string(),
        value: n,
    })
}
