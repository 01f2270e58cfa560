//! YAML family - serde_yaml による YAML テキスト

use serde_yaml::{Mapping, Number};

use super::{CodecFamily, DecodeError, EncodeError, exact_integer};
use crate::schema::Value;

pub const FAMILY: &str = "yaml";

/// YamlFamily は YAML ドキュメント 1 つを扱う
///
/// マッピングのキーは文字列のみ。タグ付きの値（`!tag`）は扱わない。
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFamily;

impl CodecFamily for YamlFamily {
    fn name(&self) -> &str {
        FAMILY
    }

    fn parse(&self, raw: &str) -> Result<Value, DecodeError> {
        if raw.trim().is_empty() {
            return Ok(Value::Void);
        }
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).map_err(|e| DecodeError::Malformed {
                family: FAMILY.to_string(),
                message: e.to_string(),
            })?;
        from_yaml(yaml)
    }

    fn render(&self, value: &Value) -> Result<String, EncodeError> {
        if value.is_void() {
            return Ok(String::new());
        }
        let yaml = to_yaml(value)?;
        serde_yaml::to_string(&yaml).map_err(|e| EncodeError::Serialize {
            family: FAMILY.to_string(),
            message: e.to_string(),
        })
    }
}

fn unsupported(what: &str) -> DecodeError {
    DecodeError::Unsupported {
        family: FAMILY.to_string(),
        what: what.to_string(),
    }
}

fn from_yaml(yaml: serde_yaml::Value) -> Result<Value, DecodeError> {
    Ok(match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        serde_yaml::Value::Mapping(mapping) => {
            let mut fields = std::collections::BTreeMap::new();
            for (key, value) in mapping {
                let serde_yaml::Value::String(key) = key else {
                    return Err(unsupported("non-string mapping key"));
                };
                fields.insert(key, from_yaml(value)?);
            }
            Value::Object(fields)
        }
        serde_yaml::Value::Tagged(_) => return Err(unsupported("tagged value")),
    })
}

fn to_yaml(value: &Value) -> Result<serde_yaml::Value, EncodeError> {
    Ok(match value {
        Value::Void | Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Number(n) => match exact_integer(*n) {
            Some(i) => serde_yaml::Value::Number(Number::from(i)),
            None => serde_yaml::Value::Number(Number::from(*n)),
        },
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Date(d) => serde_yaml::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if item.is_void() {
                    return Err(EncodeError::Unsupported {
                        family: FAMILY.to_string(),
                        kind: item.kind(),
                        context: " inside a sequence".to_string(),
                    });
                }
                out.push(to_yaml(item)?);
            }
            serde_yaml::Value::Sequence(out)
        }
        Value::Object(fields) => {
            let mut out = Mapping::new();
            for (key, field) in fields.iter().filter(|(_, field)| !field.is_void()) {
                out.insert(serde_yaml::Value::String(key.clone()), to_yaml(field)?);
            }
            serde_yaml::Value::Mapping(out)
        }
    })
}
