//! 型マッピングの検証 - SchemaDocument に対する Value の適合判定
//!
//! 木を深さ優先・宣言順にたどり、最初に見つかった不一致をパス付きで報告します。
//! I/O は行わない純粋関数です。

use std::fmt;

use chrono::NaiveDate;

use super::{SchemaDocument, SchemaKind, Value, ValueKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// PathSegment はスキーマ木の中の 1 ステップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// SchemaPath は値の中の位置（`$`, `$.user.name`, `$.items[2]`）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaPath(Vec<PathSegment>);

impl SchemaPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// ValidationError は値がスキーマに適合しないことを表す
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("expected {expected} at {path}, found {found}")]
pub struct ValidationError {
    pub path: SchemaPath,
    pub expected: SchemaKind,
    pub found: ValueKind,
}

impl SchemaDocument {
    /// 値をスキーマに適合させる
    ///
    /// - `date` スキーマは `YYYY-MM-DD` 形式の文字列を `Value::Date` に正規化する
    /// - object に無いキーは `Void` として扱い、結果にも `Void` で補完する
    /// - スキーマに無い余分なキーはそのまま残す
    pub fn conform(&self, value: Value) -> Result<Value, ValidationError> {
        conform_at(self, value, &mut Vec::new())
    }

    /// 正規化を行わない厳密な検証（Encoder の前段で使う）
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        validate_at(self, value, &mut Vec::new())
    }
}

fn descend<T>(
    path: &mut Vec<PathSegment>,
    segment: PathSegment,
    f: impl FnOnce(&mut Vec<PathSegment>) -> T,
) -> T {
    path.push(segment);
    let out = f(path);
    path.pop();
    out
}

fn mismatch(expected: SchemaKind, found: ValueKind, path: &[PathSegment]) -> ValidationError {
    ValidationError {
        path: SchemaPath(path.to_vec()),
        expected,
        found,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

fn conform_at(
    schema: &SchemaDocument,
    value: Value,
    path: &mut Vec<PathSegment>,
) -> Result<Value, ValidationError> {
    match (schema, value) {
        (SchemaDocument::Void { .. }, Value::Void) => Ok(Value::Void),
        (SchemaDocument::Null { .. }, Value::Null) => Ok(Value::Null),
        (SchemaDocument::Boolean { .. }, v @ Value::Bool(_)) => Ok(v),
        (SchemaDocument::Number { .. }, v @ Value::Number(_)) => Ok(v),
        (SchemaDocument::String { .. }, v @ Value::String(_)) => Ok(v),
        (SchemaDocument::Date { .. }, v @ Value::Date(_)) => Ok(v),
        (SchemaDocument::Date { .. }, Value::String(text)) => parse_date(&text)
            .map(Value::Date)
            .ok_or_else(|| mismatch(SchemaKind::Date, ValueKind::String, path)),
        (SchemaDocument::Array { items, .. }, Value::Array(elements)) => {
            let mut conformed = Vec::with_capacity(elements.len());
            for (index, element) in elements.into_iter().enumerate() {
                let element = descend(path, PathSegment::Index(index), |path| {
                    conform_at(items, element, path)
                })?;
                conformed.push(element);
            }
            Ok(Value::Array(conformed))
        }
        (SchemaDocument::Object { properties, .. }, Value::Object(mut fields)) => {
            let mut conformed = Vec::with_capacity(properties.len());
            for (key, property) in properties.iter() {
                let field = fields.remove(key).unwrap_or(Value::Void);
                let field = descend(path, PathSegment::Key(key.to_string()), |path| {
                    conform_at(property, field, path)
                })?;
                conformed.push((key.to_string(), field));
            }
            // 余分なキーは permissive superset として保持
            fields.extend(conformed);
            Ok(Value::Object(fields))
        }
        (schema, value) => Err(mismatch(schema.kind(), value.kind(), path)),
    }
}

fn validate_at(
    schema: &SchemaDocument,
    value: &Value,
    path: &mut Vec<PathSegment>,
) -> Result<(), ValidationError> {
    match (schema, value) {
        (SchemaDocument::Void { .. }, Value::Void)
        | (SchemaDocument::Null { .. }, Value::Null)
        | (SchemaDocument::Boolean { .. }, Value::Bool(_))
        | (SchemaDocument::Number { .. }, Value::Number(_))
        | (SchemaDocument::String { .. }, Value::String(_))
        | (SchemaDocument::Date { .. }, Value::Date(_)) => Ok(()),
        (SchemaDocument::Array { items, .. }, Value::Array(elements)) => {
            for (index, element) in elements.iter().enumerate() {
                descend(path, PathSegment::Index(index), |path| {
                    validate_at(items, element, path)
                })?;
            }
            Ok(())
        }
        (SchemaDocument::Object { properties, .. }, Value::Object(fields)) => {
            for (key, property) in properties.iter() {
                let field = fields.get(key).unwrap_or(&Value::Void);
                descend(path, PathSegment::Key(key.to_string()), |path| {
                    validate_at(property, field, path)
                })?;
            }
            Ok(())
        }
        (schema, value) => Err(mismatch(schema.kind(), value.kind(), path)),
    }
}
