//! Parameters - コマンドライン上の引数の宣言と、パース済みの値
//!
//! パラメータは常にコマンドラインのトークンとして届きます。
//! Channel 経由で届く input / output とは別物です。

use std::fmt;

use super::TaskError;
use crate::schema::{Value, ValueKind};

/// ParamKind はパラメータのスカラー型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Number,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Number => f.write_str("number"),
        }
    }
}

/// ParamStyle は引数の渡し方
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamStyle {
    /// 宣言順の位置引数
    Positional,
    /// `--long value` / `-s value`
    Option { long: String, short: Option<char> },
}

/// ParameterSpec は名前付き CLI 引数の宣言
///
/// 位置引数がデフォルト（必須）。`option()` / `short()` で名前付きオプション（任意）になる。
///
/// # 使用例
/// ```ignore
/// ParameterSpec::number("a").describe("left operand");
/// ParameterSpec::text("greeting").option().short('g').default_value("hello");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    name: String,
    kind: ParamKind,
    description: Option<String>,
    style: ParamStyle,
    required: bool,
    default: Option<String>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            style: ParamStyle::Positional,
            required: true,
            default: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Number)
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// `--<name>` オプションにする（任意）
    pub fn option(self) -> Self {
        let long = self.name.clone();
        self.long(long)
    }

    /// `--<long>` オプションにする（任意）
    pub fn long(mut self, long: impl Into<String>) -> Self {
        let short = match &self.style {
            ParamStyle::Option { short, .. } => *short,
            ParamStyle::Positional => {
                self.required = false;
                None
            }
        };
        self.style = ParamStyle::Option {
            long: long.into(),
            short,
        };
        self
    }

    /// `-<c>` を付ける（位置引数なら `--<name>` オプションにもなる）
    pub fn short(mut self, c: char) -> Self {
        if matches!(self.style, ParamStyle::Positional) {
            self = self.option();
        }
        if let ParamStyle::Option { short, .. } = &mut self.style {
            *short = Some(c);
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// 省略時に使うトークン（kind に従ってパースされる）
    pub fn default_value(mut self, token: impl Into<String>) -> Self {
        self.default = Some(token.into());
        self.required = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn style(&self) -> &ParamStyle {
        &self.style
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_token(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// Params はパース済みのパラメータ（宣言順）
///
/// 値は `Value::String` か `Value::Number`。省略された任意パラメータは含まれない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    values: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Result<&str, TaskError> {
        self.optional_text(name)?
            .ok_or_else(|| TaskError::MissingParameter(name.to_string()))
    }

    pub fn number(&self, name: &str) -> Result<f64, TaskError> {
        self.optional_number(name)?
            .ok_or_else(|| TaskError::MissingParameter(name.to_string()))
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<&str>, TaskError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(type_error(name, ParamKind::Text, other.kind())),
        }
    }

    pub fn optional_number(&self, name: &str) -> Result<Option<f64>, TaskError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(type_error(name, ParamKind::Number, other.kind())),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn type_error(name: &str, expected: ParamKind, found: ValueKind) -> TaskError {
    TaskError::ParameterType {
        name: name.to_string(),
        expected,
        found,
    }
}
