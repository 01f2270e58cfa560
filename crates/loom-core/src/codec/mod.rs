//! Codec - raw text と型付き Value の相互変換
//!
//! # 二層構造
//! - **CodecFamily**: ワイヤ形式ごとの実装（json / yaml / text）。スキーマを知らない
//! - **Codec**: CodecFamily + SchemaDocument の組。decode 時に型マッピングを適用する
//!
//! # デコードフロー
//! 1. `CodecFamily::parse` で raw text を Value に（構文エラーは DecodeError）
//! 2. `SchemaDocument::conform` で形を検証（不一致は ValidationError）
//!
//! # エンコードフロー
//! 1. `SchemaDocument::validate` で形を検証（不一致は EncodeError）
//! 2. `CodecFamily::render` で raw text に

pub mod json;
pub mod registry;
pub mod text;
pub mod yaml;

use std::fmt;
use std::sync::Arc;

use crate::schema::{SchemaDocument, ValidationError, Value, ValueKind};

pub use self::json::JsonFamily;
pub use self::registry::{CodecRegistry, CodecRegistryBuilder};
pub use self::text::TextFamily;
pub use self::yaml::YamlFamily;

/// DecodeError は raw text がワイヤ形式として解釈できないことを表す
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed {family} input: {message}")]
    Malformed { family: String, message: String },

    #[error("{family} input contains unsupported {what}")]
    Unsupported { family: String, what: String },
}

/// EncodeError は Value を raw text にできないことを表す
///
/// タスクが宣言と異なる値を返した場合に起こるので、プログラミングエラーとして扱う。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("value does not match the declared schema: {0}")]
    Validation(#[from] ValidationError),

    #[error("{family} cannot represent the non-finite number {value}")]
    NonFinite { family: String, value: f64 },

    #[error("{family} cannot represent a {kind} value{context}")]
    Unsupported {
        family: String,
        kind: ValueKind,
        context: String,
    },

    #[error("{family} serialization failed: {message}")]
    Serialize { family: String, message: String },
}

/// CodecError は decode の失敗（構文 or 形）
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// CodecFamily はワイヤ形式 1 つ分の parse / render
///
/// # 使用例
/// ```ignore
/// struct CsvFamily;
///
/// impl CodecFamily for CsvFamily {
///     fn name(&self) -> &str { "csv" }
///     fn parse(&self, raw: &str) -> Result<Value, DecodeError> { ... }
///     fn render(&self, value: &Value) -> Result<String, EncodeError> { ... }
/// }
/// ```
///
/// # 契約
/// - `parse(render(v)) == v`（そのファミリーが表現できる v について）
/// - 構造化ファミリー（json / yaml）は空の入力を `Value::Void` として扱う。text は空文字列のまま
pub trait CodecFamily: Send + Sync {
    /// ファミリーのタグ（"json" など）。CodecRegistry のキーになる
    fn name(&self) -> &str;

    fn parse(&self, raw: &str) -> Result<Value, DecodeError>;

    fn render(&self, value: &Value) -> Result<String, EncodeError>;
}

/// Codec は CodecFamily を SchemaDocument に束縛したもの
#[derive(Clone)]
pub struct Codec {
    family: Arc<dyn CodecFamily>,
    schema: SchemaDocument,
    validate: bool,
}

impl Codec {
    pub fn new(family: Arc<dyn CodecFamily>, schema: SchemaDocument) -> Self {
        Self {
            family,
            schema,
            validate: true,
        }
    }

    /// decode 時のスキーマ検証を行わない Codec を返す
    ///
    /// encode 側の検証は常に行われる。
    pub fn unchecked(mut self) -> Self {
        self.validate = false;
        self
    }

    pub fn family(&self) -> &str {
        self.family.name()
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn decode(&self, raw: &str) -> Result<Value, CodecError> {
        let value = self.family.parse(raw)?;
        if !self.validate {
            return Ok(value);
        }
        Ok(self.schema.conform(value)?)
    }

    pub fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        self.schema.validate(value)?;
        self.family.render(value)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("family", &self.family.name())
            .field("schema", &self.schema)
            .field("validate", &self.validate)
            .finish()
    }
}

/// 2^53 未満の整数値（負のゼロを除く）なら i64 として返す
///
/// この範囲の f64 は整数表記でもビット単位で復元できる。
pub(crate) fn exact_integer(n: f64) -> Option<i64> {
    const LIMIT: f64 = 9_007_199_254_740_992.0;
    let negative_zero = n == 0.0 && n.is_sign_negative();
    if n.is_finite() && n.fract() == 0.0 && n.abs() < LIMIT && !negative_zero {
        Some(n as i64)
    } else {
        None
    }
}
