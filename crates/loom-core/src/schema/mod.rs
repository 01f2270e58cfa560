//! Schema - 値の形を記述する閉じた代数的データ型
//!
//! `SchemaDocument` は葉（void / null / boolean / number / string / date）と
//! 再帰ケース（array / object）からなる有限の木です。
//! 子ノードは `Box` / `Vec` で所有されるので、循環は構築できません。
//!
//! # 型マッピング
//! - `SchemaDocument` → [`Value`] の許容集合（`conform` / `validate`）
//! - Decoder が返す値と Encoder が受け取る値は同じマッピングに従う
//!
//! # 使用例
//! ```ignore
//! let schema = SchemaDocument::object([
//!     ("name", SchemaDocument::string()),
//!     ("tags", SchemaDocument::array(SchemaDocument::string())),
//! ]);
//! let value = schema.conform(raw)?;
//! ```

mod validate;
mod value;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use self::validate::{PathSegment, SchemaPath, ValidationError};
pub use self::value::{Value, ValueKind};

/// SchemaDocument は値の形の記述
///
/// `serde` では `type` タグ付きで表現されます（JSON Schema に近い形）。
/// ```json
/// { "type": "object", "properties": { "a": { "type": "number" } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaDocument {
    /// 値が存在しないこと（absence marker のみ受け付ける）
    Void {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Null {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// カレンダー日付（`YYYY-MM-DD`）
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        items: Box<SchemaDocument>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Object {
        properties: Properties,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SchemaDocument {
    pub fn void() -> Self {
        Self::Void { description: None }
    }

    pub fn null() -> Self {
        Self::Null { description: None }
    }

    pub fn boolean() -> Self {
        Self::Boolean { description: None }
    }

    pub fn number() -> Self {
        Self::Number { description: None }
    }

    pub fn string() -> Self {
        Self::String { description: None }
    }

    pub fn date() -> Self {
        Self::Date { description: None }
    }

    pub fn array(items: SchemaDocument) -> Self {
        Self::Array {
            items: Box::new(items),
            description: None,
        }
    }

    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SchemaDocument)>,
    {
        Self::Object {
            properties: properties.into_iter().collect(),
            description: None,
        }
    }

    /// description を設定した SchemaDocument を返す
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        *self.description_mut() = Some(text.into());
        self
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Void { description }
            | Self::Null { description }
            | Self::Boolean { description }
            | Self::Number { description }
            | Self::String { description }
            | Self::Date { description }
            | Self::Array { description, .. }
            | Self::Object { description, .. } => description.as_deref(),
        }
    }

    fn description_mut(&mut self) -> &mut Option<String> {
        match self {
            Self::Void { description }
            | Self::Null { description }
            | Self::Boolean { description }
            | Self::Number { description }
            | Self::String { description }
            | Self::Date { description }
            | Self::Array { description, .. }
            | Self::Object { description, .. } => description,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Self::Void { .. } => SchemaKind::Void,
            Self::Null { .. } => SchemaKind::Null,
            Self::Boolean { .. } => SchemaKind::Boolean,
            Self::Number { .. } => SchemaKind::Number,
            Self::String { .. } => SchemaKind::String,
            Self::Date { .. } => SchemaKind::Date,
            Self::Array { .. } => SchemaKind::Array,
            Self::Object { .. } => SchemaKind::Object,
        }
    }

    /// 木の深さ（葉は 1）
    pub fn depth(&self) -> usize {
        match self {
            Self::Array { items, .. } => 1 + items.depth(),
            Self::Object { properties, .. } => {
                1 + properties.iter().map(|(_, s)| s.depth()).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

/// SchemaKind は SchemaDocument のケースを表すタグ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Void,
    Null,
    Boolean,
    Number,
    String,
    Date,
    Array,
    Object,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Void => "void",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Properties は object の順序付きプロパティ
///
/// 宣言順を保つため `Vec` で保持します。同名キーの再挿入は位置を保ったまま置き換えます。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties(Vec<(String, SchemaDocument)>);

impl Properties {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaDocument) {
        let name = name.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = schema,
            None => self.0.push((name, schema)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaDocument> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, schema)| schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaDocument)> {
        self.0.iter().map(|(key, schema)| (key.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SchemaDocument)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, SchemaDocument)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (name, schema) in iter {
            properties.insert(name, schema);
        }
        properties
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, schema) in &self.0 {
            map.serialize_entry(name, schema)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of property names to schema documents")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Properties, A::Error> {
                let mut properties = Properties::new();
                while let Some((name, schema)) = access.next_entry::<String, SchemaDocument>()? {
                    properties.insert(name, schema);
                }
                Ok(properties)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_keep_declaration_order() {
        let schema = SchemaDocument::object([
            ("zeta", SchemaDocument::number()),
            ("alpha", SchemaDocument::string()),
        ]);
        let SchemaDocument::Object { properties, .. } = &schema else {
            panic!("expected object schema");
        };
        let keys: Vec<&str> = properties.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn reinserting_a_property_replaces_in_place() {
        let mut properties = Properties::new();
        properties.insert("a", SchemaDocument::number());
        properties.insert("b", SchemaDocument::number());
        properties.insert("a", SchemaDocument::string());

        assert_eq!(properties.len(), 2);
        assert_eq!(properties.get("a"), Some(&SchemaDocument::string()));
        assert_eq!(properties.iter().next().map(|(k, _)| k), Some("a"));
    }

    #[test]
    fn schema_serializes_as_tagged_document() {
        let schema = SchemaDocument::object([(
            "count",
            SchemaDocument::number().describe("how many"),
        )]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "object",
                "properties": {
                    "count": { "type": "number", "description": "how many" }
                }
            })
        );

        let back: SchemaDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn depth_counts_nesting() {
        let schema = SchemaDocument::array(SchemaDocument::object([(
            "xs",
            SchemaDocument::array(SchemaDocument::number()),
        )]));
        assert_eq!(schema.depth(), 4);
        assert_eq!(SchemaDocument::string().depth(), 1);
    }

    #[test]
    fn describe_sets_description_on_any_case() {
        let schema = SchemaDocument::array(SchemaDocument::date()).describe("days");
        assert_eq!(schema.description(), Some("days"));
        assert_eq!(schema.kind(), SchemaKind::Array);
    }
}
