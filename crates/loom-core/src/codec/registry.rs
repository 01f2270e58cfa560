//! CodecRegistry - ファミリータグ → CodecFamily の対応表
//!
//! 起動時に `CodecRegistryBuilder` でファミリーを登録し、`freeze()` で凍結します。
//! 凍結後の `CodecRegistry` には変更用の API がありません。
//! Dispatcher は凍結済みのものだけを受け取ります。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Codec, CodecFamily, JsonFamily, TextFamily, YamlFamily};
use crate::schema::SchemaDocument;

/// CodecRegistryBuilder は登録フェーズのレジストリ
///
/// # 使用例
/// ```ignore
/// let codecs = CodecRegistryBuilder::new()
///     .family(CsvFamily)
///     .freeze();
/// let codec = codecs.codec("csv", schema);
/// ```
pub struct CodecRegistryBuilder {
    families: HashMap<String, Arc<dyn CodecFamily>>,
}

impl CodecRegistryBuilder {
    /// json / yaml / text を登録済みのビルダー
    pub fn new() -> Self {
        Self::empty().family(JsonFamily).family(YamlFamily).family(TextFamily)
    }

    pub fn empty() -> Self {
        Self {
            families: HashMap::new(),
        }
    }

    /// ファミリーを登録（同名は置き換え）
    pub fn family<F: CodecFamily + 'static>(mut self, family: F) -> Self {
        self.register(Arc::new(family));
        self
    }

    pub fn register(&mut self, family: Arc<dyn CodecFamily>) {
        self.families.insert(family.name().to_string(), family);
    }

    pub fn freeze(self) -> CodecRegistry {
        CodecRegistry {
            families: self.families,
        }
    }
}

impl Default for CodecRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// CodecRegistry は凍結済みのファミリー表
#[derive(Clone)]
pub struct CodecRegistry {
    families: HashMap<String, Arc<dyn CodecFamily>>,
}

impl CodecRegistry {
    pub fn get(&self, family: &str) -> Option<Arc<dyn CodecFamily>> {
        self.families.get(family).cloned()
    }

    pub fn contains(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// ファミリーをスキーマに束縛した Codec を返す
    pub fn codec(&self, family: &str, schema: SchemaDocument) -> Option<Codec> {
        self.get(family).map(|f| Codec::new(f, schema))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("families", &self.names())
            .finish()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistryBuilder::new().freeze()
    }
}
