//! Task - 名前付きの実行単位
//!
//! Task は以下の組です：
//! - パラメータ宣言（`ParameterSpec`）
//! - 任意の input binding（family + schema + Reader）
//! - 0 個以上の名前付き output binding（family + schema + Writer、宣言順）
//! - ハンドラ（`Handler`）
//! - 登録時に作られる Effect
//!
//! # 使用例
//! ```ignore
//! let spec = TaskSpec::from_fn(|params, _input, _effect| async move {
//!     let sum = params.number("a")? + params.number("b")?;
//!     Ok::<_, TaskError>(TaskOutput::single(sum))
//! })
//! .about("Add two numbers")
//! .param(ParameterSpec::number("a"))
//! .param(ParameterSpec::number("b"))
//! .output(OutputBinding::json(SchemaDocument::number(), StdoutWriter));
//! registry.register("add", spec);
//! ```

pub mod handler;
pub mod params;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::channel::{ChannelError, Reader, Writer};
use crate::codec::{json, text, yaml};
use crate::effect::{Effect, ShellCommandError};
use crate::schema::{SchemaDocument, Value, ValueKind};

pub use self::handler::{FnHandler, Handler, Typed, TypedHandler, handler_fn};
pub use self::params::{ParamKind, ParamStyle, ParameterSpec, Params};
pub use self::registry::TaskRegistry;

/// `TaskSpec::output` で宣言される output binding の名前
pub const DEFAULT_OUTPUT: &str = "output";

/// TaskError はハンドラの失敗
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("missing parameter `{0}`")]
    MissingParameter(String),

    #[error("parameter `{name}` should be {expected}, found {found}")]
    ParameterType {
        name: String,
        expected: ParamKind,
        found: ValueKind,
    },

    #[error("input does not fit the handler: {0}")]
    Input(String),

    #[error("handler output could not be converted: {0}")]
    Output(String),

    #[error(transparent)]
    Shell(#[from] ShellCommandError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("{0}")]
    Failed(String),
}

impl TaskError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// InputBinding は input の取得元と解釈
#[derive(Clone)]
pub struct InputBinding {
    family: String,
    schema: SchemaDocument,
    reader: Arc<dyn Reader>,
}

impl InputBinding {
    pub fn new(
        family: impl Into<String>,
        schema: SchemaDocument,
        reader: impl Reader + 'static,
    ) -> Self {
        Self {
            family: family.into(),
            schema,
            reader: Arc::new(reader),
        }
    }

    pub fn json(schema: SchemaDocument, reader: impl Reader + 'static) -> Self {
        Self::new(json::FAMILY, schema, reader)
    }

    pub fn yaml(schema: SchemaDocument, reader: impl Reader + 'static) -> Self {
        Self::new(yaml::FAMILY, schema, reader)
    }

    pub fn text(reader: impl Reader + 'static) -> Self {
        Self::new(text::FAMILY, SchemaDocument::string(), reader)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn reader(&self) -> &Arc<dyn Reader> {
        &self.reader
    }
}

impl fmt::Debug for InputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBinding")
            .field("family", &self.family)
            .field("schema", &self.schema)
            .field("reader", &self.reader.describe())
            .finish()
    }
}

/// OutputBinding は output の表現と書き出し先
#[derive(Clone)]
pub struct OutputBinding {
    family: String,
    schema: SchemaDocument,
    writer: Arc<dyn Writer>,
}

impl OutputBinding {
    pub fn new(
        family: impl Into<String>,
        schema: SchemaDocument,
        writer: impl Writer + 'static,
    ) -> Self {
        Self {
            family: family.into(),
            schema,
            writer: Arc::new(writer),
        }
    }

    pub fn json(schema: SchemaDocument, writer: impl Writer + 'static) -> Self {
        Self::new(json::FAMILY, schema, writer)
    }

    pub fn yaml(schema: SchemaDocument, writer: impl Writer + 'static) -> Self {
        Self::new(yaml::FAMILY, schema, writer)
    }

    pub fn text(writer: impl Writer + 'static) -> Self {
        Self::new(text::FAMILY, SchemaDocument::string(), writer)
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn writer(&self) -> &Arc<dyn Writer> {
        &self.writer
    }
}

impl fmt::Debug for OutputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBinding")
            .field("family", &self.family)
            .field("schema", &self.schema)
            .field("writer", &self.writer.describe())
            .finish()
    }
}

/// TaskOutput はハンドラが返す名前付きの値
///
/// 値が無い（または `Void` の）binding は書き出されない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutput {
    values: BTreeMap<String, Value>,
}

impl TaskOutput {
    pub fn none() -> Self {
        Self::default()
    }

    /// `output` binding への値
    pub fn single(value: impl Into<Value>) -> Self {
        Self::none().with(DEFAULT_OUTPUT, value)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// TaskSpec は登録前のタスク宣言
pub struct TaskSpec {
    about: Option<String>,
    params: Vec<ParameterSpec>,
    input: Option<InputBinding>,
    outputs: Vec<(String, OutputBinding)>,
    handler: Arc<dyn Handler>,
}

impl TaskSpec {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Self {
            about: None,
            params: Vec::new(),
            input: None,
            outputs: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// async クロージャをハンドラにする
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Params, Value, Arc<Effect>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskOutput, TaskError>> + Send + 'static,
    {
        Self::new(handler_fn(f))
    }

    pub fn about(mut self, text: impl Into<String>) -> Self {
        self.about = Some(text.into());
        self
    }

    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn input(mut self, binding: InputBinding) -> Self {
        self.input = Some(binding);
        self
    }

    /// `output` という名前の output binding
    pub fn output(self, binding: OutputBinding) -> Self {
        self.named_output(DEFAULT_OUTPUT, binding)
    }

    /// 名前付き output binding（同名は位置を保って置き換え）
    pub fn named_output(mut self, name: impl Into<String>, binding: OutputBinding) -> Self {
        let name = name.into();
        match self.outputs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = binding,
            None => self.outputs.push((name, binding)),
        }
        self
    }
}

/// Task は登録済みのタスク
///
/// `TaskRegistry::register` だけが作る。Effect はここで 1 度だけ作られる。
pub struct Task {
    name: String,
    about: Option<String>,
    params: Vec<ParameterSpec>,
    input: Option<InputBinding>,
    outputs: Vec<(String, OutputBinding)>,
    handler: Arc<dyn Handler>,
    effect: Arc<Effect>,
}

impl Task {
    pub(crate) fn new(name: String, spec: TaskSpec) -> Self {
        let effect = Arc::new(Effect::new(name.clone()));
        Self {
            name,
            about: spec.about,
            params: spec.params,
            input: spec.input,
            outputs: spec.outputs,
            handler: spec.handler,
            effect,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn input(&self) -> Option<&InputBinding> {
        self.input.as_ref()
    }

    /// output binding（宣言順）
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &OutputBinding)> {
        self.outputs
            .iter()
            .map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn effect(&self) -> &Arc<Effect> {
        &self.effect
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("about", &self.about)
            .field("params", &self.params)
            .field("input", &self.input)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryWriter, StdoutWriter};

    fn noop() -> TaskSpec {
        TaskSpec::from_fn(|_, _, _| async { Ok(TaskOutput::none()) })
    }

    #[test]
    fn outputs_keep_declaration_order() {
        let task = Task::new(
            "report".into(),
            noop()
                .named_output("summary", OutputBinding::text(StdoutWriter))
                .output(OutputBinding::json(SchemaDocument::number(), MemoryWriter::new()))
                .named_output("summary", OutputBinding::yaml(SchemaDocument::string(), StdoutWriter)),
        );

        let outputs: Vec<(&str, &str)> = task
            .outputs()
            .map(|(name, binding)| (name, binding.family()))
            .collect();
        assert_eq!(outputs, vec![("summary", "yaml"), ("output", "json")]);
    }

    #[test]
    fn effect_is_created_with_the_task_name() {
        let task = Task::new("build".into(), noop());
        assert_eq!(task.effect().task(), "build");
    }

    #[test]
    fn single_output_uses_the_default_name() {
        let output = TaskOutput::single(5);
        assert_eq!(output.get(DEFAULT_OUTPUT), Some(&Value::from(5)));
        assert_eq!(output.names().collect::<Vec<_>>(), vec!["output"]);
    }
}
