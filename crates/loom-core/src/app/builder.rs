//! AppBuilder - タスクとコーデックの組み立て
//!
//! # Fail-fast 設計
//! 宣言の誤りは全て `build()` で検出し、dispatch 時まで持ち越さない：
//! - 未登録の codec family を参照している binding
//! - 同じタスク内での重複したパラメータ名・フラグ
//! - 組み込みの引数名（`help` / `version` / `schema`）との衝突
//! - 数値として読めない number パラメータのデフォルト値
//! - 任意の位置引数の後ろにある必須の位置引数

use std::collections::HashSet;

use crate::codec::{CodecFamily, CodecRegistry, CodecRegistryBuilder};
use crate::task::{ParamKind, ParamStyle, Task, TaskRegistry, TaskSpec};

/// タスクのパラメータ名に使えない名前
pub const RESERVED_PARAMETERS: &[&str] = &["help", "version", "schema"];

/// タスク名に使えない名前
pub const RESERVED_TASKS: &[&str] = &["help"];

/// BuildError は App 構築時の宣言エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("task `{task}` uses unknown codec family `{family}`")]
    UnknownFamily { task: String, family: String },

    #[error("task `{task}` declares parameter `{name}` more than once")]
    DuplicateParameter { task: String, name: String },

    #[error("task `{task}` declares flag `{flag}` more than once")]
    DuplicateFlag { task: String, flag: String },

    #[error("task `{task}` uses the reserved parameter name `{name}`")]
    ReservedName { task: String, name: String },

    #[error("`{task}` is reserved and cannot be used as a task name")]
    ReservedTask { task: String },

    #[error("task `{task}` gives number parameter `{name}` the non-numeric default {value:?}")]
    InvalidDefault {
        task: String,
        name: String,
        value: String,
    },

    #[error("task `{task}` declares required positional `{name}` after an optional one")]
    PositionalOrder { task: String, name: String },
}

/// AppBuilder はタスクを登録して App を作る
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new("loom")
///     .about("Task runner")
///     .version(env!("CARGO_PKG_VERSION"))
///     .family(CsvFamily)
///     .task("add", add_spec)
///     .build()?;
/// ```
pub struct AppBuilder {
    program: String,
    about: Option<String>,
    version: Option<String>,
    codecs: CodecRegistryBuilder,
    tasks: TaskRegistry,
}

impl AppBuilder {
    /// json / yaml / text が登録済みの AppBuilder
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            about: None,
            version: None,
            codecs: CodecRegistryBuilder::new(),
            tasks: TaskRegistry::new(),
        }
    }

    pub fn about(mut self, text: impl Into<String>) -> Self {
        self.about = Some(text.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 独自の codec family を追加する
    pub fn family<F: CodecFamily + 'static>(mut self, family: F) -> Self {
        self.codecs = self.codecs.family(family);
        self
    }

    /// タスクを登録する（同名は後勝ち）
    pub fn task(mut self, name: impl Into<String>, spec: TaskSpec) -> Self {
        self.tasks.register(name, spec);
        self
    }

    /// codec registry を凍結し、全タスクの宣言を検証して App を作る
    pub fn build(self) -> Result<App, BuildError> {
        let codecs = self.codecs.freeze();
        for task in self.tasks.tasks() {
            check_task(task, &codecs)?;
        }
        tracing::debug!(
            program = %self.program,
            tasks = self.tasks.len(),
            families = ?codecs.names(),
            "app built"
        );
        Ok(App {
            program: self.program,
            about: self.about,
            version: self.version,
            codecs,
            tasks: self.tasks,
        })
    }
}

fn check_task(task: &Task, codecs: &CodecRegistry) -> Result<(), BuildError> {
    let name = task.name();
    if RESERVED_TASKS.contains(&name) {
        return Err(BuildError::ReservedTask {
            task: name.to_string(),
        });
    }

    let families = task
        .input()
        .map(|binding| binding.family())
        .into_iter()
        .chain(task.outputs().map(|(_, binding)| binding.family()));
    for family in families {
        if !codecs.contains(family) {
            return Err(BuildError::UnknownFamily {
                task: name.to_string(),
                family: family.to_string(),
            });
        }
    }

    let mut seen_names = HashSet::new();
    let mut seen_flags: HashSet<String> =
        ["--help", "-h", "--schema"].into_iter().map(String::from).collect();
    let mut optional_positional = false;

    for param in task.params() {
        if RESERVED_PARAMETERS.contains(&param.name()) {
            return Err(BuildError::ReservedName {
                task: name.to_string(),
                name: param.name().to_string(),
            });
        }
        if !seen_names.insert(param.name()) {
            return Err(BuildError::DuplicateParameter {
                task: name.to_string(),
                name: param.name().to_string(),
            });
        }

        if let (ParamKind::Number, Some(token)) = (param.kind(), param.default_token()) {
            if token.parse::<f64>().is_err() {
                return Err(BuildError::InvalidDefault {
                    task: name.to_string(),
                    name: param.name().to_string(),
                    value: token.to_string(),
                });
            }
        }

        match param.style() {
            ParamStyle::Positional => {
                if param.is_required() && optional_positional {
                    return Err(BuildError::PositionalOrder {
                        task: name.to_string(),
                        name: param.name().to_string(),
                    });
                }
                optional_positional |= !param.is_required();
            }
            ParamStyle::Option { long, short } => {
                let flags = std::iter::once(format!("--{long}"))
                    .chain(short.map(|c| format!("-{c}")));
                for flag in flags {
                    if !seen_flags.insert(flag.clone()) {
                        return Err(BuildError::DuplicateFlag {
                            task: name.to_string(),
                            flag,
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// App は構築済みの不変なアプリケーション
///
/// Dispatcher に渡して使う。構築後にタスクや codec family は増減しない。
#[derive(Debug)]
pub struct App {
    program: String,
    about: Option<String>,
    version: Option<String>,
    codecs: CodecRegistry,
    tasks: TaskRegistry,
}

impl App {
    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn about(&self) -> Option<&str> {
        self.about.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }
}
