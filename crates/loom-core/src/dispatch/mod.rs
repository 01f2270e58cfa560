//! Dispatcher - コマンドラインからタスクを 1 回実行する
//!
//! # フロー
//! 1. `run(argv)`: App から組み立てた clap Command で argv をパース
//! 2. サブコマンド名で TaskRegistry を引く（無ければ `LoomError::UnknownTask`）
//! 3. `invoke(name, params)`: 状態機械を進める
//!    - input binding があり、対話的な端末でなければ read → decode
//!    - ハンドラを実行
//!    - output binding を宣言順に encode → write（1 つずつ await）
//!
//! 1 プロセス 1 タスク。タイムアウトやキャンセルは無い。

pub(crate) mod cli;
pub mod state;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Command;
use clap::error::ErrorKind;
use tracing::Instrument;
use ulid::Ulid;

use crate::app::{App, BuildError};
use crate::channel::{StdoutWriter, Writer};
use crate::codec::{Codec, CodecError};
use crate::config::LoomConfig;
use crate::error::LoomError;
use crate::schema::{SchemaDocument, Value};
use crate::task::{ParamKind, Params, Task, TaskError};

pub use self::state::DispatchState;
use self::state::StateCursor;

/// DispatchReport は成功した dispatch の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub task: String,
    pub state: DispatchState,
    /// 書き出した output binding の名前（書き出し順）
    pub written: Vec<String>,
}

/// RunOutcome は `Dispatcher::run` の成功時の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// `--help` / `--version` を表示した
    Help,
    /// `<task> --schema` でスキーマを表示した
    Schema { task: String },
    /// タスクを実行した
    Completed(DispatchReport),
}

/// Dispatcher は App を受け取ってタスクを実行する
///
/// # 使用例
/// ```ignore
/// #[tokio::main]
/// async fn main() -> ExitCode {
///     let app = AppBuilder::new("loom").task("add", add_spec).build()?;
///     Dispatcher::new(app).run_to_exit(std::env::args_os()).await
/// }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    app: App,
    config: LoomConfig,
}

impl Dispatcher {
    pub fn new(app: App) -> Self {
        Self::with_config(app, LoomConfig::default())
    }

    pub fn with_config(app: App, config: LoomConfig) -> Self {
        Self { app, config }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// 登録済みタスクから組み立てた clap Command
    pub fn command(&self) -> Command {
        cli::root_command(&self.app)
    }

    /// argv をパースしてタスクを実行する
    ///
    /// `argv[0]` はプログラム名として扱われる。
    pub async fn run<I, T>(&self, argv: I) -> Result<RunOutcome, LoomError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) if !err.use_stderr() => {
                if let Err(error) = err.print() {
                    tracing::warn!(%error, "failed to print help");
                }
                return Ok(RunOutcome::Help);
            }
            Err(err) => return Err(LoomError::Usage(err)),
        };

        let Some((name, sub)) = matches.subcommand() else {
            let err = self
                .command()
                .error(ErrorKind::MissingSubcommand, "a task name is required");
            return Err(LoomError::Usage(err));
        };
        let task = self
            .app
            .tasks()
            .lookup(name)
            .ok_or_else(|| LoomError::UnknownTask(name.to_string()))?;

        if sub.get_flag(cli::SCHEMA_FLAG) {
            self.print_schema(&task).await?;
            return Ok(RunOutcome::Schema {
                task: task.name().to_string(),
            });
        }

        let params = cli::extract_params(&task, sub);
        self.dispatch(&task, params).await.map(RunOutcome::Completed)
    }

    /// 名前とパース済みパラメータでタスクを実行する
    pub async fn invoke(&self, name: &str, params: Params) -> Result<DispatchReport, LoomError> {
        let task = self
            .app
            .tasks()
            .lookup(name)
            .ok_or_else(|| LoomError::UnknownTask(name.to_string()))?;
        self.dispatch(&task, params).await
    }

    /// `run` を実行してプロセスの終了コードに変換する
    ///
    /// エラーは stderr に表示する。
    pub async fn run_to_exit<I, T>(&self, argv: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.run(argv).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                match &err {
                    LoomError::Usage(usage) => {
                        tracing::error!(kind = ?usage.kind(), "invalid command line");
                        if let Err(error) = usage.print() {
                            tracing::warn!(%error, "failed to print usage error");
                        }
                    }
                    other => {
                        if other.task().is_none() {
                            tracing::error!(error = %other, "dispatch failed");
                        }
                        eprintln!("{}: {other}", self.app.program());
                    }
                }
                ExitCode::from(&err)
            }
        }
    }

    async fn dispatch(&self, task: &Task, params: Params) -> Result<DispatchReport, LoomError> {
        let span = task.effect().invocation_span(Ulid::new());
        async {
            let mut cursor = StateCursor::new();
            match self.drive(task, params, &mut cursor).await {
                Ok(written) => {
                    tracing::debug!(written = ?written, "dispatch finished");
                    Ok(DispatchReport {
                        task: task.name().to_string(),
                        state: cursor.state(),
                        written,
                    })
                }
                Err(err) => {
                    tracing::error!(state = %cursor.state(), error = %err, "dispatch failed");
                    cursor.advance(DispatchState::Failed);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        task: &Task,
        params: Params,
        cursor: &mut StateCursor,
    ) -> Result<Vec<String>, LoomError> {
        let name = task.name();

        cursor.advance(DispatchState::ParsingArgs);
        let params = resolve_params(task, params).map_err(|e| LoomError::from_task(name, e))?;

        let input = match task.input() {
            Some(binding) if binding.reader().is_interactive() => {
                tracing::debug!(reader = %binding.reader().describe(), "input is interactive; not reading");
                cursor.advance(DispatchState::Invoking);
                Value::Void
            }
            Some(binding) => {
                cursor.advance(DispatchState::ReadingInput);
                let raw = binding
                    .reader()
                    .read()
                    .await
                    .map_err(|source| LoomError::Channel {
                        task: name.to_string(),
                        source,
                    })?;

                cursor.advance(DispatchState::Decoding);
                let mut codec = self.codec(name, binding.family(), binding.schema())?;
                if !self.config.validate_input() {
                    codec = codec.unchecked();
                }
                let value = codec.decode(&raw).map_err(|err| match err {
                    CodecError::Decode(source) => LoomError::Decode {
                        task: name.to_string(),
                        source,
                    },
                    CodecError::Validation(source) => LoomError::Validation {
                        task: name.to_string(),
                        source,
                    },
                })?;
                cursor.advance(DispatchState::Invoking);
                value
            }
            None => {
                cursor.advance(DispatchState::Invoking);
                Value::Void
            }
        };

        let mut output = task
            .handler()
            .handle(params, input, task.effect().clone())
            .await
            .map_err(|e| LoomError::from_task(name, e))?;

        let mut written = Vec::new();
        for (binding_name, binding) in task.outputs() {
            let Some(value) = output.take(binding_name) else {
                continue;
            };
            if value.is_void() {
                continue;
            }

            cursor.advance(DispatchState::Encoding);
            let codec = self.codec(name, binding.family(), binding.schema())?;
            let raw = codec.encode(&value).map_err(|source| LoomError::Encode {
                task: name.to_string(),
                binding: binding_name.to_string(),
                source,
            })?;

            cursor.advance(DispatchState::WritingOutput);
            binding
                .writer()
                .write(&raw)
                .await
                .map_err(|source| LoomError::Channel {
                    task: name.to_string(),
                    source,
                })?;
            tracing::debug!(binding = binding_name, writer = %binding.writer().describe(), "output written");
            written.push(binding_name.to_string());
        }

        for unmatched in output.names() {
            tracing::warn!(binding = unmatched, "handler produced a value for an undeclared output; dropped");
        }

        cursor.advance(DispatchState::Done);
        Ok(written)
    }

    fn codec(&self, task: &str, family: &str, schema: &SchemaDocument) -> Result<Codec, LoomError> {
        self.app
            .codecs()
            .codec(family, schema.clone())
            .ok_or_else(|| {
                LoomError::Build(BuildError::UnknownFamily {
                    task: task.to_string(),
                    family: family.to_string(),
                })
            })
    }

    async fn print_schema(&self, task: &Task) -> Result<(), LoomError> {
        let report = cli::schema_report(task);
        let mut text = serde_json::to_string_pretty(&report).map_err(|e| LoomError::Task {
            task: task.name().to_string(),
            source: TaskError::Output(e.to_string()),
        })?;
        text.push('\n');
        StdoutWriter
            .write(&text)
            .await
            .map_err(|source| LoomError::Channel {
                task: task.name().to_string(),
                source,
            })
    }
}

/// 宣言に従ってパラメータを揃える
///
/// - 省略されたパラメータにデフォルト値を補う
/// - 必須パラメータの欠落と型の不一致を検出する
/// - 宣言に無いパラメータはそのまま末尾に残す
fn resolve_params(task: &Task, given: Params) -> Result<Params, TaskError> {
    let mut resolved = Params::new();
    for spec in task.params() {
        let value = match given.get(spec.name()) {
            Some(value) => Some(value.clone()),
            None => spec.default_token().and_then(|token| match spec.kind() {
                ParamKind::Text => Some(Value::from(token)),
                ParamKind::Number => token.parse::<f64>().ok().map(Value::Number),
            }),
        };

        match (value, spec.kind()) {
            (None, _) if spec.is_required() => {
                return Err(TaskError::MissingParameter(spec.name().to_string()));
            }
            (None, _) => {}
            (Some(value @ Value::String(_)), ParamKind::Text)
            | (Some(value @ Value::Number(_)), ParamKind::Number) => {
                resolved.insert(spec.name(), value);
            }
            (Some(value), kind) => {
                return Err(TaskError::ParameterType {
                    name: spec.name().to_string(),
                    expected: kind,
                    found: value.kind(),
                });
            }
        }
    }

    for (name, value) in given.iter() {
        if resolved.get(name).is_none() {
            resolved.insert(name, value.clone());
        }
    }
    Ok(resolved)
}
