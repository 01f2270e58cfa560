//! Effect - タスクごとの副作用コンテキスト
//!
//! ハンドラに以下を提供します：
//! - タスク名でタグ付けされたレベル付きログ（tracing）
//! - 外部コマンドの実行（`execute`）
//!
//! Effect はタスク登録時に 1 度だけ作られ、そのタスクの全ての呼び出しで共有されます。
//! 構築後に変更されることはありません。

mod shell;

use std::fmt;
use std::path::Path;

use tracing::Span;
use ulid::Ulid;

pub use self::shell::ShellCommandError;

/// タスクのログイベントに付ける tracing の target
pub const TASK_TARGET: &str = "loom::task";

/// Effect はタスクの副作用コンテキスト
///
/// # 使用例
/// ```ignore
/// async fn handle(&self, params: Params, input: Value, effect: Arc<Effect>) -> ... {
///     effect.info("building");
///     let sha = effect.execute("git rev-parse HEAD").await?;
///     ...
/// }
/// ```
#[derive(Debug)]
pub struct Effect {
    task: String,
}

impl Effect {
    pub fn new(task: impl Into<String>) -> Self {
        Self { task: task.into() }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// 1 回の呼び出しを囲む span（Dispatcher が使う）
    pub fn invocation_span(&self, invocation: Ulid) -> Span {
        tracing::info_span!("task", task = %self.task, %invocation)
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(target: TASK_TARGET, task = %self.task, "{message}");
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(target: TASK_TARGET, task = %self.task, "{message}");
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(target: TASK_TARGET, task = %self.task, "{message}");
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(target: TASK_TARGET, task = %self.task, "{message}");
    }

    /// 外部コマンドを実行して stdout を返す
    ///
    /// - stdout の各行を debug ログに出す
    /// - 非ゼロ終了なら stderr を error ログに出して `ShellCommandError::Failed`
    pub async fn execute(&self, command_line: &str) -> Result<String, ShellCommandError> {
        shell::run(self, command_line, None).await
    }

    /// 作業ディレクトリを指定して `execute` する
    pub async fn execute_in(
        &self,
        dir: impl AsRef<Path>,
        command_line: &str,
    ) -> Result<String, ShellCommandError> {
        shell::run(self, command_line, Some(dir.as_ref())).await
    }
}
