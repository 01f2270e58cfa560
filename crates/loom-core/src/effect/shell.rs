//! 外部コマンドの実行
//!
//! コマンドの完了を待ち、stdout / stderr を別々に捕捉します。
//! タイムアウトやキャンセルは持たないので、終了しないコマンドは dispatch 全体を止めます。

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use super::Effect;

/// ShellCommandError は外部コマンドの失敗
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShellCommandError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("`{command}` exited with {}: {stderr}", code_label(.code))]
    Failed {
        command: String,
        /// シグナルで終了した場合は None
        code: Option<i32>,
        stderr: String,
    },
}

impl ShellCommandError {
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Failed { code, .. } => *code,
            Self::Spawn { .. } => None,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            Self::Failed { stderr, .. } => stderr,
            Self::Spawn { .. } => "",
        }
    }
}

fn code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

pub(super) async fn run(
    effect: &Effect,
    command_line: &str,
    dir: Option<&Path>,
) -> Result<String, ShellCommandError> {
    let mut command = shell_command(command_line);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    effect.debug(format_args!("running `{command_line}`"));

    let output = command
        .output()
        .await
        .map_err(|e| ShellCommandError::Spawn {
            command: command_line.to_string(),
            source: Arc::new(e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);

    for line in stdout.lines() {
        effect.debug(line);
    }

    if !output.status.success() {
        let stderr = stderr.trim_end().to_string();
        effect.error(&stderr);
        return Err(ShellCommandError::Failed {
            command: command_line.to_string(),
            code: output.status.code(),
            stderr,
        });
    }

    Ok(stdout)
}
