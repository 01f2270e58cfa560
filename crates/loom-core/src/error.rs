//! LoomError - dispatch 境界のエラー
//!
//! 各層のエラー（Codec / Channel / Effect / Handler）はタスク名を付けてここに集まる。
//! リトライはどこにも無い。

use std::process::ExitCode;

use thiserror::Error;

use crate::app::BuildError;
use crate::channel::ChannelError;
use crate::codec::{DecodeError, EncodeError};
use crate::effect::ShellCommandError;
use crate::schema::ValidationError;
use crate::task::TaskError;

/// 使い方の誤り（未知のタスク、引数の不正）の終了コード
pub const USAGE_EXIT_CODE: u8 = 2;

/// それ以外の失敗の終了コード
pub const FAILURE_EXIT_CODE: u8 = 1;

#[derive(Debug, Error)]
pub enum LoomError {
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("task `{task}`: {source}")]
    Decode {
        task: String,
        #[source]
        source: DecodeError,
    },

    #[error("task `{task}`: input rejected: {source}")]
    Validation {
        task: String,
        #[source]
        source: ValidationError,
    },

    #[error("task `{task}`: cannot encode output `{binding}`: {source}")]
    Encode {
        task: String,
        binding: String,
        #[source]
        source: EncodeError,
    },

    #[error("task `{task}`: {source}")]
    Shell {
        task: String,
        #[source]
        source: ShellCommandError,
    },

    #[error("task `{task}`: {source}")]
    Channel {
        task: String,
        #[source]
        source: ChannelError,
    },

    #[error("task `{task}` failed: {source}")]
    Task {
        task: String,
        #[source]
        source: TaskError,
    },
}

impl LoomError {
    /// ハンドラのエラーをタスク名付きで包む
    ///
    /// shell / channel の失敗はそれぞれ専用の variant に振り分ける。
    pub fn from_task(task: &str, error: TaskError) -> Self {
        let task = task.to_string();
        match error {
            TaskError::Shell(source) => Self::Shell { task, source },
            TaskError::Channel(source) => Self::Channel { task, source },
            source => Self::Task { task, source },
        }
    }

    /// 失敗したタスクの名前（タスクが特定できている場合）
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::UnknownTask(_) | Self::Usage(_) | Self::Build(_) => None,
            Self::Decode { task, .. }
            | Self::Validation { task, .. }
            | Self::Encode { task, .. }
            | Self::Shell { task, .. }
            | Self::Channel { task, .. }
            | Self::Task { task, .. } => Some(task),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnknownTask(_) | Self::Usage(_) => USAGE_EXIT_CODE,
            _ => FAILURE_EXIT_CODE,
        }
    }
}

impl From<&LoomError> for ExitCode {
    fn from(error: &LoomError) -> Self {
        ExitCode::from(error.exit_code())
    }
}
