//! loom-core
//!
//! スキーマで型付けされたタスクを登録し、コマンドラインから 1 つずつ実行するためのライブラリ。
//!
//! # モジュール構成
//! - **schema**: SchemaDocument（型の宣言）と Value（実行時の値）、型マッピング
//! - **codec**: raw text ↔ Value（json / yaml / text と独自ファミリー）
//! - **channel**: raw text の入出力先（stdin / stdout / stderr / file / memory）
//! - **effect**: タスクごとのログと外部コマンド実行
//! - **task**: Task の宣言、Handler、TaskRegistry
//! - **app**: AppBuilder と App（起動時検証）
//! - **dispatch**: argv → タスク実行の状態機械
//! - **config** / **telemetry** / **error**: 実行時設定、tracing の初期化、エラー型

pub mod app;
pub mod channel;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod effect;
pub mod error;
pub mod schema;
pub mod task;
pub mod telemetry;

pub use crate::app::{App, AppBuilder, BuildError};
pub use crate::config::{LogFormat, LoomConfig};
pub use crate::dispatch::{DispatchReport, DispatchState, Dispatcher, RunOutcome};
pub use crate::effect::{Effect, ShellCommandError};
pub use crate::error::LoomError;
pub use crate::schema::{SchemaDocument, Value};
pub use crate::task::{
    InputBinding, OutputBinding, ParameterSpec, Params, TaskError, TaskOutput, TaskSpec,
};
