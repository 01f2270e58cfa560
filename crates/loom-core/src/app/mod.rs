//! App - タスクとコーデックを組み立てた不変のアプリケーション
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 登録と起動時検証（Fail-fast）
//! - **App**: 凍結済みの CodecRegistry と TaskRegistry。Dispatcher に渡す

pub mod builder;

pub use self::builder::{App, AppBuilder, BuildError, RESERVED_PARAMETERS, RESERVED_TASKS};
