//! Channel - raw text の入出力先の抽象化
//!
//! 「バイトがどこから来るか」（Channel）を「それが何を意味するか」（Codec）から
//! 切り離します。各 trait は標準入出力やファイルなどの外部リソースへの
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - `Reader::read` は利用可能な全テキストを一度に返す（ストリーミングではない）
//! - `Writer::write` は全テキストを書き切ってから返る
//! - Channel の生成は OS に触れない。実際に開くのは Dispatcher が read/write した時

pub mod file;
pub mod memory;
pub mod stdio;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

pub use self::file::{FileReader, FileWriter};
pub use self::memory::{MemoryReader, MemoryWriter};
pub use self::stdio::{StderrWriter, StdinReader, StdoutWriter};

/// ChannelError は Channel の I/O エラー
///
/// `io::Error` は Clone できないので `Arc` で包む。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to read from {channel}: {source}")]
    Read {
        channel: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("failed to write to {channel}: {source}")]
    Write {
        channel: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("{channel} does not contain valid UTF-8 text")]
    Encoding { channel: String },
}

impl ChannelError {
    pub fn read(channel: impl Into<String>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::InvalidData {
            return Self::Encoding {
                channel: channel.into(),
            };
        }
        Self::Read {
            channel: channel.into(),
            source: Arc::new(source),
        }
    }

    pub fn write(channel: impl Into<String>, source: io::Error) -> Self {
        Self::Write {
            channel: channel.into(),
            source: Arc::new(source),
        }
    }
}

/// Reader は raw text の入力元
///
/// # 対話的な端末
/// `is_interactive()` が true の場合、Dispatcher は `read()` を呼ばずに
/// 入力を「無し」（`Value::Void`）として扱います。
#[async_trait]
pub trait Reader: Send + Sync {
    async fn read(&self) -> Result<String, ChannelError>;

    fn is_interactive(&self) -> bool {
        false
    }

    /// ログ・エラーメッセージ用の名前（"stdin", "file:/tmp/a.json" など）
    fn describe(&self) -> String;
}

/// Writer は raw text の出力先
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(&self, raw: &str) -> Result<(), ChannelError>;

    fn describe(&self) -> String;
}
