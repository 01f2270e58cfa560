//! In-memory Channel - 開発用・テスト用
//!
//! # 実装詳細
//! - `Arc<Mutex<..>>` でバッファを共有するので、clone したハンドルから結果を読める
//! - ロックは await をまたがない

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{ChannelError, Reader, Writer};

/// MemoryReader は固定のテキストを返す Reader
///
/// # 使用例
/// ```ignore
/// let reader = MemoryReader::new(r#""hello""#);
/// let terminal = MemoryReader::interactive();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryReader {
    text: Arc<str>,
    interactive: bool,
    reads: Arc<AtomicUsize>,
}

impl MemoryReader {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
            interactive: false,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 対話的な端末を模した Reader（内容は空）
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::new("")
        }
    }

    /// `read()` が呼ばれた回数
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reader for MemoryReader {
    async fn read(&self) -> Result<String, ChannelError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// MemoryWriter は書き込みを記録する Writer
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    writes: Arc<Mutex<Vec<String>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込まれたテキストを順に連結したもの
    pub fn contents(&self) -> String {
        self.writes().concat()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Writer for MemoryWriter {
    async fn write(&self, raw: &str) -> Result<(), ChannelError> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(raw.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
