//! 標準入出力の Channel

use std::io::IsTerminal;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{ChannelError, Reader, Writer};

/// StdinReader は標準入力を最後まで読む
///
/// 標準入力が端末につながっている場合は interactive。
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinReader;

#[async_trait]
impl Reader for StdinReader {
    async fn read(&self) -> Result<String, ChannelError> {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .map_err(|e| ChannelError::read(self.describe(), e))?;
        Ok(raw)
    }

    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal()
    }

    fn describe(&self) -> String {
        "stdin".to_string()
    }
}

/// StdoutWriter は標準出力に書き出す
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutWriter;

#[async_trait]
impl Writer for StdoutWriter {
    async fn write(&self, raw: &str) -> Result<(), ChannelError> {
        let mut out = tokio::io::stdout();
        out.write_all(raw.as_bytes())
            .await
            .map_err(|e| ChannelError::write(self.describe(), e))?;
        out.flush()
            .await
            .map_err(|e| ChannelError::write(self.describe(), e))
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// StderrWriter は標準エラー出力に書き出す
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrWriter;

#[async_trait]
impl Writer for StderrWriter {
    async fn write(&self, raw: &str) -> Result<(), ChannelError> {
        let mut out = tokio::io::stderr();
        out.write_all(raw.as_bytes())
            .await
            .map_err(|e| ChannelError::write(self.describe(), e))?;
        out.flush()
            .await
            .map_err(|e| ChannelError::write(self.describe(), e))
    }

    fn describe(&self) -> String {
        "stderr".to_string()
    }
}
