//! ファイルの Channel（UTF-8 テキスト、ファイル全体を読み書き）

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{ChannelError, Reader, Writer};

/// FileReader は名前付きファイルの内容全体を読む
#[derive(Debug, Clone)]
pub struct FileReader {
    path: PathBuf,
}

impl FileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Reader for FileReader {
    async fn read(&self) -> Result<String, ChannelError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ChannelError::read(self.describe(), e))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// FileWriter は名前付きファイルを上書きする
///
/// 親ディレクトリが無ければ作成する。
#[derive(Debug, Clone)]
pub struct FileWriter {
    path: PathBuf,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Writer for FileWriter {
    async fn write(&self, raw: &str) -> Result<(), ChannelError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ChannelError::write(self.describe(), e))?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| ChannelError::write(self.describe(), e))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
