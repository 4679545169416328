use crate::error::{FactoryError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSaver: Send + Sync {
    /// 以 `file_name` 保存下载内容
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> Result<()>;
}

/// 保存到本地目录
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileSaver for DirectorySaver {
    async fn save(&self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| FactoryError::Host(format!("invalid file name: {}", file_name)))?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        info!("Saved {}", path.display());
        Ok(())
    }
}

/// 把复制的文本输出到标准输出，每条一行
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutClipboard;

#[async_trait]
impl Clipboard for StdoutClipboard {
    async fn copy(&self, text: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path().join("downloads"));

        saver.save("Line_1.zip", b"PK".to_vec()).await.unwrap();

        let written = tokio::fs::read(dir.path().join("downloads/Line_1.zip")).await.unwrap();
        assert_eq!(written, b"PK");
    }

    #[tokio::test]
    async fn strips_directory_components_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path());

        saver.save("../escape.zip", vec![1]).await.unwrap();
        assert!(dir.path().join("escape.zip").exists());
    }

    #[tokio::test]
    async fn rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DirectorySaver::new(dir.path());
        assert!(saver.save("..", vec![1]).await.is_err());
    }
}
