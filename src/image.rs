use crate::error::{FactoryError, Result};
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const DEFAULT_MIME: &str = "image/png";

/// 自描述图片：`data:<mime>;base64,<data>`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImagePayload {
    mime_type: String,
    data: String,
}

impl ImagePayload {
    /// 包装已经 base64 编码的数据
    pub fn from_base64(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::from_base64(mime_type, BASE64_STANDARD.encode(bytes))
    }

    /// 解析 data URI，缺少 `data:` 头或 base64 标记的都拒绝
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| FactoryError::InvalidPayload("missing data: prefix".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| FactoryError::InvalidPayload("missing ',' separator".to_string()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| FactoryError::InvalidPayload("payload is not base64".to_string()))?;

        let mime_type = if mime_type.is_empty() {
            DEFAULT_MIME
        } else {
            mime_type
        };

        Ok(Self::from_base64(mime_type, data))
    }

    /// 从磁盘读取图片，按扩展名判断 MIME 类型
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(mime_from_extension(path), &bytes))
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// 不带前缀的 base64 数据
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(BASE64_STANDARD.decode(self.data.trim())?)
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => DEFAULT_MIME,
    }
}

impl TryFrom<String> for ImagePayload {
    type Error = FactoryError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImagePayload> for String {
    fn from(value: ImagePayload) -> Self {
        value.to_data_uri()
    }
}

// 数据可能有几 MB，Debug 只输出长度
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}
