pub mod gemini;

pub use gemini::GeminiClient;

use crate::config::AspectRatio;
use crate::error::Result;
use crate::image::ImagePayload;
use async_trait::async_trait;

/// 图片生成请求
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub instruction: String,
    pub images: Vec<ImagePayload>,
    pub aspect_ratio: AspectRatio,
}

/// 脚本生成请求，要求返回符合 `VideoScript` 的 JSON
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptRequest {
    pub images: Vec<ImagePayload>,
    pub instruction: String,
    pub system_directive: String,
}

/// 远程生成服务
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// 生成图片，返回中没有图片时为 `Ok(None)`
    async fn generate_image(&self, request: ImageRequest) -> Result<Option<ImagePayload>>;

    /// 生成脚本，返回原始文本，可能带代码块标记；没有文本时为空字符串
    async fn generate_script(&self, request: ScriptRequest) -> Result<String>;
}
